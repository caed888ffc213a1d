//! The party-wide shared score.

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Row id of the single shared-score row.
pub const SHARED_SCORE_ROW_ID: i64 = 1;

/// Single global points pool the whole party spends from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharedScore(u16);

impl SharedScore {
    pub const MIN: u16 = 0;
    pub const MAX: u16 = 200;
    pub const DEFAULT: u16 = 135;

    pub fn new(value: i64) -> Result<Self, DomainError> {
        if !(i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            return Err(DomainError::out_of_range(
                "shared score",
                value,
                i64::from(Self::MIN),
                i64::from(Self::MAX),
            ));
        }
        // In range, so the narrowing is lossless.
        Ok(Self(value as u16))
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl Default for SharedScore {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_135() {
        assert_eq!(SharedScore::default().value(), 135);
    }

    #[test]
    fn accepts_inclusive_bounds_and_rejects_outside() {
        assert_eq!(SharedScore::new(0).map(|s| s.value()), Ok(0));
        assert_eq!(SharedScore::new(200).map(|s| s.value()), Ok(200));
        assert!(SharedScore::new(201).is_err());
        assert!(SharedScore::new(-1).is_err());
    }
}
