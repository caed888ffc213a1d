//! Ability and die-size value objects.
//!
//! Provides type safety for the six abilities and six die sizes instead of
//! passing around `"brains"` / `"d8"` strings.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// The six abilities every character rates with a die.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stat {
    Brains,
    Brawn,
    Charm,
    Fight,
    Flight,
    Grit,
}

impl Stat {
    pub const ALL: [Stat; 6] = [
        Self::Brains,
        Self::Brawn,
        Self::Charm,
        Self::Fight,
        Self::Flight,
        Self::Grit,
    ];

    /// Wire name, as stored in the `stats.stat` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brains => "brains",
            Self::Brawn => "brawn",
            Self::Charm => "charm",
            Self::Fight => "fight",
            Self::Flight => "flight",
            Self::Grit => "grit",
        }
    }

    /// Capitalized name for display (e.g., "Brains").
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Brains => "Brains",
            Self::Brawn => "Brawn",
            Self::Charm => "Charm",
            Self::Fight => "Fight",
            Self::Flight => "Flight",
            Self::Grit => "Grit",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brains" => Ok(Self::Brains),
            "brawn" => Ok(Self::Brawn),
            "charm" => Ok(Self::Charm),
            "fight" => Ok(Self::Fight),
            "flight" => Ok(Self::Flight),
            "grit" => Ok(Self::Grit),
            other => Err(DomainError::parse(format!("Unknown stat: {}", other))),
        }
    }
}

/// Die size assigned to an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Die {
    D20,
    D12,
    D10,
    D8,
    D6,
    D4,
}

impl Die {
    /// Largest first, the order the picker lists them in.
    pub const ALL: [Die; 6] = [
        Self::D20,
        Self::D12,
        Self::D10,
        Self::D8,
        Self::D6,
        Self::D4,
    ];

    pub fn sides(&self) -> u8 {
        match self {
            Self::D20 => 20,
            Self::D12 => 12,
            Self::D10 => 10,
            Self::D8 => 8,
            Self::D6 => 6,
            Self::D4 => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::D20 => "d20",
            Self::D12 => "d12",
            Self::D10 => "d10",
            Self::D8 => "d8",
            Self::D6 => "d6",
            Self::D4 => "d4",
        }
    }
}

impl fmt::Display for Die {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Die {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "d20" => Ok(Self::D20),
            "d12" => Ok(Self::D12),
            "d10" => Ok(Self::D10),
            "d8" => Ok(Self::D8),
            "d6" => Ok(Self::D6),
            "d4" => Ok(Self::D4),
            other => Err(DomainError::parse(format!("Unknown die: {}", other))),
        }
    }
}

/// Orders abilities for display.
///
/// Assigned abilities come first, largest die first (ties alphabetical);
/// unassigned abilities follow alphabetically.
pub fn rank_stats(stats: &BTreeMap<Stat, Die>) -> Vec<(Stat, Option<Die>)> {
    let mut ranked: Vec<(Stat, Option<Die>)> = Stat::ALL
        .iter()
        .map(|stat| (*stat, stats.get(stat).copied()))
        .collect();
    // Stat::ALL is alphabetical and sort_by is stable.
    ranked.sort_by(|(_, a), (_, b)| {
        let a = a.map(|d| d.sides()).unwrap_or(0);
        let b = b.map(|d| d.sides()).unwrap_or(0);
        b.cmp(&a)
    });
    ranked
}
