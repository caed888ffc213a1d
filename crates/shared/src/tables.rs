//! Remote table names and their natural keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One remote table per synchronized concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Adversity,
    Status,
    Stats,
    Inventory,
    /// Secondary dial, stored under its historical table name.
    Aimg,
    EltaisScore,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Self::Adversity,
        Self::Status,
        Self::Stats,
        Self::Inventory,
        Self::Aimg,
        Self::EltaisScore,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Adversity => "adversity",
            Self::Status => "status",
            Self::Stats => "stats",
            Self::Inventory => "inventory",
            Self::Aimg => "aimg",
            Self::EltaisScore => "eltais_score",
        }
    }

    /// Columns forming the natural key, as passed to `on_conflict`.
    pub fn conflict_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Adversity | Self::Status | Self::Aimg => &["player"],
            Self::Stats => &["player", "stat"],
            Self::Inventory | Self::EltaisScore => &["id"],
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = crate::ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|table| table.name() == s)
            .ok_or_else(|| crate::ProtocolError::UnknownTable(s.to_string()))
    }
}
