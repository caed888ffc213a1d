//! Row images of the remote tables.
//!
//! Every row carries the writer's `session_id` so clients can recognize
//! echoes of their own writes. Selects that don't ask for the column get
//! `None`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Table;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdversityRow {
    pub player: String,
    pub adversity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRow {
    pub player: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRow {
    pub player: String,
    pub stat: String,
    pub die: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub id: Uuid,
    pub player: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub order: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
}

/// Secondary dial row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AimgRow {
    pub player: String,
    pub value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
}

/// The single shared-score row (`id` is always 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub id: i64,
    pub score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
}

/// Any row the client upserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRow {
    Adversity(AdversityRow),
    Status(StatusRow),
    Stat(StatRow),
    Inventory(InventoryRow),
    Aimg(AimgRow),
    Score(ScoreRow),
}

impl RemoteRow {
    pub fn table(&self) -> Table {
        match self {
            Self::Adversity(_) => Table::Adversity,
            Self::Status(_) => Table::Status,
            Self::Stat(_) => Table::Stats,
            Self::Inventory(_) => Table::Inventory,
            Self::Aimg(_) => Table::Aimg,
            Self::Score(_) => Table::EltaisScore,
        }
    }

    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            Self::Adversity(r) => r.session_id,
            Self::Status(r) => r.session_id,
            Self::Stat(r) => r.session_id,
            Self::Inventory(r) => r.session_id,
            Self::Aimg(r) => r.session_id,
            Self::Score(r) => r.session_id,
        }
    }

    /// Natural key values, in `Table::conflict_columns` order.
    pub fn natural_key(&self) -> Vec<String> {
        match self {
            Self::Adversity(r) => vec![r.player.clone()],
            Self::Status(r) => vec![r.player.clone()],
            Self::Stat(r) => vec![r.player.clone(), r.stat.clone()],
            Self::Inventory(r) => vec![r.id.to_string()],
            Self::Aimg(r) => vec![r.player.clone()],
            Self::Score(r) => vec![r.id.to_string()],
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Adversity(r) => serde_json::to_value(r),
            Self::Status(r) => serde_json::to_value(r),
            Self::Stat(r) => serde_json::to_value(r),
            Self::Inventory(r) => serde_json::to_value(r),
            Self::Aimg(r) => serde_json::to_value(r),
            Self::Score(r) => serde_json::to_value(r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_row_uses_order_column_name() {
        let row = InventoryRow {
            id: Uuid::nil(),
            player: "olympia".into(),
            name: "Rope".into(),
            description: "50ft".into(),
            order: "a0".into(),
            session_id: None,
        };
        let json = serde_json::to_value(&row).expect("serialize");
        assert_eq!(json["order"], "a0");
        assert!(json.get("session_id").is_none());
    }

    #[test]
    fn select_without_session_column_deserializes() {
        let row: AdversityRow =
            serde_json::from_str(r#"{"player":"ryan","adversity":4}"#).expect("deserialize");
        assert_eq!(row.session_id, None);
        assert_eq!(row.adversity, 4);
    }

    #[test]
    fn stat_natural_key_is_player_and_stat() {
        let row = RemoteRow::Stat(StatRow {
            player: "chris".into(),
            stat: "grit".into(),
            die: "d8".into(),
            session_id: None,
        });
        assert_eq!(row.table(), Table::Stats);
        assert_eq!(row.natural_key(), vec!["chris".to_string(), "grit".to_string()]);
    }
}
