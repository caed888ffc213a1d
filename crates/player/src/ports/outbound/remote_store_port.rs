//! Remote Store Port - table reads and writes against the hosted store
//!
//! Every write is an upsert keyed by the table's natural key, so re-sending
//! the same row is harmless. Inventory rows are the only ones that can be
//! deleted.

use async_trait::async_trait;
use uuid::Uuid;

use partysheet_shared::{AdversityRow, AimgRow, InventoryRow, RemoteRow, ScoreRow, StatRow, StatusRow};

/// Remote store operation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Transport failed before a response arrived.
    #[error("Request failed in {operation}: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    /// Store answered with a non-success status.
    #[error("Store rejected {operation} with status {status}: {body}")]
    Rejected {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn transport(operation: &'static str, message: impl ToString) -> Self {
        Self::Transport {
            operation,
            message: message.to_string(),
        }
    }

    pub fn rejected(operation: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            status,
            body: body.into(),
        }
    }

    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }
}

/// Table access for the hosted store.
///
/// Fetches return the latest row for the given key, or `None` when no row
/// has been written yet.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RemoteStorePort: Send + Sync {
    /// Insert-or-replace `row` by its table's natural key.
    async fn upsert(&self, row: RemoteRow) -> Result<(), StoreError>;

    async fn delete_inventory_item(&self, id: Uuid) -> Result<(), StoreError>;

    async fn fetch_adversity(&self, player: &str) -> Result<Option<AdversityRow>, StoreError>;

    async fn fetch_status(&self, player: &str) -> Result<Option<StatusRow>, StoreError>;

    async fn fetch_stat(&self, player: &str, stat: &str) -> Result<Option<StatRow>, StoreError>;

    async fn fetch_inventory(&self, player: &str) -> Result<Vec<InventoryRow>, StoreError>;

    async fn fetch_secondary_dial(&self, player: &str) -> Result<Option<AimgRow>, StoreError>;

    async fn fetch_shared_score(&self) -> Result<Option<ScoreRow>, StoreError>;
}
