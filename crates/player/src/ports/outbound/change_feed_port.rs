//! Change Feed Port - the multiplexed insert/update/delete subscription

use async_trait::async_trait;
use tokio::sync::mpsc;

use partysheet_shared::{ChangeEvent, ProtocolError};

/// Stream of change notifications across every synced table.
///
/// The feed keeps delivering (reconnecting as needed) until the receiver is
/// dropped.
pub type ChangeStream = mpsc::UnboundedReceiver<ChangeEvent>;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Failed to connect to change feed: {0}")]
    Connect(String),

    #[error("Channel join rejected: {0}")]
    JoinRejected(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Change feed closed")]
    Closed,
}

#[async_trait]
pub trait ChangeFeedPort: Send + Sync {
    /// Open the long-lived subscription.
    async fn subscribe(&self) -> Result<ChangeStream, FeedError>;
}
