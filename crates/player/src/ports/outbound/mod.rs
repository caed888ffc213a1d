//! Outbound ports - interfaces for external collaborators
//!
//! The hosted realtime store is reached through two ports: one for
//! request/response table access and one for the multiplexed change feed.
//! Local persistence goes through the platform storage port.

pub mod change_feed_port;
pub mod platform;
pub mod remote_store_port;

pub use change_feed_port::{ChangeFeedPort, ChangeStream, FeedError};
pub use platform::{storage_keys, StorageProvider};
pub use remote_store_port::{RemoteStorePort, StoreError};

#[cfg(any(test, feature = "testing"))]
pub use remote_store_port::MockRemoteStorePort;
