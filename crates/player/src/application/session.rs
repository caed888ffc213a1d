//! Sheet Session - one client's view of the shared party
//!
//! Wires the state registry, sync service, bootstrap loader and change
//! subscriber for one session id. The composition root creates one per
//! process.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use partysheet_domain::{Roster, SessionId, SharedScore};

use crate::application::bootstrap::{BootstrapError, Bootstrapper, LoadState};
use crate::application::subscriber::ChangeSubscriber;
use crate::application::sync::{SheetSync, SyncConfig};
use crate::ports::outbound::{ChangeFeedPort, FeedError, RemoteStorePort};
use crate::state::{CharacterRegistry, ScoreCell};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Change feed unavailable: {0}")]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
}

pub struct SheetSession {
    roster: Roster,
    sync: SheetSync,
    feed: Arc<dyn ChangeFeedPort>,
    bootstrap: Bootstrapper,
    subscriber: Mutex<Option<JoinHandle<()>>>,
}

impl SheetSession {
    /// Must be called inside a tokio runtime.
    pub fn new(
        roster: Roster,
        store: Arc<dyn RemoteStorePort>,
        feed: Arc<dyn ChangeFeedPort>,
        config: SyncConfig,
    ) -> Self {
        let session = SessionId::new();
        tracing::info!(session = %session, "Creating sheet session");

        let sync = SheetSync::new(
            CharacterRegistry::new(),
            ScoreCell::new(SharedScore::default()),
            Arc::clone(&store),
            session,
            config,
        );
        let bootstrap = Bootstrapper::new(sync.clone(), store, roster.clone());
        Self {
            roster,
            sync,
            feed,
            bootstrap,
            subscriber: Mutex::new(None),
        }
    }

    pub fn sync(&self) -> &SheetSync {
        &self.sync
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn load_state(&self) -> watch::Receiver<LoadState> {
        self.bootstrap.state()
    }

    /// Opens the change feed, then loads every sheet.
    ///
    /// The feed is subscribed first so no change written during the load
    /// is missed.
    pub async fn start(&self) -> Result<(), SessionError> {
        let changes = match self.feed.subscribe().await {
            Ok(changes) => changes,
            Err(e) => {
                self.bootstrap.fail(e.to_string());
                return Err(e.into());
            }
        };

        let subscriber = ChangeSubscriber::new(self.sync.clone(), self.roster.clone());
        let handle = tokio::spawn(subscriber.run(changes));
        if let Some(previous) = self
            .subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle)
        {
            previous.abort();
        }

        self.bootstrap.run().await?;
        Ok(())
    }

    /// Stops the subscriber and waits for queued writes.
    pub async fn shutdown(&self) {
        let handle = self
            .subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
        self.sync.flush().await;
        tracing::info!(session = %self.sync.session_id(), "Sheet session stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use uuid::Uuid;

    use partysheet_domain::{Die, PlayerId, Stat};
    use partysheet_shared::{ChangeEvent, ChangeKind, Table};

    use crate::application::sync::{CharacterAction, Origin};
    use crate::infrastructure::in_memory::{InMemoryStore, LoggedWrite};
    use crate::ports::outbound::ChangeStream;

    fn session_on(store: &InMemoryStore) -> SheetSession {
        SheetSession::new(
            Roster::campaign(),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            SyncConfig::default(),
        )
    }

    #[tokio::test]
    async fn edits_propagate_between_sessions_without_echo_writes() {
        let store = InMemoryStore::new();
        let alice = session_on(&store);
        let bob = session_on(&store);
        alice.start().await.expect("start");
        bob.start().await.expect("start");

        let olympia = PlayerId::from("olympia");
        let mut bob_view = bob.sync().registry().cell(&olympia).subscribe();
        alice
            .sync()
            .dispatch(&olympia, CharacterAction::Adversity(5), Origin::Local)
            .expect("valid");
        alice.sync().flush().await;

        tokio::time::timeout(Duration::from_secs(1), bob_view.changed())
            .await
            .expect("change arrives")
            .expect("cell alive");
        assert_eq!(bob.sync().character(&olympia).adversity_tokens, 5);

        // Exactly one write: neither session re-sent what it received.
        bob.shutdown().await;
        alice.shutdown().await;
        assert_eq!(store.writes().len(), 1);
        assert!(matches!(&store.writes()[0], LoggedWrite::Upsert(_)));
    }

    #[tokio::test]
    async fn injected_foreign_change_reaches_a_running_session() {
        let store = InMemoryStore::new();
        let session = session_on(&store);
        session.start().await.expect("start");
        store.clear_writes();

        let sophia = PlayerId::from("sophia");
        let mut view = session.sync().registry().cell(&sophia).subscribe();
        store.publish(ChangeEvent::new(
            Table::Stats,
            ChangeKind::Insert,
            json!({ "player": "sophia", "stat": "flight", "die": "d12", "session_id": Uuid::new_v4() }),
            json!({}),
        ));

        tokio::time::timeout(Duration::from_secs(1), view.changed())
            .await
            .expect("change arrives")
            .expect("cell alive");
        assert_eq!(
            session.sync().character(&sophia).stats.get(&Stat::Flight),
            Some(&Die::D12)
        );

        session.shutdown().await;
        assert!(store.writes().is_empty());
    }

    struct BrokenFeed;

    #[async_trait]
    impl ChangeFeedPort for BrokenFeed {
        async fn subscribe(&self) -> Result<ChangeStream, FeedError> {
            Err(FeedError::Connect("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn feed_failure_marks_load_failed() {
        let session = SheetSession::new(
            Roster::campaign(),
            Arc::new(InMemoryStore::new()),
            Arc::new(BrokenFeed),
            SyncConfig::default(),
        );
        let state = session.load_state();

        assert!(matches!(
            session.start().await,
            Err(SessionError::Feed(FeedError::Connect(_)))
        ));
        assert!(matches!(&*state.borrow(), LoadState::Failed(_)));
    }
}
