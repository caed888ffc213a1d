//! Bootstrap Loader - seeds local state from the store
//!
//! Fetches every field of every roster character plus the shared score
//! concurrently and replays each row as a remote action, so seeding never
//! triggers a write. A missing row leaves the default in place. A failed
//! fetch fails the whole load and is reported through [`LoadState::Failed`];
//! the state never stays `Loading` after `run` returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::try_join_all;
use tokio::sync::watch;

use partysheet_domain::{PlayerId, Roster, Stat};
use partysheet_shared::{AdversityRow, AimgRow, InventoryRow, ScoreRow, StatRow, StatusRow};

use crate::application::sync::mapping::item_from_row;
use crate::application::sync::{CharacterAction, Origin, SheetSync};
use crate::ports::outbound::{RemoteStorePort, StoreError};

/// Progress of the initial load, observed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Failed to load {field} for {player}: {source}")]
    Fetch {
        player: String,
        field: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Bootstrap already ran for this session")]
    AlreadyStarted,
}

fn fetch_failed(player: &str, field: &'static str) -> impl FnOnce(StoreError) -> BootstrapError {
    let player = player.to_string();
    move |source| BootstrapError::Fetch {
        player,
        field,
        source,
    }
}

/// Everything stored for one character.
struct CharacterRows {
    adversity: Option<AdversityRow>,
    status: Option<StatusRow>,
    stats: Vec<StatRow>,
    inventory: Vec<InventoryRow>,
    secondary_dial: Option<AimgRow>,
}

pub struct Bootstrapper {
    sync: SheetSync,
    store: Arc<dyn RemoteStorePort>,
    roster: Roster,
    state: watch::Sender<LoadState>,
    started: AtomicBool,
}

impl Bootstrapper {
    pub fn new(sync: SheetSync, store: Arc<dyn RemoteStorePort>, roster: Roster) -> Self {
        let (state, _rx) = watch::channel(LoadState::Loading);
        Self {
            sync,
            store,
            roster,
            state,
            started: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    /// Loads and applies every stored row. Runs once per session.
    pub async fn run(&self) -> Result<(), BootstrapError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(BootstrapError::AlreadyStarted);
        }

        tracing::info!(characters = self.roster.len(), "Loading character sheets");
        let characters = try_join_all(self.roster.ids().map(|player| self.load_character(player)));
        let loaded = tokio::try_join!(characters, self.load_score());

        match loaded {
            Ok(_) => {
                tracing::info!("Character sheets loaded");
                self.state.send_replace(LoadState::Ready);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load character sheets");
                self.state.send_replace(LoadState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Marks the load as failed without running it.
    pub(crate) fn fail(&self, reason: impl Into<String>) {
        self.started.store(true, Ordering::SeqCst);
        self.state.send_replace(LoadState::Failed(reason.into()));
    }

    async fn load_character(&self, player: &PlayerId) -> Result<(), BootstrapError> {
        let rows = self.fetch_character(player.as_str()).await?;
        self.apply(player, rows);
        Ok(())
    }

    async fn fetch_character(&self, player: &str) -> Result<CharacterRows, BootstrapError> {
        let store = self.store.as_ref();
        let stats = try_join_all(Stat::ALL.iter().map(|stat| async move {
            store
                .fetch_stat(player, stat.as_str())
                .await
                .map_err(fetch_failed(player, "stats"))
        }));

        let (adversity, status, stats, inventory, secondary_dial) = tokio::try_join!(
            async {
                store
                    .fetch_adversity(player)
                    .await
                    .map_err(fetch_failed(player, "adversity"))
            },
            async {
                store
                    .fetch_status(player)
                    .await
                    .map_err(fetch_failed(player, "status"))
            },
            stats,
            async {
                store
                    .fetch_inventory(player)
                    .await
                    .map_err(fetch_failed(player, "inventory"))
            },
            async {
                store
                    .fetch_secondary_dial(player)
                    .await
                    .map_err(fetch_failed(player, "secondary dial"))
            },
        )?;

        Ok(CharacterRows {
            adversity,
            status,
            stats: stats.into_iter().flatten().collect(),
            inventory,
            secondary_dial,
        })
    }

    fn apply(&self, player: &PlayerId, rows: CharacterRows) {
        let mut actions = Vec::new();
        if let Some(row) = rows.adversity {
            actions.push(CharacterAction::Adversity(row.adversity));
        }
        if let Some(row) = rows.status {
            actions.push(CharacterAction::Status(row.status));
        }
        for row in rows.stats {
            match (row.stat.parse(), row.die.parse()) {
                (Ok(stat), Ok(die)) => actions.push(CharacterAction::Stat { stat, die }),
                _ => tracing::warn!(
                    player = %player,
                    stat = %row.stat,
                    die = %row.die,
                    "Skipping unreadable stat row"
                ),
            }
        }
        actions.push(CharacterAction::Inventory(
            rows.inventory.into_iter().map(item_from_row).collect(),
        ));
        if let Some(row) = rows.secondary_dial {
            actions.push(CharacterAction::SecondaryDial(row.value));
        }

        for action in actions {
            if let Err(rejection) = self.sync.dispatch(player, action, Origin::Remote) {
                tracing::warn!(error = %rejection, "Skipping invalid stored value");
            }
        }
    }

    async fn load_score(&self) -> Result<(), BootstrapError> {
        let row: Option<ScoreRow> = self
            .store
            .fetch_shared_score()
            .await
            .map_err(fetch_failed("party", "shared score"))?;
        if let Some(row) = row {
            if let Err(rejection) = self.sync.dispatch_score(row.score, Origin::Remote) {
                tracing::warn!(error = %rejection, "Skipping invalid stored score");
            }
        }
        Ok(())
    }
}
