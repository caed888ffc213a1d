//! Per-player debounce for status text.
//!
//! Each edit restarts the player's quiet period; only the value present when
//! the timer fires is written. From the first edit until that write has
//! completed the player is flagged pending, and the change subscriber drops
//! incoming status rows for them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use partysheet_domain::{PlayerId, SessionId};

use super::mapping::row_for;
use super::{FieldWrite, OutboundWriter, WriteCommand};

/// Quiet period after the last keystroke before the status is written.
pub const DEFAULT_STATUS_QUIET_PERIOD: Duration = Duration::from_millis(500);

#[derive(Debug, Default)]
struct PendingStatus {
    /// Bumped by every edit; a timer only fires if it still matches.
    generation: u64,
    value: Option<String>,
    in_flight: bool,
}

#[derive(Debug, Clone)]
pub struct StatusDebouncer {
    quiet_period: Duration,
    session: SessionId,
    writer: OutboundWriter,
    pending: Arc<Mutex<HashMap<PlayerId, PendingStatus>>>,
}

impl StatusDebouncer {
    pub fn new(writer: OutboundWriter, session: SessionId, quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            session,
            writer,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Records `value` as the player's latest status and restarts their timer.
    pub fn schedule(&self, player: &PlayerId, value: String) {
        let generation = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            let entry = pending.entry(player.clone()).or_default();
            entry.generation += 1;
            entry.value = Some(value);
            entry.in_flight = true;
            entry.generation
        };

        let this = self.clone();
        let player = player.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.quiet_period).await;
            this.fire(player, generation).await;
        });
    }

    /// True while an edit for `player` has not yet been written.
    pub fn is_pending(&self, player: &PlayerId) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(player)
            .is_some_and(|entry| entry.in_flight)
    }

    async fn fire(&self, player: PlayerId, generation: u64) {
        let value = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            match pending.get_mut(&player) {
                Some(entry) if entry.generation == generation => entry.value.take(),
                // Superseded by a newer edit, whose own timer will write.
                _ => None,
            }
        };
        let Some(value) = value else {
            return;
        };

        tracing::debug!(player = %player, "Writing debounced status");
        let row = row_for(&player, FieldWrite::Status(value), self.session);
        self.writer.submit_and_wait(WriteCommand::Upsert(row)).await;

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = pending.get_mut(&player) {
            if entry.generation == generation {
                entry.in_flight = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mockall::predicate::function;
    use partysheet_shared::RemoteRow;

    use crate::ports::outbound::MockRemoteStorePort;

    fn status_is(expected: &'static str) -> impl Fn(&RemoteRow) -> bool {
        move |row| matches!(row, RemoteRow::Status(r) if r.status == expected)
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_collapse_into_one_write_of_the_last_value() {
        let mut store = MockRemoteStorePort::new();
        store
            .expect_upsert()
            .with(function(status_is("abc")))
            .times(1)
            .returning(|_| Ok(()));
        let writer = OutboundWriter::spawn(Arc::new(store));
        let debouncer = StatusDebouncer::new(
            writer.clone(),
            SessionId::new(),
            DEFAULT_STATUS_QUIET_PERIOD,
        );
        let player = PlayerId::from("sophia");

        for value in ["a", "ab", "abc"] {
            debouncer.schedule(&player, value.to_string());
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(debouncer.is_pending(&player));

        tokio::time::sleep(Duration::from_millis(600)).await;
        writer.flush().await;
        assert!(!debouncer.is_pending(&player));
    }

    #[tokio::test(start_paused = true)]
    async fn players_have_independent_timers() {
        let mut store = MockRemoteStorePort::new();
        store.expect_upsert().times(2).returning(|_| Ok(()));
        let writer = OutboundWriter::spawn(Arc::new(store));
        let debouncer = StatusDebouncer::new(
            writer.clone(),
            SessionId::new(),
            DEFAULT_STATUS_QUIET_PERIOD,
        );
        let ryan = PlayerId::from("ryan");
        let chris = PlayerId::from("chris");

        debouncer.schedule(&ryan, "hurt".into());
        tokio::time::sleep(Duration::from_millis(300)).await;
        debouncer.schedule(&chris, "lost".into());
        tokio::time::sleep(Duration::from_millis(300)).await;

        writer.flush().await;
        assert!(!debouncer.is_pending(&ryan));
        assert!(debouncer.is_pending(&chris));

        tokio::time::sleep(Duration::from_millis(300)).await;
        writer.flush().await;
        assert!(!debouncer.is_pending(&chris));
    }
}
