//! Change Subscriber - replays remote changes into local state
//!
//! Every notification from the multiplexed feed is routed to the character
//! it belongs to (or to the shared score) and replayed as a remote action.
//! Echoes of this session's own writes are dropped, and so are status rows
//! for a player whose local status edit has not been written yet.

use serde::de::DeserializeOwned;

use partysheet_domain::{ItemId, PlayerId, Roster};
use partysheet_shared::{
    AdversityRow, AimgRow, ChangeEvent, ChangeKind, InventoryRow, ScoreRow, StatRow, StatusRow,
    Table,
};

use crate::application::sync::mapping::item_from_row;
use crate::application::sync::{CharacterAction, InventoryEdit, Origin, SheetSync};
use crate::ports::outbound::ChangeStream;

/// What the subscriber did with one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Applied,
    /// Written by this session.
    SelfEcho,
    /// Row for a player outside the roster.
    UnknownPlayer(String),
    /// Status row while a local status edit is still pending.
    StatusSuppressed,
    /// Inventory delete for an item no character holds.
    OwnerNotFound,
    /// Deletes on tables without a deletion path.
    Ignored,
    Rejected,
    Malformed,
}

#[derive(Debug, Clone)]
pub struct ChangeSubscriber {
    sync: SheetSync,
    roster: Roster,
}

impl ChangeSubscriber {
    pub fn new(sync: SheetSync, roster: Roster) -> Self {
        Self { sync, roster }
    }

    /// Consumes the feed until it closes.
    pub async fn run(self, mut changes: ChangeStream) {
        tracing::info!("Change subscriber started");
        while let Some(event) = changes.recv().await {
            let outcome = self.route(&event);
            tracing::trace!(table = %event.table, kind = ?event.kind, ?outcome, "Change routed");
        }
        tracing::info!("Change feed closed, subscriber stopped");
    }

    pub fn route(&self, event: &ChangeEvent) -> RouteOutcome {
        if event.session_tag() == Some(self.sync.session_id().to_uuid()) {
            return RouteOutcome::SelfEcho;
        }

        match (event.table, event.kind) {
            (Table::Inventory, ChangeKind::Delete) => self.route_inventory_delete(event),
            (_, ChangeKind::Delete) => RouteOutcome::Ignored,
            (Table::EltaisScore, _) => match decode::<ScoreRow>(event) {
                Some(row) => self.outcome(self.sync.dispatch_score(row.score, Origin::Remote)),
                None => RouteOutcome::Malformed,
            },
            (table, _) => self.route_character_row(table, event),
        }
    }

    fn route_character_row(&self, table: Table, event: &ChangeEvent) -> RouteOutcome {
        let Some(player) = event.record.get("player").and_then(|p| p.as_str()) else {
            tracing::warn!(table = %table, "Change without a player column");
            return RouteOutcome::Malformed;
        };
        let player = PlayerId::from(player);
        if !self.roster.contains(&player) {
            tracing::debug!(player = %player, table = %table, "Ignoring change for unknown player");
            return RouteOutcome::UnknownPlayer(player.to_string());
        }

        let action = match table {
            Table::Adversity => decode::<AdversityRow>(event)
                .map(|row| CharacterAction::Adversity(row.adversity)),
            Table::Status => {
                if self.sync.is_status_pending(&player) {
                    tracing::debug!(
                        player = %player,
                        "Local status edit pending, dropping remote status"
                    );
                    return RouteOutcome::StatusSuppressed;
                }
                decode::<StatusRow>(event).map(|row| CharacterAction::Status(row.status))
            }
            Table::Stats => decode::<StatRow>(event).and_then(|row| {
                match (row.stat.parse(), row.die.parse()) {
                    (Ok(stat), Ok(die)) => Some(CharacterAction::Stat { stat, die }),
                    _ => None,
                }
            }),
            Table::Inventory => decode::<InventoryRow>(event).map(|row| {
                CharacterAction::InventoryItem(InventoryEdit::Item(item_from_row(row)))
            }),
            Table::Aimg => {
                decode::<AimgRow>(event).map(|row| CharacterAction::SecondaryDial(row.value))
            }
            Table::EltaisScore => return RouteOutcome::Ignored,
        };

        match action {
            Some(action) => self.outcome(self.sync.dispatch(&player, action, Origin::Remote)),
            None => RouteOutcome::Malformed,
        }
    }

    fn route_inventory_delete(&self, event: &ChangeEvent) -> RouteOutcome {
        let Some(id) = event.old_id().map(ItemId::from_uuid) else {
            tracing::warn!("Inventory delete without an id");
            return RouteOutcome::Malformed;
        };

        // Delete payloads don't name the owner.
        let owner = self.roster.ids().find(|player| {
            self.sync
                .registry()
                .existing(player)
                .is_some_and(|cell| cell.read(|character| character.owns_item(id)))
        });
        match owner {
            Some(owner) => self.outcome(self.sync.dispatch(
                owner,
                CharacterAction::DeleteInventory(id),
                Origin::Remote,
            )),
            None => {
                tracing::debug!(item = %id, "No character holds deleted item");
                RouteOutcome::OwnerNotFound
            }
        }
    }

    fn outcome<E: std::fmt::Display>(&self, result: Result<(), E>) -> RouteOutcome {
        match result {
            Ok(()) => RouteOutcome::Applied,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping invalid remote change");
                RouteOutcome::Rejected
            }
        }
    }
}

fn decode<T: DeserializeOwned>(event: &ChangeEvent) -> Option<T> {
    match event.new_row::<T>() {
        Ok(row) => Some(row),
        Err(e) => {
            tracing::warn!(table = %event.table, error = %e, "Undecodable change row");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use uuid::Uuid;

    use partysheet_domain::{Die, InventoryItem, SessionId, SharedScore, Stat};

    use crate::application::sync::SyncConfig;
    use crate::ports::outbound::MockRemoteStorePort;
    use crate::state::{CharacterRegistry, ScoreCell};

    fn subscriber() -> ChangeSubscriber {
        let mut store = MockRemoteStorePort::new();
        store.expect_upsert().returning(|_| Ok(()));
        let sync = SheetSync::new(
            CharacterRegistry::new(),
            ScoreCell::new(SharedScore::default()),
            Arc::new(store),
            SessionId::new(),
            SyncConfig::default(),
        );
        ChangeSubscriber::new(sync, Roster::campaign())
    }

    fn update(table: Table, record: serde_json::Value) -> ChangeEvent {
        ChangeEvent::new(table, ChangeKind::Update, record, json!({}))
    }

    fn other_session() -> String {
        Uuid::new_v4().to_string()
    }

    #[tokio::test]
    async fn foreign_changes_are_applied_for_every_table() {
        let sub = subscriber();
        let olympia = PlayerId::from("olympia");
        let item = Uuid::new_v4();
        let events = [
            update(Table::Adversity, json!({ "player": "olympia", "adversity": 7, "session_id": other_session() })),
            update(Table::Status, json!({ "player": "olympia", "status": "asleep", "session_id": other_session() })),
            update(Table::Stats, json!({ "player": "olympia", "stat": "charm", "die": "d4", "session_id": other_session() })),
            update(Table::Inventory, json!({ "id": item, "player": "olympia", "name": "Key", "description": "", "order": "a0", "session_id": other_session() })),
            update(Table::Aimg, json!({ "player": "olympia", "value": 1, "session_id": other_session() })),
            update(Table::EltaisScore, json!({ "id": 1, "score": 12, "session_id": other_session() })),
        ];
        for event in &events {
            assert_eq!(sub.route(event), RouteOutcome::Applied, "{:?}", event.table);
        }

        let c = sub.sync.character(&olympia);
        assert_eq!(c.adversity_tokens, 7);
        assert_eq!(c.status, "asleep");
        assert_eq!(c.stats.get(&Stat::Charm), Some(&Die::D4));
        assert_eq!(c.item(ItemId::from_uuid(item)).map(|i| i.name.as_str()), Some("Key"));
        assert_eq!(c.secondary_dial, 1);
        assert_eq!(sub.sync.score().value(), 12);
    }

    #[tokio::test]
    async fn own_echoes_never_change_state() {
        let sub = subscriber();
        let own = sub.sync.session_id().to_string();
        let before = sub.sync.character(&PlayerId::from("ryan"));
        let events = [
            update(Table::Adversity, json!({ "player": "ryan", "adversity": 0, "session_id": own })),
            update(Table::Status, json!({ "player": "ryan", "status": "x", "session_id": own })),
            update(Table::Stats, json!({ "player": "ryan", "stat": "grit", "die": "d20", "session_id": own })),
            update(Table::Inventory, json!({ "id": Uuid::new_v4(), "player": "ryan", "name": "Lamp", "description": "", "order": "a0", "session_id": own })),
            update(Table::Aimg, json!({ "player": "ryan", "value": 3, "session_id": own })),
            update(Table::EltaisScore, json!({ "id": 1, "score": 0, "session_id": own })),
        ];
        for event in &events {
            assert_eq!(sub.route(event), RouteOutcome::SelfEcho, "{:?}", event.table);
        }
        assert_eq!(sub.sync.character(&PlayerId::from("ryan")), before);
        assert_eq!(sub.sync.score(), SharedScore::default());
    }

    #[tokio::test]
    async fn unknown_players_are_ignored() {
        let sub = subscriber();
        let event = update(Table::Adversity, json!({ "player": "mallory", "adversity": 1 }));
        assert_eq!(
            sub.route(&event),
            RouteOutcome::UnknownPlayer("mallory".into())
        );
        assert!(sub.sync.registry().existing(&PlayerId::from("mallory")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn remote_status_is_dropped_while_local_edit_is_pending() {
        let sub = subscriber();
        let grant = PlayerId::from("grant");
        sub.sync
            .dispatch(&grant, CharacterAction::Status("mine".into()), Origin::Local)
            .expect("valid");

        let stale = update(Table::Status, json!({ "player": "grant", "status": "theirs" }));
        assert_eq!(sub.route(&stale), RouteOutcome::StatusSuppressed);
        assert_eq!(sub.sync.character(&grant).status, "mine");

        tokio::time::sleep(Duration::from_secs(1)).await;
        sub.sync.flush().await;
        assert_eq!(sub.route(&stale), RouteOutcome::Applied);
        assert_eq!(sub.sync.character(&grant).status, "theirs");
    }

    #[tokio::test]
    async fn inventory_delete_finds_the_owner() {
        let sub = subscriber();
        let chris = PlayerId::from("chris");
        let item = InventoryItem::blank(ItemId::new(), "a0");
        sub.sync
            .dispatch(
                &chris,
                CharacterAction::Inventory(vec![item.clone()]),
                Origin::Remote,
            )
            .expect("valid");

        let delete = ChangeEvent::new(
            Table::Inventory,
            ChangeKind::Delete,
            json!({}),
            json!({ "id": item.id.to_string() }),
        );
        assert_eq!(sub.route(&delete), RouteOutcome::Applied);
        assert!(sub.sync.character(&chris).inventory.is_empty());
        assert_eq!(sub.route(&delete), RouteOutcome::OwnerNotFound);
    }

    #[tokio::test]
    async fn foreign_delete_of_an_item_we_wrote_last_is_applied() {
        let sub = subscriber();
        let chris = PlayerId::from("chris");
        let item = InventoryItem::blank(ItemId::new(), "a0");
        sub.sync
            .dispatch(
                &chris,
                CharacterAction::Inventory(vec![item.clone()]),
                Origin::Remote,
            )
            .expect("valid");

        // The old image still names this session as the last writer.
        let delete = ChangeEvent::new(
            Table::Inventory,
            ChangeKind::Delete,
            json!({}),
            json!({
                "id": item.id.to_string(),
                "player": "chris",
                "session_id": sub.sync.session_id().to_string(),
            }),
        );
        assert_eq!(sub.route(&delete), RouteOutcome::Applied);
        assert!(sub.sync.character(&chris).inventory.is_empty());
    }

    #[tokio::test]
    async fn invalid_values_are_rejected_or_malformed() {
        let sub = subscriber();
        let negative = update(Table::Adversity, json!({ "player": "sophia", "adversity": -2 }));
        assert_eq!(sub.route(&negative), RouteOutcome::Rejected);

        let bad_die = update(Table::Stats, json!({ "player": "sophia", "stat": "grit", "die": "d3" }));
        assert_eq!(sub.route(&bad_die), RouteOutcome::Malformed);

        let no_player = update(Table::Status, json!({ "status": "?" }));
        assert_eq!(sub.route(&no_player), RouteOutcome::Malformed);

        assert_eq!(
            sub.sync.character(&PlayerId::from("sophia")).adversity_tokens,
            2
        );
    }
}
