//! In-memory store
//!
//! Implements both store ports with the hosted store's contract: upserts by
//! natural key, deletes of inventory rows by id, and one change event per
//! write broadcast to every subscriber. Several sessions sharing one
//! `InMemoryStore` behave like several clients sharing the hosted store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use partysheet_shared::{
    AdversityRow, AimgRow, ChangeEvent, ChangeKind, InventoryRow, RemoteRow, ScoreRow, StatRow,
    StatusRow, Table,
};

use crate::ports::outbound::{ChangeFeedPort, ChangeStream, FeedError, RemoteStorePort, StoreError};

/// A write as received by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggedWrite {
    Upsert(RemoteRow),
    Delete(Uuid),
}

#[derive(Debug, Default)]
struct Inner {
    rows: HashMap<(Table, Vec<String>), RemoteRow>,
    subscribers: Vec<mpsc::UnboundedSender<ChangeEvent>>,
    writes: Vec<LoggedWrite>,
    fail_writes: bool,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write received so far, in arrival order. Failed writes are not logged.
    pub fn writes(&self) -> Vec<LoggedWrite> {
        self.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    /// While set, every write fails with a transport error and changes nothing.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub fn row_count(&self) -> usize {
        self.lock().rows.len()
    }

    /// Injects a change event as if another client had written it.
    pub fn publish(&self, event: ChangeEvent) {
        self.lock().broadcast(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn find<T>(&self, table: Table, key: Vec<String>, pick: impl Fn(&RemoteRow) -> Option<T>) -> Option<T> {
        self.lock().rows.get(&(table, key)).and_then(pick)
    }
}

impl Inner {
    fn broadcast(&mut self, event: ChangeEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

/// Old image as the hosted store sends it: key columns only.
fn key_image(table: Table, key: &[String]) -> Value {
    let mut image = Map::new();
    for (column, value) in table.conflict_columns().iter().zip(key) {
        image.insert((*column).to_string(), Value::String(value.clone()));
    }
    Value::Object(image)
}

#[async_trait]
impl RemoteStorePort for InMemoryStore {
    async fn upsert(&self, row: RemoteRow) -> Result<(), StoreError> {
        let record = row.to_json().map_err(StoreError::serialization)?;
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(StoreError::transport("upsert", "store unavailable"));
        }

        let table = row.table();
        let key = row.natural_key();
        let old_record = key_image(table, &key);
        let kind = match inner.rows.insert((table, key), row.clone()) {
            Some(_) => ChangeKind::Update,
            None => ChangeKind::Insert,
        };
        inner.writes.push(LoggedWrite::Upsert(row));
        inner.broadcast(ChangeEvent::new(table, kind, record, old_record));
        Ok(())
    }

    async fn delete_inventory_item(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(StoreError::transport("delete_inventory_item", "store unavailable"));
        }

        inner.writes.push(LoggedWrite::Delete(id));
        if inner
            .rows
            .remove(&(Table::Inventory, vec![id.to_string()]))
            .is_some()
        {
            // Deletes carry neither the owner nor the writer's session.
            inner.broadcast(ChangeEvent::new(
                Table::Inventory,
                ChangeKind::Delete,
                json!({}),
                json!({ "id": id.to_string() }),
            ));
        }
        Ok(())
    }

    async fn fetch_adversity(&self, player: &str) -> Result<Option<AdversityRow>, StoreError> {
        Ok(self.find(Table::Adversity, vec![player.to_string()], |row| match row {
            RemoteRow::Adversity(r) => Some(r.clone()),
            _ => None,
        }))
    }

    async fn fetch_status(&self, player: &str) -> Result<Option<StatusRow>, StoreError> {
        Ok(self.find(Table::Status, vec![player.to_string()], |row| match row {
            RemoteRow::Status(r) => Some(r.clone()),
            _ => None,
        }))
    }

    async fn fetch_stat(&self, player: &str, stat: &str) -> Result<Option<StatRow>, StoreError> {
        let key = vec![player.to_string(), stat.to_string()];
        Ok(self.find(Table::Stats, key, |row| match row {
            RemoteRow::Stat(r) => Some(r.clone()),
            _ => None,
        }))
    }

    async fn fetch_inventory(&self, player: &str) -> Result<Vec<InventoryRow>, StoreError> {
        let mut items: Vec<InventoryRow> = self
            .lock()
            .rows
            .values()
            .filter_map(|row| match row {
                RemoteRow::Inventory(r) if r.player == player => Some(r.clone()),
                _ => None,
            })
            .collect();
        items.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn fetch_secondary_dial(&self, player: &str) -> Result<Option<AimgRow>, StoreError> {
        Ok(self.find(Table::Aimg, vec![player.to_string()], |row| match row {
            RemoteRow::Aimg(r) => Some(r.clone()),
            _ => None,
        }))
    }

    async fn fetch_shared_score(&self) -> Result<Option<ScoreRow>, StoreError> {
        let key = vec![partysheet_domain::SHARED_SCORE_ROW_ID.to_string()];
        Ok(self.find(Table::EltaisScore, key, |row| match row {
            RemoteRow::Score(r) => Some(r.clone()),
            _ => None,
        }))
    }
}

#[async_trait]
impl ChangeFeedPort for InMemoryStore {
    async fn subscribe(&self) -> Result<ChangeStream, FeedError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adversity(player: &str, value: i64) -> RemoteRow {
        RemoteRow::Adversity(AdversityRow {
            player: player.into(),
            adversity: value,
            session_id: Some(Uuid::new_v4()),
        })
    }

    #[tokio::test]
    async fn upsert_replaces_by_natural_key_and_broadcasts() {
        let store = InMemoryStore::new();
        let mut feed = store.subscribe().await.expect("subscribe");

        store.upsert(adversity("olympia", 3)).await.expect("upsert");
        store.upsert(adversity("olympia", 4)).await.expect("upsert");

        assert_eq!(store.row_count(), 1);
        let row = store.fetch_adversity("olympia").await.expect("fetch");
        assert_eq!(row.map(|r| r.adversity), Some(4));

        let first = feed.recv().await.expect("event");
        let second = feed.recv().await.expect("event");
        assert_eq!(first.kind, ChangeKind::Insert);
        assert_eq!(second.kind, ChangeKind::Update);
        assert_eq!(second.record["adversity"], 4);
        assert_eq!(second.old_record["player"], "olympia");
    }

    #[tokio::test]
    async fn delete_event_carries_only_the_id() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        store
            .upsert(RemoteRow::Inventory(InventoryRow {
                id,
                player: "ryan".into(),
                name: "Torch".into(),
                description: String::new(),
                order: "a0".into(),
                session_id: Some(Uuid::new_v4()),
            }))
            .await
            .expect("upsert");
        let mut feed = store.subscribe().await.expect("subscribe");

        store.delete_inventory_item(id).await.expect("delete");

        let event = feed.recv().await.expect("event");
        assert_eq!(event.kind, ChangeKind::Delete);
        assert_eq!(event.old_id(), Some(id));
        assert_eq!(event.session_tag(), None);
        assert!(store.fetch_inventory("ryan").await.expect("fetch").is_empty());
    }

    #[tokio::test]
    async fn failing_store_changes_nothing() {
        let store = InMemoryStore::new();
        store.set_fail_writes(true);
        assert!(store.upsert(adversity("chris", 1)).await.is_err());
        assert_eq!(store.row_count(), 0);
        assert!(store.writes().is_empty());
    }
}
