//! Sheet Sync Service - local state plus remote mirroring
//!
//! `SheetSync` is the single entry point for mutating character sheets and
//! the shared score. Every dispatch applies the reducer to the latest cell
//! value synchronously, then, for locally originated actions only, queues
//! the matching remote write.

use std::sync::Arc;
use std::time::Duration;

use partysheet_domain::{
    key_between, Character, DomainError, InventoryItem, ItemId, PlayerId, SessionId,
    SharedScore,
};

use crate::ports::outbound::RemoteStorePort;
use crate::state::{CharacterRegistry, ScoreCell};

use super::debounce::DEFAULT_STATUS_QUIET_PERIOD;
use super::mapping::{command_for, score_row};
use super::{
    reduce, reduce_score, CharacterAction, Effect, FieldWrite, InventoryEdit, Origin, OutboundWriter,
    Rejection, StatusDebouncer, WriteCommand,
};

/// Tunables for [`SheetSync`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub status_quiet_period: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            status_quiet_period: DEFAULT_STATUS_QUIET_PERIOD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SheetSync {
    session: SessionId,
    registry: CharacterRegistry,
    score: ScoreCell,
    writer: OutboundWriter,
    status: StatusDebouncer,
}

impl SheetSync {
    /// Must be called inside a tokio runtime; spawns the outbound writer.
    pub fn new(
        registry: CharacterRegistry,
        score: ScoreCell,
        store: Arc<dyn RemoteStorePort>,
        session: SessionId,
        config: SyncConfig,
    ) -> Self {
        let writer = OutboundWriter::spawn(store);
        let status = StatusDebouncer::new(writer.clone(), session, config.status_quiet_period);
        Self {
            session,
            registry,
            score,
            writer,
            status,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    pub fn registry(&self) -> &CharacterRegistry {
        &self.registry
    }

    pub fn score_cell(&self) -> &ScoreCell {
        &self.score
    }

    /// Latest snapshot of `player`'s sheet.
    pub fn character(&self, player: &PlayerId) -> Character {
        self.registry.character(player)
    }

    pub fn score(&self) -> SharedScore {
        self.score.get()
    }

    /// Applies `action` to `player`'s sheet.
    ///
    /// A rejected action leaves both the local cell and the store untouched.
    pub fn dispatch(
        &self,
        player: &PlayerId,
        action: CharacterAction,
        origin: Origin,
    ) -> Result<(), Rejection> {
        let cell = self.registry.cell(player);
        let effect = cell
            .try_update(|prev| {
                reduce(player, prev, action, origin).map(|t| (t.next, t.effect))
            })
            .map_err(|rejection| {
                tracing::debug!(error = %rejection, ?origin, "Action rejected");
                rejection
            })?;

        if let Some(effect) = effect {
            self.run_effect(player, effect);
        }
        Ok(())
    }

    /// Sets the shared score.
    pub fn dispatch_score(&self, value: i64, origin: Origin) -> Result<(), Rejection> {
        let effect = self
            .score
            .try_update(|prev| reduce_score(*prev, value, origin).map(|t| (t.next, t.effect)))
            .map_err(|rejection| {
                tracing::debug!(error = %rejection, ?origin, "Score change rejected");
                rejection
            })?;

        if let Some(Effect::Upsert(FieldWrite::Score(score))) = effect {
            self.writer
                .submit(WriteCommand::Upsert(score_row(score, self.session)));
        }
        Ok(())
    }

    /// Adds `delta` to the player's adversity tokens.
    pub fn adjust_adversity(&self, player: &PlayerId, delta: i64) -> Result<(), Rejection> {
        let current = i64::from(self.character(player).adversity_tokens);
        let target = current.checked_add(delta).ok_or_else(|| Rejection {
            player: player.to_string(),
            action: "adversity",
            reason: DomainError::out_of_range("adversity tokens", delta, -current, i64::MAX - current),
        })?;
        self.dispatch(player, CharacterAction::Adversity(target), Origin::Local)
    }

    /// Appends a blank item to the player's inventory and returns its id.
    pub fn add_inventory_item(&self, player: &PlayerId) -> Result<ItemId, Rejection> {
        let id = ItemId::new();
        self.dispatch(
            player,
            CharacterAction::InventoryItem(InventoryEdit::New(id)),
            Origin::Local,
        )?;
        Ok(id)
    }

    /// Replaces an item's name and description. Its position is unchanged.
    pub fn edit_inventory_item(
        &self,
        player: &PlayerId,
        id: ItemId,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<(), Rejection> {
        let mut item = self.owned_item(player, id, "inventory-item")?;
        item.name = name.into();
        item.description = description.into();
        self.dispatch(
            player,
            CharacterAction::InventoryItem(InventoryEdit::Item(item)),
            Origin::Local,
        )
    }

    /// Deletes an item that was created but never filled in.
    ///
    /// Returns whether the item was deleted.
    pub fn discard_if_empty(&self, player: &PlayerId, id: ItemId) -> Result<bool, Rejection> {
        let item = self.owned_item(player, id, "delete-inventory")?;
        if !item.is_empty() {
            return Ok(false);
        }
        self.dispatch(player, CharacterAction::DeleteInventory(id), Origin::Local)?;
        Ok(true)
    }

    pub fn delete_inventory_item(&self, player: &PlayerId, id: ItemId) -> Result<(), Rejection> {
        self.dispatch(player, CharacterAction::DeleteInventory(id), Origin::Local)
    }

    /// Moves the item displayed at `from` so it is displayed at `to`.
    ///
    /// Only the moved item gets a new order key, computed from its new
    /// neighbours in display order. Neighbours sharing a key leave no gap, so
    /// the item then lands after every item holding that key.
    pub fn move_inventory_item(
        &self,
        player: &PlayerId,
        from: usize,
        to: usize,
    ) -> Result<(), Rejection> {
        let reject = |reason| Rejection {
            player: player.to_string(),
            action: "inventory-item",
            reason,
        };

        let mut items = self.character(player).sorted_inventory();
        if from >= items.len() || to >= items.len() {
            return Err(reject(DomainError::validation(format!(
                "cannot move item {} to {} in a list of {}",
                from,
                to,
                items.len()
            ))));
        }
        if from == to {
            return Ok(());
        }

        let mut moved = items.remove(from);
        items.insert(to, moved.clone());
        let prev = to.checked_sub(1).map(|i| items[i].order.as_str());
        let next = items[to + 1..]
            .iter()
            .map(|item| item.order.as_str())
            .find(|order| prev < Some(*order));
        moved.order = key_between(prev, next).map_err(reject)?;

        tracing::debug!(
            player = %player,
            item = %moved.id,
            order = %moved.order,
            "Moving inventory item"
        );
        self.dispatch(
            player,
            CharacterAction::InventoryItem(InventoryEdit::Item(moved)),
            Origin::Local,
        )
    }

    /// True while a status edit for `player` is waiting to be written.
    pub fn is_status_pending(&self, player: &PlayerId) -> bool {
        self.status.is_pending(player)
    }

    /// Waits until every write queued so far has reached the store.
    ///
    /// Debounced status edits are not queued until their timer fires.
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    fn run_effect(&self, player: &PlayerId, effect: Effect) {
        match effect {
            Effect::DebounceStatus(status) => self.status.schedule(player, status),
            effect => {
                if let Some(command) = command_for(player, effect, self.session) {
                    self.writer.submit(command);
                }
            }
        }
    }

    fn owned_item(
        &self,
        player: &PlayerId,
        id: ItemId,
        action: &'static str,
    ) -> Result<InventoryItem, Rejection> {
        self.registry
            .cell(player)
            .read(|c| c.item(id).cloned())
            .ok_or_else(|| Rejection {
                player: player.to_string(),
                action,
                reason: DomainError::validation(format!("{} has no item {}", player, id)),
            })
    }
}
