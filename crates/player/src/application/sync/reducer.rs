//! Pure state transitions.
//!
//! `reduce` computes the next snapshot and the remote effect that should
//! follow it. It never performs I/O; [`super::SheetSync`] applies the
//! snapshot to the cell and hands the effect to the writer or debouncer.

use thiserror::Error;

use partysheet_domain::{
    key_between, validate_adversity, validate_secondary_dial, Character, Die, DomainError,
    InventoryItem, ItemId, PlayerId, SharedScore, Stat,
};

use super::{CharacterAction, InventoryEdit, Origin};

/// A field write mirrored to the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldWrite {
    Adversity(u32),
    Status(String),
    Stat(Stat, Die),
    InventoryItem(InventoryItem),
    SecondaryDial(i8),
    Score(SharedScore),
}

/// Remote side effect of a locally originated action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Upsert(FieldWrite),
    DeleteInventory(ItemId),
    /// Status text goes through the per-player debouncer instead.
    DebounceStatus(String),
}

/// Result of a successful reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<T> {
    pub next: T,
    pub effect: Option<Effect>,
}

/// An action that failed validation. Nothing changes locally or remotely.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{action} rejected for {player}: {reason}")]
pub struct Rejection {
    pub player: String,
    pub action: &'static str,
    #[source]
    pub reason: DomainError,
}

impl Rejection {
    fn new(player: &PlayerId, action: &'static str, reason: DomainError) -> Self {
        Self {
            player: player.to_string(),
            action,
            reason,
        }
    }
}

/// Applies `action` to `prev`.
pub fn reduce(
    player: &PlayerId,
    prev: &Character,
    action: CharacterAction,
    origin: Origin,
) -> Result<Transition<Character>, Rejection> {
    let kind = action.kind();
    let reject = |reason| Rejection::new(player, kind, reason);
    let mut next = prev.clone();

    let effect = match action {
        CharacterAction::Adversity(value) => {
            let tokens = validate_adversity(value).map_err(reject)?;
            next.adversity_tokens = tokens;
            Some(Effect::Upsert(FieldWrite::Adversity(tokens)))
        }
        CharacterAction::Status(status) => {
            next.status = status.clone();
            Some(Effect::DebounceStatus(status))
        }
        CharacterAction::Stat { stat, die } => {
            next.stats.insert(stat, die);
            Some(Effect::Upsert(FieldWrite::Stat(stat, die)))
        }
        CharacterAction::Inventory(items) => {
            next.inventory = items;
            None
        }
        CharacterAction::InventoryItem(edit) => {
            let item = match edit {
                InventoryEdit::New(id) => {
                    let order = key_between(prev.last_order_key(), None).map_err(reject)?;
                    InventoryItem::blank(id, order)
                }
                InventoryEdit::Item(item) => item,
            };
            match next.inventory.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => *existing = item.clone(),
                None => next.inventory.push(item.clone()),
            }
            Some(Effect::Upsert(FieldWrite::InventoryItem(item)))
        }
        CharacterAction::DeleteInventory(id) => {
            next.inventory.retain(|item| item.id != id);
            Some(Effect::DeleteInventory(id))
        }
        CharacterAction::SecondaryDial(value) => {
            let dial = validate_secondary_dial(value).map_err(reject)?;
            next.secondary_dial = dial;
            Some(Effect::Upsert(FieldWrite::SecondaryDial(dial)))
        }
    };

    Ok(Transition {
        next,
        effect: effect.filter(|_| origin.is_local()),
    })
}

/// Applies a shared-score change.
pub fn reduce_score(
    _prev: SharedScore,
    value: i64,
    origin: Origin,
) -> Result<Transition<SharedScore>, Rejection> {
    let score = SharedScore::new(value).map_err(|reason| Rejection {
        player: String::from("party"),
        action: "score",
        reason,
    })?;
    Ok(Transition {
        next: score,
        effect: origin
            .is_local()
            .then_some(Effect::Upsert(FieldWrite::Score(score))),
    })
}
