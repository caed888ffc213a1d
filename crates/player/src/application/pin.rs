//! Pinned (claimed) character.
//!
//! Each client claims at most one character; only that character is
//! editable locally. The claim is persisted as JSON (`"olympia"` or
//! `null`) and never replicated.

use std::sync::{Arc, PoisonError, RwLock};

use partysheet_domain::PlayerId;

use crate::ports::outbound::{storage_keys, StorageProvider};

#[derive(Debug, Clone)]
pub struct PinStore<S: StorageProvider> {
    storage: S,
    pinned: Arc<RwLock<Option<PlayerId>>>,
}

impl<S: StorageProvider> PinStore<S> {
    /// Loads the persisted claim. Unreadable values count as no claim.
    pub fn new(storage: S) -> Self {
        let pinned = storage
            .load(storage_keys::PINNED_CHARACTER)
            .and_then(|raw| match serde_json::from_str::<Option<PlayerId>>(&raw) {
                Ok(pinned) => pinned,
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring unreadable pinned character");
                    None
                }
            });
        Self {
            storage,
            pinned: Arc::new(RwLock::new(pinned)),
        }
    }

    pub fn pinned(&self) -> Option<PlayerId> {
        self.pinned
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, pinned: Option<PlayerId>) {
        match serde_json::to_string(&pinned) {
            Ok(raw) => self.storage.save(storage_keys::PINNED_CHARACTER, &raw),
            Err(e) => tracing::error!(error = %e, "Failed to serialize pinned character"),
        }
        tracing::info!(pinned = ?pinned, "Pinned character changed");
        *self.pinned.write().unwrap_or_else(PoisonError::into_inner) = pinned;
    }

    /// Claims `player`, or releases the claim if `player` is already pinned.
    /// Returns the new claim.
    pub fn toggle(&self, player: &PlayerId) -> Option<PlayerId> {
        let next = match self.pinned() {
            Some(current) if &current == player => None,
            _ => Some(player.clone()),
        };
        self.set(next.clone());
        next
    }

    /// Only the pinned character accepts local edits.
    pub fn can_edit(&self, player: &PlayerId) -> bool {
        self.pinned().as_ref() == Some(player)
    }
}
