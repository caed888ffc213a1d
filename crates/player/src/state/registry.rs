//! Per-character state registry.
//!
//! Owned by the composition root and passed explicitly to whatever needs
//! it. Cells are created the first time an id is addressed and live as long
//! as the registry.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use partysheet_domain::{Character, PlayerId};

use super::CharacterCell;

#[derive(Debug, Clone, Default)]
pub struct CharacterRegistry {
    cells: Arc<RwLock<HashMap<PlayerId, CharacterCell>>>,
}

impl CharacterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cell for `id`, created with default values on first access.
    pub fn cell(&self, id: &PlayerId) -> CharacterCell {
        if let Some(cell) = self
            .cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
        {
            return cell.clone();
        }

        let mut cells = self.cells.write().unwrap_or_else(PoisonError::into_inner);
        cells
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::trace!(player = %id, "Creating character cell");
                CharacterCell::new(Character::new(id.clone()))
            })
            .clone()
    }

    /// Current snapshot of `id`'s sheet.
    pub fn character(&self, id: &PlayerId) -> Character {
        self.cell(id).get()
    }

    /// The cell for `id` only if it was already created.
    pub fn existing(&self, id: &PlayerId) -> Option<CharacterCell> {
        self.cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.cells.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
