//! Character sheet snapshot and inventory items.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Die, DomainError, ItemId, PlayerId, Stat};

/// Adversity tokens a fresh character starts with.
pub const DEFAULT_ADVERSITY: u32 = 2;

/// Inclusive bounds of the secondary dial.
pub const SECONDARY_DIAL_MIN: i8 = -3;
pub const SECONDARY_DIAL_MAX: i8 = 3;

/// One character's full sheet, as held by the local state cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: PlayerId,
    pub adversity_tokens: u32,
    pub stats: BTreeMap<Stat, Die>,
    pub status: String,
    /// Storage order only; display order comes from each item's `order` key.
    pub inventory: Vec<InventoryItem>,
    pub secondary_dial: i8,
}

impl Character {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            adversity_tokens: DEFAULT_ADVERSITY,
            stats: BTreeMap::new(),
            status: String::new(),
            inventory: Vec::new(),
            secondary_dial: 0,
        }
    }

    /// Inventory in display order: by order key, ties broken by id.
    pub fn sorted_inventory(&self) -> Vec<InventoryItem> {
        let mut items = self.inventory.clone();
        items.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        items
    }

    pub fn item(&self, id: ItemId) -> Option<&InventoryItem> {
        self.inventory.iter().find(|item| item.id == id)
    }

    pub fn owns_item(&self, id: ItemId) -> bool {
        self.item(id).is_some()
    }

    /// Order key of the item displayed last, if any.
    pub fn last_order_key(&self) -> Option<&str> {
        self.inventory
            .iter()
            .map(|item| item.order.as_str())
            .max()
    }
}

/// A single inventory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    /// Fractional index, see [`crate::ordering`].
    pub order: String,
}

impl InventoryItem {
    /// A blank item placed at `order`.
    pub fn blank(id: ItemId, order: impl Into<String>) -> Self {
        Self {
            id,
            name: String::new(),
            description: String::new(),
            order: order.into(),
        }
    }

    /// An item with no name and no description is considered abandoned by the editor.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.description.is_empty()
    }
}

/// Checks an adversity value requested by a caller.
pub fn validate_adversity(value: i64) -> Result<u32, DomainError> {
    if value < 0 {
        return Err(DomainError::validation(format!(
            "adversity tokens cannot be negative (got {})",
            value
        )));
    }
    u32::try_from(value).map_err(|_| {
        DomainError::out_of_range("adversity tokens", value, 0, i64::from(u32::MAX))
    })
}

pub fn validate_secondary_dial(value: i64) -> Result<i8, DomainError> {
    if !(i64::from(SECONDARY_DIAL_MIN)..=i64::from(SECONDARY_DIAL_MAX)).contains(&value) {
        return Err(DomainError::out_of_range(
            "secondary dial",
            value,
            i64::from(SECONDARY_DIAL_MIN),
            i64::from(SECONDARY_DIAL_MAX),
        ));
    }
    // In range, so the narrowing is lossless.
    Ok(value as i8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(order: &str) -> InventoryItem {
        InventoryItem::blank(ItemId::new(), order)
    }

    #[test]
    fn new_character_has_defaults() {
        let c = Character::new(PlayerId::from("olympia"));
        assert_eq!(c.adversity_tokens, 2);
        assert_eq!(c.status, "");
        assert!(c.stats.is_empty());
        assert!(c.inventory.is_empty());
        assert_eq!(c.secondary_dial, 0);
    }

    #[test]
    fn sorted_inventory_follows_order_keys_not_storage_order() {
        let mut c = Character::new(PlayerId::from("ryan"));
        let late = item("a2");
        let early = item("a0");
        let middle = item("a0V");
        c.inventory = vec![late.clone(), early.clone(), middle.clone()];

        let sorted: Vec<ItemId> = c.sorted_inventory().iter().map(|i| i.id).collect();
        assert_eq!(sorted, vec![early.id, middle.id, late.id]);
        assert_eq!(c.last_order_key(), Some("a2"));
    }

    #[test]
    fn adversity_validation_rejects_negative() {
        assert_eq!(validate_adversity(0), Ok(0));
        assert_eq!(validate_adversity(7), Ok(7));
        assert!(matches!(
            validate_adversity(-1),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn secondary_dial_validation_enforces_bounds() {
        assert_eq!(validate_secondary_dial(-3), Ok(-3));
        assert_eq!(validate_secondary_dial(3), Ok(3));
        assert!(validate_secondary_dial(4).is_err());
        assert!(validate_secondary_dial(-4).is_err());
    }

    #[test]
    fn character_serializes_camel_case() {
        let c = Character::new(PlayerId::from("chris"));
        let json = serde_json::to_value(&c).expect("serialize");
        assert_eq!(json["adversityTokens"], 2);
        assert_eq!(json["secondaryDial"], 0);
    }
}
