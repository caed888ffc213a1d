//! Actions accepted by the character reducer.

use partysheet_domain::{Die, InventoryItem, ItemId, Stat};

/// Where an action came from.
///
/// Remote actions (bootstrap replays and change notifications) mutate local
/// state but never produce a remote write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Remote,
}

impl Origin {
    pub fn is_local(self) -> bool {
        matches!(self, Self::Local)
    }
}

/// A change to one character's sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharacterAction {
    Adversity(i64),
    Status(String),
    Stat { stat: Stat, die: Die },
    /// Bulk replace of the whole inventory. Only used to seed state.
    Inventory(Vec<InventoryItem>),
    InventoryItem(InventoryEdit),
    DeleteInventory(ItemId),
    SecondaryDial(i64),
}

impl CharacterAction {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Adversity(_) => "adversity",
            Self::Status(_) => "status",
            Self::Stat { .. } => "stats",
            Self::Inventory(_) => "inventory",
            Self::InventoryItem(_) => "inventory-item",
            Self::DeleteInventory(_) => "delete-inventory",
            Self::SecondaryDial(_) => "secondary-dial",
        }
    }
}

/// Payload of an `inventory-item` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryEdit {
    /// Create a blank item with this id after the current last item.
    New(ItemId),
    /// Insert or replace an item by id, verbatim.
    Item(InventoryItem),
}

impl From<ItemId> for InventoryEdit {
    fn from(id: ItemId) -> Self {
        Self::New(id)
    }
}

impl From<InventoryItem> for InventoryEdit {
    fn from(item: InventoryItem) -> Self {
        Self::Item(item)
    }
}
