//! Partysheet Domain - the shared character sheet data model.
//!
//! Pure types and invariants; no I/O. The sync layer in `partysheet-player`
//! builds on these.

pub mod character;
pub mod error;
pub mod ids;
pub mod ordering;
pub mod roster;
pub mod score;
pub mod stat;

pub use character::{
    validate_adversity, validate_secondary_dial, Character, InventoryItem, DEFAULT_ADVERSITY,
    SECONDARY_DIAL_MAX, SECONDARY_DIAL_MIN,
};
pub use error::DomainError;
pub use ids::{ItemId, PlayerId, SessionId};
pub use ordering::key_between;
pub use roster::Roster;
pub use score::{SharedScore, SHARED_SCORE_ROW_ID};
pub use stat::{rank_stats, Die, Stat};
