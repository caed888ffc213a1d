//! Reducer/sync layer.
//!
//! Local state changes go through [`SheetSync::dispatch`]: the pure
//! [`reduce`] step computes the next snapshot, then the effect step mirrors
//! locally originated changes to the store through the ordered
//! [`OutboundWriter`] or, for status text, the [`StatusDebouncer`].

mod action;
mod debounce;
pub mod mapping;
mod reducer;
mod service;
mod writer;

pub use action::{CharacterAction, InventoryEdit, Origin};
pub use debounce::{StatusDebouncer, DEFAULT_STATUS_QUIET_PERIOD};
pub use reducer::{reduce, reduce_score, Effect, FieldWrite, Rejection, Transition};
pub use service::{SheetSync, SyncConfig};
pub use writer::{OutboundWriter, WriteCommand};
