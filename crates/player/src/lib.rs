//! Partysheet Player - the realtime character sheet client.
//!
//! Local state lives in reactive cells owned by a [`state::CharacterRegistry`].
//! The [`application`] layer mirrors local edits to the hosted store and
//! replays remote changes back into the cells. Adapters for the store, its
//! change feed and local persistence live in [`infrastructure`].

pub mod application;
pub mod config;
pub mod infrastructure;
pub mod ports;
pub mod state;
