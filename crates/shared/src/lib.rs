//! Partysheet Shared - wire types exchanged with the hosted realtime store
//!
//! This crate contains the types both sides of the wire agree on:
//! - Table names and natural keys
//! - Row images for every synchronized table
//! - Realtime (Phoenix channel) frames and change notifications
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde, uuid, serde_json, and thiserror
//! 2. **No business logic** - Pure data types and serialization
//! 3. **No domain types** - rows use raw strings and `uuid::Uuid`; the client
//!    maps them onto domain values

pub mod error;
pub mod realtime;
pub mod rows;
pub mod tables;

pub use error::ProtocolError;
pub use realtime::{ChangeEvent, ChangeKind, PhoenixMessage, PostgresChangeData};
pub use rows::{AdversityRow, AimgRow, InventoryRow, RemoteRow, ScoreRow, StatRow, StatusRow};
pub use tables::Table;
