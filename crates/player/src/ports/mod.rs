//! Port traits the sync layer depends on.

pub mod outbound;
