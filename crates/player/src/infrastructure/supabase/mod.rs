//! Adapters for the hosted Supabase project.

mod backoff;
mod realtime;
mod rest;

pub use realtime::{RealtimeFeed, DEFAULT_CHANNEL};
pub use rest::PostgrestStore;
