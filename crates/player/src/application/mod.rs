//! Application layer: sync service, bootstrap, change routing, pinning.

pub mod bootstrap;
pub mod pin;
pub mod session;
pub mod subscriber;
pub mod sync;
