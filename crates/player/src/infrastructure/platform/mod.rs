//! Platform adapters for local persistence.

mod desktop;
mod memory;

pub use desktop::DesktopStorageProvider;
pub use memory::MemoryStorage;
