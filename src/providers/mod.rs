pub mod cbr;

// Re-export so callers can build the shared cache without reaching into store
pub use crate::store::memory::MemoryCache;
pub use cbr::{CbrProvider, CbrSettings, SnapshotCache};
