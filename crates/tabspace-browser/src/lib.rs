//! Host-browser seam: query/mutation traits, persistence backend, typed
//! events, and in-memory fakes for testing.
//!
//! The traits mirror the subset of the browser extension surface the
//! reconciliation engine consumes; both are mock-injectable the same way
//! the engine is exercised in tests.

pub mod error;
pub mod events;
pub mod host;
pub mod memory;
pub mod storage;

pub use error::BrowserError;
pub use events::BrowserEvent;
pub use host::{snapshot_window, BrowserHost};
pub use memory::{MemoryBrowser, MemoryStorage};
pub use storage::StorageBackend;
