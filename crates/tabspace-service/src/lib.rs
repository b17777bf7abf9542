//! Async orchestration for workspace identity reconciliation.
//!
//! The [`Reconciler`] owns every piece of mutable coordination state:
//! the migration lock, the debounce timers, the per-window reorder
//! guards, and the per-key command queue. It is constructed once at
//! process start and shared behind an `Arc`.
//!
//! Control flow: `run_migration` runs once at startup before any sync
//! pass is allowed through. Every browser event schedules a debounced
//! sync for its window, a sync pass schedules a debounced reorder, and
//! reorder passes are guarded against re-triggering themselves through
//! the move events they cause.

pub mod config;
pub mod debounce;
pub mod queue;
pub mod reconciler;

mod migrate;
mod reorder_driver;
mod sync;

pub use config::ReconcilerConfig;
pub use reconciler::{Reconciler, ServiceError};
