//! Core domain logic for workspace identity reconciliation.
//!
//! Pure, deterministic, IO-free. The modules here cover:
//!
//! - `types` — persisted assignment model and live window/tab/group model
//! - `url` — URL normalization used for restart-durable tab identity
//! - `fingerprint` — window fingerprints for orphan/live similarity scoring
//! - `matcher` — asymmetric coverage similarity and the acceptance gate
//! - `matching` — greedy one-to-one resolution over a score matrix
//! - `store` — assignment-store mutations (single-membership invariant)
//! - `reorder` — target-order planning for a live tab strip

pub mod fingerprint;
pub mod matcher;
pub mod matching;
pub mod reorder;
pub mod store;
pub mod types;
pub mod url;
