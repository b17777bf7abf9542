//! Key/value persistence backend and typed access to the three stored keys.
//!
//! The backend is last-write-wins with no transactions: callers read the
//! latest snapshot, mutate in memory, and write the whole affected key
//! back. Serialization through these helpers is shape-tolerant — a corrupt
//! or partial stored value decodes as empty instead of failing the
//! reconciliation pass.

use serde_json::Value;
use tabspace_core::types::{ActiveWorkspaceMap, WindowAssignments, WorkspaceDefinition};

use crate::error::BrowserError;

/// Stored key: window id → workspace assignments.
pub const KEY_ASSIGNMENTS: &str = "workspace_assignments";
/// Stored key: window id → active workspace id.
pub const KEY_ACTIVE: &str = "active_workspaces";
/// Stored key: ordered workspace definition list.
pub const KEY_DEFINITIONS: &str = "workspace_definitions";

/// Async-host key/value store (browser `storage.local` shaped).
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, BrowserError>;
    fn set(&self, key: &str, value: Value) -> Result<(), BrowserError>;
}

impl<T: StorageBackend + ?Sized> StorageBackend for &T {
    fn get(&self, key: &str) -> Result<Option<Value>, BrowserError> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: Value) -> Result<(), BrowserError> {
        (**self).set(key, value)
    }
}

fn decode_or_default<T: serde::de::DeserializeOwned + Default>(value: Option<Value>) -> T {
    value
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, BrowserError> {
    serde_json::to_value(value).map_err(|e| BrowserError::Storage(e.to_string()))
}

pub fn load_assignments<S: StorageBackend>(
    storage: &S,
) -> Result<WindowAssignments, BrowserError> {
    Ok(decode_or_default(storage.get(KEY_ASSIGNMENTS)?))
}

pub fn save_assignments<S: StorageBackend>(
    storage: &S,
    assignments: &WindowAssignments,
) -> Result<(), BrowserError> {
    storage.set(KEY_ASSIGNMENTS, encode(assignments)?)
}

pub fn load_active<S: StorageBackend>(storage: &S) -> Result<ActiveWorkspaceMap, BrowserError> {
    Ok(decode_or_default(storage.get(KEY_ACTIVE)?))
}

pub fn save_active<S: StorageBackend>(
    storage: &S,
    active: &ActiveWorkspaceMap,
) -> Result<(), BrowserError> {
    storage.set(KEY_ACTIVE, encode(active)?)
}

pub fn load_definitions<S: StorageBackend>(
    storage: &S,
) -> Result<Vec<WorkspaceDefinition>, BrowserError> {
    Ok(decode_or_default(storage.get(KEY_DEFINITIONS)?))
}

pub fn save_definitions<S: StorageBackend>(
    storage: &S,
    definitions: &[WorkspaceDefinition],
) -> Result<(), BrowserError> {
    storage.set(KEY_DEFINITIONS, encode(&definitions)?)
}
