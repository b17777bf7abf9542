//! Error types for the browser seam.

use tabspace_core::types::{GroupId, TabId, WindowId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("no tab with id {0}")]
    TabNotFound(TabId),

    #[error("no group with id {0}")]
    GroupNotFound(GroupId),

    #[error("no window with id {0}")]
    WindowNotFound(WindowId),

    #[error("browser call failed: {0}")]
    Backend(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl BrowserError {
    /// True for errors meaning "the target closed concurrently" — always
    /// handled locally as "item no longer relevant", never surfaced.
    pub fn is_stale_reference(&self) -> bool {
        matches!(
            self,
            Self::TabNotFound(_) | Self::GroupNotFound(_) | Self::WindowNotFound(_)
        )
    }
}
