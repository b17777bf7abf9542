//! Typed event feed from the host browser.
//!
//! One sum type instead of per-callback registration: every variant is
//! dispatched into a single handler whose only contract obligation is to
//! schedule a sync for the affected window (plus the group-created
//! auto-assignment grace path).

use serde::{Deserialize, Serialize};
use tabspace_core::types::{GroupId, TabId, WindowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BrowserEvent {
    TabCreated { window: WindowId, tab: TabId },
    TabRemoved { window: WindowId, tab: TabId },
    TabMoved { window: WindowId, tab: TabId },
    TabUpdated { window: WindowId, tab: TabId },
    /// Tab attached to `window` (moved in from another window).
    TabAttached { window: WindowId, tab: TabId },
    /// Tab detached from `window` (moving to another window).
    TabDetached { window: WindowId, tab: TabId },
    GroupCreated { window: WindowId, group: GroupId },
    GroupUpdated { window: WindowId, group: GroupId },
    GroupMoved { window: WindowId, group: GroupId },
    GroupRemoved { window: WindowId, group: GroupId },
}

impl BrowserEvent {
    /// The window whose assignments this event can invalidate.
    pub fn window(&self) -> WindowId {
        match *self {
            Self::TabCreated { window, .. }
            | Self::TabRemoved { window, .. }
            | Self::TabMoved { window, .. }
            | Self::TabUpdated { window, .. }
            | Self::TabAttached { window, .. }
            | Self::TabDetached { window, .. }
            | Self::GroupCreated { window, .. }
            | Self::GroupUpdated { window, .. }
            | Self::GroupMoved { window, .. }
            | Self::GroupRemoved { window, .. } => window,
        }
    }
}
