//! Browser query/mutation trait. Enables mock injection for testing.

use tabspace_core::types::{
    GroupId, LiveGroup, LiveTab, LiveWindow, TabId, WindowId, WindowSnapshot,
};

use crate::error::BrowserError;

/// Read/write access to the live browser session.
///
/// Query calls may fail with a not-found error if the target closed
/// mid-query; mutation calls fail independently of one another.
pub trait BrowserHost: Send + Sync {
    fn list_windows(&self) -> Result<Vec<LiveWindow>, BrowserError>;
    fn list_tabs(&self, window: WindowId) -> Result<Vec<LiveTab>, BrowserError>;
    fn list_groups(&self, window: WindowId) -> Result<Vec<LiveGroup>, BrowserError>;
    fn get_tab(&self, tab: TabId) -> Result<LiveTab, BrowserError>;
    fn get_group(&self, group: GroupId) -> Result<LiveGroup, BrowserError>;
    /// Move a tab to an absolute index within its window.
    fn move_tab(&self, tab: TabId, to_index: u32) -> Result<(), BrowserError>;
    /// Move a whole group (and its tabs, contiguously) to an absolute index.
    fn move_group(&self, group: GroupId, to_index: u32) -> Result<(), BrowserError>;
}

impl<T: BrowserHost + ?Sized> BrowserHost for &T {
    fn list_windows(&self) -> Result<Vec<LiveWindow>, BrowserError> {
        (**self).list_windows()
    }
    fn list_tabs(&self, window: WindowId) -> Result<Vec<LiveTab>, BrowserError> {
        (**self).list_tabs(window)
    }
    fn list_groups(&self, window: WindowId) -> Result<Vec<LiveGroup>, BrowserError> {
        (**self).list_groups(window)
    }
    fn get_tab(&self, tab: TabId) -> Result<LiveTab, BrowserError> {
        (**self).get_tab(tab)
    }
    fn get_group(&self, group: GroupId) -> Result<LiveGroup, BrowserError> {
        (**self).get_group(group)
    }
    fn move_tab(&self, tab: TabId, to_index: u32) -> Result<(), BrowserError> {
        (**self).move_tab(tab, to_index)
    }
    fn move_group(&self, group: GroupId, to_index: u32) -> Result<(), BrowserError> {
        (**self).move_group(group, to_index)
    }
}

/// Capture one window's tabs and groups as a point-in-time snapshot.
pub fn snapshot_window<H: BrowserHost>(
    host: &H,
    window: WindowId,
) -> Result<WindowSnapshot, BrowserError> {
    let tabs = host.list_tabs(window)?;
    let groups = host.list_groups(window)?;
    Ok(WindowSnapshot {
        window_id: window,
        tabs,
        groups,
    })
}
