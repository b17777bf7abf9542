//! In-memory browser and storage fakes.
//!
//! `MemoryBrowser` applies real move semantics (index clamping, contiguous
//! group-block moves), so engine tests can assert against the actual
//! resulting tab order rather than a recorded call list.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tabspace_core::types::{
    GroupColor, GroupId, LiveGroup, LiveTab, LiveWindow, TabId, WindowId,
};

use crate::error::BrowserError;
use crate::host::BrowserHost;
use crate::storage::StorageBackend;

// ─── Memory Browser ───────────────────────────────────────────────

#[derive(Debug, Clone)]
struct TabRecord {
    window_id: WindowId,
    url: String,
    title: String,
    pinned: bool,
    group_id: Option<GroupId>,
}

#[derive(Debug, Clone)]
struct GroupRecord {
    window_id: WindowId,
    title: String,
    color: GroupColor,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    /// Tab order per window.
    windows: BTreeMap<WindowId, Vec<TabId>>,
    tabs: BTreeMap<TabId, TabRecord>,
    groups: BTreeMap<GroupId, GroupRecord>,
}

/// Fake browser session with real tab-strip move semantics.
#[derive(Debug, Default)]
pub struct MemoryBrowser {
    inner: Mutex<Inner>,
}

impl MemoryBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Builders (test setup) ───────────────────────────────────

    pub fn add_window(&self) -> WindowId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.windows.insert(id, Vec::new());
        id
    }

    pub fn add_tab(&self, window: WindowId, url: &str) -> TabId {
        self.add_tab_full(window, url, "", false)
    }

    pub fn add_pinned_tab(&self, window: WindowId, url: &str) -> TabId {
        self.add_tab_full(window, url, "", true)
    }

    pub fn add_tab_full(&self, window: WindowId, url: &str, title: &str, pinned: bool) -> TabId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.tabs.insert(
            id,
            TabRecord {
                window_id: window,
                url: url.to_string(),
                title: title.to_string(),
                pinned,
                group_id: None,
            },
        );
        inner.windows.entry(window).or_default().push(id);
        id
    }

    pub fn add_group(&self, window: WindowId, title: &str, color: GroupColor) -> GroupId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.groups.insert(
            id,
            GroupRecord {
                window_id: window,
                title: title.to_string(),
                color,
            },
        );
        id
    }

    /// Put tabs into a group (they stay at their current positions).
    pub fn group_tabs(&self, group: GroupId, tabs: &[TabId]) {
        let mut inner = self.lock();
        for tab in tabs {
            if let Some(record) = inner.tabs.get_mut(tab) {
                record.group_id = Some(group);
            }
        }
    }

    pub fn remove_tab(&self, tab: TabId) {
        let mut inner = self.lock();
        if let Some(record) = inner.tabs.remove(&tab) {
            if let Some(order) = inner.windows.get_mut(&record.window_id) {
                order.retain(|t| *t != tab);
            }
        }
    }

    pub fn close_window(&self, window: WindowId) {
        let mut inner = self.lock();
        if let Some(order) = inner.windows.remove(&window) {
            for tab in order {
                inner.tabs.remove(&tab);
            }
        }
        inner.groups.retain(|_, g| g.window_id != window);
    }

    // ── Assertion helpers ───────────────────────────────────────

    /// Current tab ids of a window, in strip order.
    pub fn tab_order(&self, window: WindowId) -> Vec<TabId> {
        self.lock().windows.get(&window).cloned().unwrap_or_default()
    }

    /// Current tab URLs of a window, in strip order.
    pub fn url_order(&self, window: WindowId) -> Vec<String> {
        let inner = self.lock();
        inner
            .windows
            .get(&window)
            .map(|order| {
                order
                    .iter()
                    .filter_map(|t| inner.tabs.get(t).map(|r| r.url.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl BrowserHost for MemoryBrowser {
    fn list_windows(&self) -> Result<Vec<LiveWindow>, BrowserError> {
        Ok(self
            .lock()
            .windows
            .keys()
            .map(|id| LiveWindow { id: *id })
            .collect())
    }

    fn list_tabs(&self, window: WindowId) -> Result<Vec<LiveTab>, BrowserError> {
        let inner = self.lock();
        let order = inner
            .windows
            .get(&window)
            .ok_or(BrowserError::WindowNotFound(window))?;
        Ok(order
            .iter()
            .enumerate()
            .filter_map(|(index, id)| {
                inner.tabs.get(id).map(|r| LiveTab {
                    id: *id,
                    window_id: window,
                    index: index as u32,
                    url: r.url.clone(),
                    title: r.title.clone(),
                    pinned: r.pinned,
                    group_id: r.group_id,
                })
            })
            .collect())
    }

    fn list_groups(&self, window: WindowId) -> Result<Vec<LiveGroup>, BrowserError> {
        let inner = self.lock();
        let order = inner
            .windows
            .get(&window)
            .ok_or(BrowserError::WindowNotFound(window))?;
        let mut out = Vec::new();
        for (id, record) in &inner.groups {
            if record.window_id != window {
                continue;
            }
            // A group with no member tabs does not exist as far as the
            // browser is concerned.
            let first = order
                .iter()
                .position(|t| inner.tabs.get(t).is_some_and(|r| r.group_id == Some(*id)));
            if let Some(index) = first {
                out.push(LiveGroup {
                    id: *id,
                    window_id: window,
                    title: record.title.clone(),
                    color: record.color,
                    index: index as u32,
                });
            }
        }
        Ok(out)
    }

    fn get_tab(&self, tab: TabId) -> Result<LiveTab, BrowserError> {
        let inner = self.lock();
        let record = inner.tabs.get(&tab).ok_or(BrowserError::TabNotFound(tab))?;
        let index = inner
            .windows
            .get(&record.window_id)
            .and_then(|order| order.iter().position(|t| *t == tab))
            .ok_or(BrowserError::TabNotFound(tab))?;
        Ok(LiveTab {
            id: tab,
            window_id: record.window_id,
            index: index as u32,
            url: record.url.clone(),
            title: record.title.clone(),
            pinned: record.pinned,
            group_id: record.group_id,
        })
    }

    fn get_group(&self, group: GroupId) -> Result<LiveGroup, BrowserError> {
        let inner = self.lock();
        let record = inner
            .groups
            .get(&group)
            .ok_or(BrowserError::GroupNotFound(group))?;
        let order = inner
            .windows
            .get(&record.window_id)
            .ok_or(BrowserError::GroupNotFound(group))?;
        let index = order
            .iter()
            .position(|t| inner.tabs.get(t).is_some_and(|r| r.group_id == Some(group)))
            .ok_or(BrowserError::GroupNotFound(group))?;
        Ok(LiveGroup {
            id: group,
            window_id: record.window_id,
            title: record.title.clone(),
            color: record.color,
            index: index as u32,
        })
    }

    fn move_tab(&self, tab: TabId, to_index: u32) -> Result<(), BrowserError> {
        let mut inner = self.lock();
        let window = inner
            .tabs
            .get(&tab)
            .ok_or(BrowserError::TabNotFound(tab))?
            .window_id;
        let order = inner
            .windows
            .get_mut(&window)
            .ok_or(BrowserError::TabNotFound(tab))?;
        let from = order
            .iter()
            .position(|t| *t == tab)
            .ok_or(BrowserError::TabNotFound(tab))?;
        order.remove(from);
        let to = (to_index as usize).min(order.len());
        order.insert(to, tab);
        Ok(())
    }

    fn move_group(&self, group: GroupId, to_index: u32) -> Result<(), BrowserError> {
        let mut inner = self.lock();
        let window = inner
            .groups
            .get(&group)
            .ok_or(BrowserError::GroupNotFound(group))?
            .window_id;
        let Inner { windows, tabs, .. } = &mut *inner;
        let order = windows
            .get_mut(&window)
            .ok_or(BrowserError::GroupNotFound(group))?;
        let members: Vec<TabId> = order
            .iter()
            .filter(|t| tabs.get(t).is_some_and(|r| r.group_id == Some(group)))
            .copied()
            .collect();
        if members.is_empty() {
            return Err(BrowserError::GroupNotFound(group));
        }
        order.retain(|t| !members.contains(t));
        let to = (to_index as usize).min(order.len());
        for (offset, tab) in members.into_iter().enumerate() {
            order.insert(to + offset, tab);
        }
        Ok(())
    }
}

// ─── Memory Storage ───────────────────────────────────────────────

/// Last-write-wins key/value store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<Value>, BrowserError> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), BrowserError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────
