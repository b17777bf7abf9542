//! Debounced synchronization of stored assignments with live window
//! content.
//!
//! Sync never invents assignments; it only refreshes records that still
//! have a live counterpart and drops those that do not. A window that is
//! mid-restore (mostly placeholder URLs) is left alone entirely, since
//! dropping records against a half-loaded strip would destroy exactly
//! the state migration needs.

use std::collections::{BTreeSet, HashSet};

use tabspace_browser::storage::{load_assignments, save_assignments};
use tabspace_browser::{BrowserError, BrowserHost, StorageBackend, snapshot_window};
use tabspace_core::types::{GroupId, LiveGroup, WindowId, WindowSnapshot, WorkspaceAssignments};
use tabspace_core::url::{is_placeholder_url, normalize_url};
use tracing::debug;

use crate::reconciler::Reconciler;

impl<H, S> Reconciler<H, S>
where
    H: BrowserHost + 'static,
    S: StorageBackend + 'static,
{
    /// Reconcile one window's stored assignments with what the browser
    /// actually shows, then bring the strip into target order.
    pub(crate) fn sync_pass(&self, window: WindowId) -> Result<(), BrowserError> {
        if self.migration_blocked() {
            debug!(window, "sync skipped: migration in progress");
            return Ok(());
        }
        let snapshot = match snapshot_window(&self.host, window) {
            Ok(snapshot) => snapshot,
            // Window closed; its assignments stay put for migration.
            Err(e) if e.is_stale_reference() => return Ok(()),
            Err(e) => return Err(e),
        };
        if self.mid_restore(&snapshot) {
            debug!(window, "sync skipped: window still restoring");
            return Ok(());
        }

        let mut windows = load_assignments(&self.storage)?;
        if let Some(entry) = windows.get_mut(&window) {
            refresh_assignments(entry, &snapshot);
            windows.retain(|_, a| !a.is_empty());
            save_assignments(&self.storage, &windows)?;
        }
        self.schedule_reorder(window);
        Ok(())
    }

    /// A freshly restored window shows mostly placeholder URLs until its
    /// tabs navigate; matching or pruning against it would misfire.
    pub(crate) fn mid_restore(&self, snapshot: &WindowSnapshot) -> bool {
        if snapshot.tabs.len() <= self.config.restore_min_tabs {
            return false;
        }
        let placeholders = snapshot
            .tabs
            .iter()
            .filter(|t| is_placeholder_url(&t.url))
            .count();
        placeholders as f64 / snapshot.tabs.len() as f64 > self.config.restore_placeholder_ratio
    }
}

/// Refresh one window's stored records from a live snapshot.
///
/// Groups re-identify by member URL set first, so a retitled or recolored
/// group keeps its assignment; the (title, color) signature is the
/// fallback. Tabs re-identify by live id, then normalized URL. Records
/// with no live counterpart are dropped.
pub(crate) fn refresh_assignments(
    assignments: &mut WorkspaceAssignments,
    snapshot: &WindowSnapshot,
) {
    let live_groups: Vec<(&LiveGroup, BTreeSet<String>, Vec<String>)> = snapshot
        .groups
        .iter()
        .map(|group| {
            let urls: Vec<String> = snapshot
                .group_tabs(group.id)
                .iter()
                .map(|t| t.url.clone())
                .collect();
            let set = url_set(&urls);
            (group, set, urls)
        })
        .collect();

    let mut used: HashSet<GroupId> = HashSet::new();
    for entry in assignments.values_mut() {
        entry.groups.retain_mut(|stored| {
            let stored_set = url_set(&stored.tab_urls);
            let found = live_groups
                .iter()
                .find(|(g, set, _)| {
                    !used.contains(&g.id) && !stored_set.is_empty() && *set == stored_set
                })
                .or_else(|| {
                    live_groups.iter().find(|(g, ..)| {
                        !used.contains(&g.id) && g.signature() == stored.signature()
                    })
                });
            let Some((live, _, urls)) = found else {
                return false;
            };
            used.insert(live.id);
            stored.title = live.title.clone();
            stored.color = live.color;
            stored.index = live.index;
            stored.tab_urls = urls.clone();
            true
        });

        entry.tabs.retain_mut(|stored| {
            let found = stored
                .tab_id
                .and_then(|id| snapshot.tabs.iter().find(|t| t.id == id))
                .or_else(|| {
                    let url = normalize_url(&stored.url);
                    snapshot.tabs.iter().find(|t| normalize_url(&t.url) == url)
                });
            let Some(live) = found else { return false };
            stored.url = live.url.clone();
            stored.title = live.title.clone();
            stored.index = live.index;
            stored.tab_id = Some(live.id);
            true
        });
    }
    assignments.retain(|_, entry| !entry.is_empty());
}

fn url_set(urls: &[String]) -> BTreeSet<String> {
    urls.iter()
        .filter(|u| !is_placeholder_url(u))
        .map(|u| normalize_url(u))
        .collect()
}

// ─── Tests ────────────────────────────────────────────────────────
