//! Applies reorder plans to the live tab strip.

use tabspace_browser::storage::{load_assignments, load_definitions};
use tabspace_browser::{BrowserError, BrowserHost, StorageBackend, snapshot_window};
use tabspace_core::reorder::{MoveOp, plan_reorder};
use tabspace_core::store::ensure_general;
use tabspace_core::types::WindowId;
use tracing::{debug, warn};

use crate::reconciler::Reconciler;

impl<H, S> Reconciler<H, S>
where
    H: BrowserHost + 'static,
    S: StorageBackend + 'static,
{
    /// Drive one window toward its stored order.
    ///
    /// Re-entrant calls for the same window are dropped, so the move
    /// events this pass causes cannot trigger a second pass over a strip
    /// that is still being rearranged. Each move is attempted
    /// independently; one closed tab never aborts the rest of the plan.
    pub(crate) fn reorder_pass(&self, window: WindowId) {
        if self.migration_blocked() {
            return;
        }
        if !self.begin_reorder(window) {
            debug!(window, "reorder already in flight");
            return;
        }
        if let Err(e) = self.reorder_window(window) {
            warn!(window, error = %e, "reorder pass failed");
        }
        self.end_reorder(window);
    }

    fn reorder_window(&self, window: WindowId) -> Result<(), BrowserError> {
        let snapshot = match snapshot_window(&self.host, window) {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_stale_reference() => return Ok(()),
            Err(e) => return Err(e),
        };
        let assignments = load_assignments(&self.storage)?
            .remove(&window)
            .unwrap_or_default();
        let mut definitions = load_definitions(&self.storage)?;
        ensure_general(&mut definitions);

        for op in plan_reorder(&snapshot, &assignments, &definitions) {
            let result = match op {
                MoveOp::Tab { tab, to_index } => self.host.move_tab(tab, to_index),
                MoveOp::Group { group, to_index } => self.host.move_group(group, to_index),
            };
            match result {
                Ok(()) => {}
                Err(e) if e.is_stale_reference() => {
                    debug!(window, ?op, "skipping move of closed item");
                }
                Err(e) => warn!(window, ?op, error = %e, "move failed"),
            }
        }
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use crate::config::ReconcilerConfig;
    use crate::reconciler::Reconciler;
    use tabspace_browser::storage::save_assignments;
    use tabspace_browser::{MemoryBrowser, MemoryStorage};
    use tabspace_core::store::assign_tab;
    use tabspace_core::types::{TabAssignment, WindowAssignments, WorkspaceAssignments};

    #[test]
    fn concurrent_pass_is_dropped_not_queued() {
        let r = Reconciler::new(
            MemoryBrowser::new(),
            MemoryStorage::new(),
            ReconcilerConfig::fast(),
        );
        let w = r.host().add_window();
        let a = r.host().add_tab(w, "https://a.com");
        let b = r.host().add_tab(w, "https://b.com");

        // Stored order wants the assigned tab `a` behind the general tab.
        let mut entry = WorkspaceAssignments::new();
        assign_tab(
            &mut entry,
            "work",
            TabAssignment {
                url: "https://a.com".into(),
                title: String::new(),
                index: 0,
                tab_id: Some(a),
            },
        );
        let mut windows = WindowAssignments::new();
        windows.insert(w, entry);
        save_assignments(r.storage(), &windows).expect("seed");

        // A pass is already in flight for this window: the request is
        // dropped outright, not queued behind it.
        assert!(r.begin_reorder(w));
        r.reorder_pass(w);
        assert_eq!(r.host().tab_order(w), vec![a, b]);

        // Once the flag clears, the same request moves the strip.
        r.end_reorder(w);
        r.reorder_pass(w);
        assert_eq!(r.host().tab_order(w), vec![b, a]);
    }
}
