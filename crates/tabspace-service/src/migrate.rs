//! Startup migration: re-attach orphaned per-window assignments to the
//! windows a restarted browser re-created under fresh ids.
//!
//! Window ids do not survive a browser restart, so after startup the
//! stored map keys point at windows that no longer exist. Migration
//! fingerprints both sides and moves each orphaned entry onto the live
//! window whose content it covers, polling while session restore is
//! still settling. Anything that cannot be matched confidently is left
//! in place under its stale key: inert, never guessed.

use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tabspace_browser::storage::{load_active, load_assignments, save_active, save_assignments};
use tabspace_browser::{BrowserError, BrowserHost, StorageBackend, snapshot_window};
use tabspace_core::fingerprint::WindowFingerprint;
use tabspace_core::matcher::{OrphanKind, Similarity, clears_gate, similarity};
use tabspace_core::matching::greedy_match;
use tabspace_core::store::deep_merge;
use tabspace_core::types::{WindowId, assignments_empty};
use tracing::{debug, info, warn};

use crate::reconciler::Reconciler;

enum Round {
    Settled,
    Retry,
}

impl<H, S> Reconciler<H, S>
where
    H: BrowserHost + 'static,
    S: StorageBackend + 'static,
{
    /// Run the startup migration to completion. Sync and reorder writes
    /// are blocked for the duration; on return (match, timeout, or
    /// nothing to do) they are unblocked and every live window gets a
    /// sync scheduled.
    pub async fn run_migration(&self) -> Result<(), BrowserError> {
        if self.migration_completed.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.migration_active.store(true, Ordering::SeqCst);
        let outcome = self.migration_loop().await;
        self.migration_active.store(false, Ordering::SeqCst);
        self.migration_completed.store(true, Ordering::SeqCst);

        if let Ok(windows) = self.host.list_windows() {
            for window in &windows {
                self.schedule_sync(window.id);
            }
        }
        outcome
    }

    async fn migration_loop(&self) -> Result<(), BrowserError> {
        let started = tokio::time::Instant::now();
        let deadline = started + Duration::from_millis(self.config.migration_timeout_ms);
        loop {
            if let Round::Settled = self.migration_round(started.elapsed(), false)? {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                // Out of time: match what we can without further waiting.
                self.migration_round(started.elapsed(), true)?;
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(self.config.migration_poll_interval_ms))
                .await;
        }
    }

    fn migration_round(&self, elapsed: Duration, last_chance: bool) -> Result<Round, BrowserError> {
        let mut windows = load_assignments(&self.storage)?;
        let mut active = load_active(&self.storage)?;

        let live_ids: BTreeSet<WindowId> = self
            .host
            .list_windows()?
            .iter()
            .map(|w| w.id)
            .collect();

        // Entries for closed windows with no remaining content are noise.
        let before = windows.len();
        windows.retain(|id, a| live_ids.contains(id) || !assignments_empty(a));
        let dropped_empty = windows.len() != before;

        let orphan_ids: Vec<WindowId> = windows
            .keys()
            .filter(|id| !live_ids.contains(*id))
            .copied()
            .collect();
        if orphan_ids.is_empty() {
            if dropped_empty {
                save_assignments(&self.storage, &windows)?;
            }
            return Ok(Round::Settled);
        }

        // Candidate targets: live windows carrying no assignments yet.
        let candidates: Vec<WindowId> = live_ids
            .iter()
            .filter(|id| windows.get(*id).is_none_or(assignments_empty))
            .copied()
            .collect();

        // Stored state spans more windows than are open. The user may
        // still be reopening windows, so hold off until the grace period
        // runs out.
        let grace = Duration::from_millis(self.config.multi_window_grace_ms);
        if !last_chance && orphan_ids.len() > candidates.len() && elapsed < grace {
            debug!(
                orphans = orphan_ids.len(),
                candidates = candidates.len(),
                "waiting for more windows before matching"
            );
            return Ok(Round::Retry);
        }

        let mut snapshots = Vec::new();
        for id in &candidates {
            match snapshot_window(&self.host, *id) {
                Ok(snapshot) => {
                    // Placeholder-heavy fingerprints under-score badly;
                    // wait for restore navigation to settle.
                    if !last_chance && self.mid_restore(&snapshot) {
                        debug!(window = id, "candidate still restoring");
                        return Ok(Round::Retry);
                    }
                    snapshots.push(snapshot);
                }
                Err(e) if e.is_stale_reference() => {}
                Err(e) => return Err(e),
            }
        }

        let orphans: Vec<(WindowId, WindowFingerprint, OrphanKind)> = orphan_ids
            .iter()
            .map(|id| {
                let fp = WindowFingerprint::from_assignments(&windows[id]);
                let kind = OrphanKind::of(&fp);
                (*id, fp, kind)
            })
            .collect();
        let currents: Vec<WindowFingerprint> = snapshots
            .iter()
            .map(WindowFingerprint::from_snapshot)
            .collect();

        let t = &self.config.thresholds;
        let matrix: Vec<Vec<Option<Similarity>>> = orphans
            .iter()
            .map(|(_, fp, kind)| {
                currents
                    .iter()
                    .map(|current| {
                        let sim = similarity(fp, current, t);
                        clears_gate(*kind, &sim, t).then_some(sim)
                    })
                    .collect()
            })
            .collect();

        let matches = greedy_match(&matrix, t.margin);
        for m in &matches {
            let orphan_id = orphans[m.orphan].0;
            let target_id = snapshots[m.window].window_id;
            let Some(incoming) = windows.remove(&orphan_id) else {
                continue;
            };
            deep_merge(windows.entry(target_id).or_default(), incoming);
            if let Some(ws) = active.remove(&orphan_id) {
                active.entry(target_id).or_insert(ws);
            }
            info!(
                orphan = orphan_id,
                window = target_id,
                score = m.sim.score,
                group_similarity = m.sim.group_similarity,
                url_similarity = m.sim.url_similarity,
                "migrated window assignments"
            );
        }
        if !matches.is_empty() || dropped_empty {
            save_assignments(&self.storage, &windows)?;
            save_active(&self.storage, &active)?;
        }

        if matches.len() == orphan_ids.len() {
            return Ok(Round::Settled);
        }
        if last_chance {
            for (id, ..) in &orphans {
                if windows.contains_key(id) {
                    warn!(window = id, "assignments left unmatched; preserved as-is");
                }
            }
            return Ok(Round::Settled);
        }
        Ok(Round::Retry)
    }
}
