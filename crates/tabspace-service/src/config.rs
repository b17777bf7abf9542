use serde::{Deserialize, Serialize};
use tabspace_core::matcher::MatchThresholds;

// ─── Reconciler Configuration ───

/// Timing and heuristic knobs for the reconciliation service.
///
/// All durations are in milliseconds. Defaults match observed browser
/// session-restore pacing; tests override them to keep paused-clock
/// runs short.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Quiet period after the last event in a window before a sync pass runs.
    pub sync_debounce_ms: u64,
    /// Quiet period before a scheduled reorder pass runs.
    pub reorder_debounce_ms: u64,
    /// Interval between migration rounds while restore is still settling.
    pub migration_poll_interval_ms: u64,
    /// Hard ceiling on the migration phase as a whole.
    pub migration_timeout_ms: u64,
    /// Extra time granted for additional windows to appear when stored
    /// state spans more windows than are currently open.
    pub multi_window_grace_ms: u64,
    /// Delay before a newly created group inherits its members' workspace.
    pub group_autoassign_delay_ms: u64,
    /// Placeholder-URL fraction above which a window counts as mid-restore.
    pub restore_placeholder_ratio: f64,
    /// Minimum tab count for the mid-restore heuristic to apply at all.
    pub restore_min_tabs: usize,
    /// Fuzzy matcher weights and acceptance gates.
    pub thresholds: MatchThresholds,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            sync_debounce_ms: 1_000,
            reorder_debounce_ms: 500,
            migration_poll_interval_ms: 1_000,
            migration_timeout_ms: 10_000,
            multi_window_grace_ms: 4_000,
            group_autoassign_delay_ms: 500,
            restore_placeholder_ratio: 0.3,
            restore_min_tabs: 3,
            thresholds: MatchThresholds::default(),
        }
    }
}

impl ReconcilerConfig {
    /// Config with all timers collapsed to near-zero, for tests that
    /// drive the service under a paused tokio clock.
    pub fn fast() -> Self {
        Self {
            sync_debounce_ms: 10,
            reorder_debounce_ms: 5,
            migration_poll_interval_ms: 10,
            migration_timeout_ms: 100,
            multi_window_grace_ms: 40,
            group_autoassign_delay_ms: 5,
            ..Self::default()
        }
    }
}

// ─── Tests ───
