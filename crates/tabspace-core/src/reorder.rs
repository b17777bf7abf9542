//! Target-order planning for a live tab strip.
//!
//! Turns the abstract per-workspace ordering into a concrete move plan:
//! pinned tabs first, then unpinned items grouped by workspace rank, with
//! tab groups moved as atomic units. The planner only *plans* — issuing the
//! moves (and surviving their individual failures) is the driver's job.
//!
//! A move is emitted only where the live position differs from the target
//! slot, so a strip already in target order yields an empty plan and
//! repeated passes converge to a fixed point instead of oscillating.

use crate::store::{stored_group, stored_tab, workspace_of_group, workspace_of_tab, workspace_rank};
use crate::types::{
    GroupId, LiveTab, TabId, WindowSnapshot, WorkspaceAssignments, WorkspaceDefinition,
    WorkspaceId, GENERAL_WORKSPACE,
};

// ─── Move Plan ────────────────────────────────────────────────────

/// One concrete move against the live tab strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOp {
    /// Move a single tab to `to_index`.
    Tab { tab: TabId, to_index: u32 },
    /// Move a whole group (all member tabs, atomically) to `to_index`.
    Group { group: GroupId, to_index: u32 },
}

/// An unpinned item occupying one or more consecutive slots.
#[derive(Debug, Clone)]
enum Unit {
    Group {
        group: GroupId,
        live_index: u32,
        size: usize,
    },
    Tab {
        tab: TabId,
        live_index: u32,
    },
}

/// Compute the move plan that realizes the stored assignment order.
///
/// Workspace resolution: a group's own assignment first, falling back to a
/// member tab's individual assignment; an ungrouped tab's own assignment;
/// else `general`. Pinned tabs sort by (workspace rank, live index);
/// unpinned items sort by (workspace rank, stored index) so a just-added
/// item lands at its assigned position, not where the browser dropped it.
pub fn plan_reorder(
    snapshot: &WindowSnapshot,
    assignments: &WorkspaceAssignments,
    definitions: &[WorkspaceDefinition],
) -> Vec<MoveOp> {
    let rank = |ws: &str| workspace_rank(definitions, ws);

    // ── Pinned tabs ─────────────────────────────────────────────
    let mut pinned: Vec<&LiveTab> = snapshot.tabs.iter().filter(|t| t.pinned).collect();
    pinned.sort_by_key(|t| (rank(&tab_workspace(assignments, t)), t.index));

    // ── Unpinned units: groups (atomic) + ungrouped tabs ────────
    let mut units: Vec<(usize, u32, u32, Unit)> = Vec::new();

    for group in &snapshot.groups {
        let members: Vec<&LiveTab> = snapshot
            .group_tabs(group.id)
            .into_iter()
            .filter(|t| !t.pinned)
            .collect();
        if members.is_empty() {
            continue;
        }
        let live_index = members.iter().map(|t| t.index).min().unwrap_or(group.index);
        let ws = group_workspace(assignments, group, &members);
        let stored_index = stored_group(assignments, group)
            .map(|g| g.index)
            .unwrap_or(live_index);
        units.push((
            rank(&ws),
            stored_index,
            live_index,
            Unit::Group {
                group: group.id,
                live_index,
                size: members.len(),
            },
        ));
    }

    for tab in &snapshot.tabs {
        if tab.pinned || tab.group_id.is_some() {
            continue;
        }
        let ws = tab_workspace(assignments, tab);
        let stored_index = stored_tab(assignments, tab)
            .map(|t| t.index)
            .unwrap_or(tab.index);
        units.push((
            rank(&ws),
            stored_index,
            tab.index,
            Unit::Tab {
                tab: tab.id,
                live_index: tab.index,
            },
        ));
    }

    units.sort_by_key(|(rank, stored, live, _)| (*rank, *stored, *live));

    // ── Sequential slot assignment ──────────────────────────────
    let mut plan = Vec::new();

    for (slot, tab) in pinned.iter().enumerate() {
        let slot = slot as u32;
        if tab.index != slot {
            plan.push(MoveOp::Tab {
                tab: tab.id,
                to_index: slot,
            });
        }
    }

    let mut cursor = pinned.len() as u32;
    for (_, _, _, unit) in units {
        match unit {
            Unit::Group {
                group,
                live_index,
                size,
            } => {
                if live_index != cursor {
                    plan.push(MoveOp::Group {
                        group,
                        to_index: cursor,
                    });
                }
                cursor += size as u32;
            }
            Unit::Tab { tab, live_index } => {
                if live_index != cursor {
                    plan.push(MoveOp::Tab {
                        tab,
                        to_index: cursor,
                    });
                }
                cursor += 1;
            }
        }
    }

    plan
}

fn tab_workspace(assignments: &WorkspaceAssignments, tab: &LiveTab) -> WorkspaceId {
    workspace_of_tab(assignments, tab).unwrap_or_else(|| GENERAL_WORKSPACE.to_string())
}

/// Group assignment wins; a member tab's own assignment is consulted only
/// when the group itself has none.
fn group_workspace(
    assignments: &WorkspaceAssignments,
    group: &crate::types::LiveGroup,
    members: &[&LiveTab],
) -> WorkspaceId {
    if let Some(ws) = workspace_of_group(assignments, group) {
        return ws;
    }
    members
        .iter()
        .find_map(|t| workspace_of_tab(assignments, t))
        .unwrap_or_else(|| GENERAL_WORKSPACE.to_string())
}

// ─── Tests ────────────────────────────────────────────────────────
