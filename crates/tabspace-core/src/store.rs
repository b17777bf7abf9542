//! Pure mutations over the persisted assignment model.
//!
//! Every mutation goes through these helpers so the single-membership
//! invariant holds by construction: an item is removed from every workspace
//! entry before it is inserted anywhere (removal-before-insertion), and the
//! `general` workspace never appears as a map key — assigning to general is
//! expressed purely as removal.

use crate::types::{
    ActiveWorkspaceMap, GroupAssignment, LiveGroup, LiveTab, TabAssignment, TabId,
    WindowAssignments, WorkspaceAssignments, WorkspaceDefinition, WorkspaceId,
    GENERAL_WORKSPACE,
};
use crate::url::normalize_url;

// ─── Tab Assignment ───────────────────────────────────────────────

/// Assign a tab to `workspace` within one window's assignments.
///
/// Assigning to `general` only removes the tab from wherever it was.
pub fn assign_tab(assignments: &mut WorkspaceAssignments, workspace: &str, tab: TabAssignment) {
    remove_tab_everywhere(assignments, tab.tab_id, &tab.url);
    if workspace != GENERAL_WORKSPACE {
        assignments
            .entry(workspace.to_string())
            .or_default()
            .tabs
            .push(tab);
    }
    prune_empty(assignments);
}

/// Remove a tab (matched by live id, else normalized URL) from every
/// workspace entry.
pub fn remove_tab_everywhere(
    assignments: &mut WorkspaceAssignments,
    tab_id: Option<TabId>,
    url: &str,
) {
    let url = normalize_url(url);
    for entry in assignments.values_mut() {
        entry.tabs.retain(|t| {
            let id_match = tab_id.is_some() && t.tab_id == tab_id;
            let url_match = normalize_url(&t.url) == url;
            !(id_match || url_match)
        });
    }
}

// ─── Group Assignment ─────────────────────────────────────────────

/// Assign a group to `workspace` within one window's assignments.
///
/// Group identity is the (title, color) signature; any existing entry with
/// the same signature is removed first.
pub fn assign_group(
    assignments: &mut WorkspaceAssignments,
    workspace: &str,
    group: GroupAssignment,
) {
    remove_group_everywhere(assignments, &group.signature());
    if workspace != GENERAL_WORKSPACE {
        assignments
            .entry(workspace.to_string())
            .or_default()
            .groups
            .push(group);
    }
    prune_empty(assignments);
}

/// Remove a group (matched by signature) from every workspace entry.
pub fn remove_group_everywhere(assignments: &mut WorkspaceAssignments, signature: &str) {
    for entry in assignments.values_mut() {
        entry.groups.retain(|g| g.signature() != signature);
    }
}

/// Drop workspace entries that hold neither groups nor tabs.
pub fn prune_empty(assignments: &mut WorkspaceAssignments) {
    assignments.retain(|_, entry| !entry.is_empty());
}

// ─── Lookup ───────────────────────────────────────────────────────

/// Workspace a live tab is individually assigned to, if any.
/// Resolution is by live id first, then normalized URL.
pub fn workspace_of_tab(assignments: &WorkspaceAssignments, tab: &LiveTab) -> Option<WorkspaceId> {
    for (ws, entry) in assignments {
        if entry.tabs.iter().any(|t| t.tab_id == Some(tab.id)) {
            return Some(ws.clone());
        }
    }
    let url = normalize_url(&tab.url);
    for (ws, entry) in assignments {
        if entry.tabs.iter().any(|t| normalize_url(&t.url) == url) {
            return Some(ws.clone());
        }
    }
    None
}

/// Workspace a live group is assigned to, by signature.
pub fn workspace_of_group(
    assignments: &WorkspaceAssignments,
    group: &LiveGroup,
) -> Option<WorkspaceId> {
    let signature = group.signature();
    for (ws, entry) in assignments {
        if entry.groups.iter().any(|g| g.signature() == signature) {
            return Some(ws.clone());
        }
    }
    None
}

/// Stored assignment record for a live group, if any.
pub fn stored_group<'a>(
    assignments: &'a WorkspaceAssignments,
    group: &LiveGroup,
) -> Option<&'a GroupAssignment> {
    let signature = group.signature();
    assignments
        .values()
        .flat_map(|entry| entry.groups.iter())
        .find(|g| g.signature() == signature)
}

/// Stored assignment record for a live tab, if any.
pub fn stored_tab<'a>(
    assignments: &'a WorkspaceAssignments,
    tab: &LiveTab,
) -> Option<&'a TabAssignment> {
    if let Some(t) = assignments
        .values()
        .flat_map(|entry| entry.tabs.iter())
        .find(|t| t.tab_id == Some(tab.id))
    {
        return Some(t);
    }
    let url = normalize_url(&tab.url);
    assignments
        .values()
        .flat_map(|entry| entry.tabs.iter())
        .find(|t| normalize_url(&t.url) == url)
}

// ─── Merge ────────────────────────────────────────────────────────

/// Deep-merge `incoming` (a migrated orphan) into `target` (the live
/// window's current assignments).
///
/// The target wins identity conflicts: a group signature or tab identity
/// already present anywhere in the target suppresses the incoming copy,
/// so the merge never gives one item a second workspace. Disjoint
/// workspaces and items from both sides are kept.
pub fn deep_merge(target: &mut WorkspaceAssignments, incoming: WorkspaceAssignments) {
    for (ws, entry) in incoming {
        for group in entry.groups {
            let signature = group.signature();
            let taken = target
                .values()
                .flat_map(|e| e.groups.iter())
                .any(|g| g.signature() == signature);
            if !taken {
                target.entry(ws.clone()).or_default().groups.push(group);
            }
        }
        for tab in entry.tabs {
            let url = normalize_url(&tab.url);
            let taken = target.values().flat_map(|e| e.tabs.iter()).any(|t| {
                (tab.tab_id.is_some() && t.tab_id == tab.tab_id)
                    || normalize_url(&t.url) == url
            });
            if !taken {
                target.entry(ws.clone()).or_default().tabs.push(tab);
            }
        }
    }
    prune_empty(target);
}

// ─── Workspace Definitions ────────────────────────────────────────

/// Rank of a workspace in the user-ordered definitions list.
/// Unknown ids rank after every known one.
pub fn workspace_rank(definitions: &[WorkspaceDefinition], id: &str) -> usize {
    definitions
        .iter()
        .position(|d| d.id == id)
        .unwrap_or(definitions.len())
}

/// Make sure the built-in `general` definition exists (first run).
pub fn ensure_general(definitions: &mut Vec<WorkspaceDefinition>) {
    if !definitions.iter().any(|d| d.id == GENERAL_WORKSPACE) {
        definitions.insert(0, WorkspaceDefinition::general());
    }
}

/// Delete a workspace definition and cascade: its entries disappear from
/// every window and active-workspace pointers fall back to `general`.
/// The `general` definition itself cannot be deleted.
pub fn delete_workspace(
    definitions: &mut Vec<WorkspaceDefinition>,
    windows: &mut WindowAssignments,
    active: &mut ActiveWorkspaceMap,
    id: &str,
) {
    if id == GENERAL_WORKSPACE {
        return;
    }
    definitions.retain(|d| d.id != id);
    for assignments in windows.values_mut() {
        assignments.remove(id);
    }
    windows.retain(|_, assignments| !assignments.is_empty());
    for ws in active.values_mut() {
        if ws == id {
            *ws = GENERAL_WORKSPACE.to_string();
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────
