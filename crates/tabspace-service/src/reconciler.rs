//! The reconciliation service: event intake, scheduling, and the
//! explicit workspace command surface.
//!
//! `Reconciler` is generic over the browser host and the storage backend
//! so every pass can run against in-memory fakes in tests. It is built
//! with `Arc::new_cyclic` and keeps a `Weak` handle to itself, which lets
//! plain `&self` methods hand owned clones to the tasks they spawn.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tabspace_browser::storage::{
    load_active, load_assignments, load_definitions, save_active, save_assignments,
    save_definitions,
};
use tabspace_browser::{BrowserError, BrowserEvent, BrowserHost, StorageBackend};
use tabspace_core::store::{
    assign_group, assign_tab, delete_workspace, ensure_general, prune_empty,
    remove_tab_everywhere, workspace_of_group, workspace_of_tab,
};
use tabspace_core::types::{
    ActiveWorkspaceMap, GENERAL_WORKSPACE, GroupAssignment, GroupId, TabAssignment, TabId,
    WindowId, WorkspaceAssignments, WorkspaceDefinition, WorkspaceId,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ReconcilerConfig;
use crate::debounce::Debouncer;
use crate::queue::SerialQueue;

// ─── Errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("unknown workspace `{0}`")]
    UnknownWorkspace(WorkspaceId),
}

// ─── Reconciler ───────────────────────────────────────────────────

/// Coordinates migration, sync, and reorder passes over one browser
/// session.
pub struct Reconciler<H, S> {
    pub(crate) host: H,
    pub(crate) storage: S,
    pub(crate) config: ReconcilerConfig,
    weak: Weak<Self>,
    /// Set while startup migration runs; blocks sync and reorder writes.
    pub(crate) migration_active: AtomicBool,
    pub(crate) migration_completed: AtomicBool,
    sync_debounce: Debouncer<WindowId>,
    reorder_debounce: Debouncer<WindowId>,
    /// Windows with a reorder pass in flight; move events for them are
    /// echoes of this engine's own moves.
    reordering: Mutex<HashSet<WindowId>>,
    commands: SerialQueue<WindowId>,
}

impl<H, S> Reconciler<H, S>
where
    H: BrowserHost + 'static,
    S: StorageBackend + 'static,
{
    pub fn new(host: H, storage: S, config: ReconcilerConfig) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            host,
            storage,
            config,
            weak: weak.clone(),
            migration_active: AtomicBool::new(false),
            migration_completed: AtomicBool::new(false),
            sync_debounce: Debouncer::new(),
            reorder_debounce: Debouncer::new(),
            reordering: Mutex::new(HashSet::new()),
            commands: SerialQueue::new(),
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn strong(&self) -> Option<Arc<Self>> {
        self.weak.upgrade()
    }

    pub(crate) fn migration_blocked(&self) -> bool {
        self.migration_active.load(Ordering::SeqCst)
    }

    // ── Event intake ────────────────────────────────────────────

    /// Dispatch one browser event. Every variant resolves to "schedule a
    /// sync for the affected window"; group creation additionally arms
    /// the auto-assignment grace timer, and tab attachment carries the
    /// tab's assignment over to its new window.
    pub fn handle_event(&self, event: BrowserEvent) {
        match event {
            BrowserEvent::TabMoved { window, .. } | BrowserEvent::GroupMoved { window, .. }
                if self.is_reordering(window) =>
            {
                // Echo of a move this engine issued itself.
            }
            BrowserEvent::GroupCreated { window, group } => {
                self.schedule_sync(window);
                self.schedule_group_autoassign(window, group);
            }
            BrowserEvent::TabAttached { window, tab } => {
                self.schedule_tab_transfer(tab, window);
                self.schedule_sync(window);
            }
            other => self.schedule_sync(other.window()),
        }
    }

    // ── Scheduling ──────────────────────────────────────────────

    pub fn schedule_sync(&self, window: WindowId) {
        let Some(this) = self.strong() else { return };
        let delay = Duration::from_millis(self.config.sync_debounce_ms);
        self.sync_debounce.schedule(window, delay, async move {
            if let Err(e) = this.sync_pass(window) {
                warn!(window, error = %e, "sync pass failed");
            }
        });
    }

    pub fn schedule_reorder(&self, window: WindowId) {
        let Some(this) = self.strong() else { return };
        let delay = Duration::from_millis(self.config.reorder_debounce_ms);
        self.reorder_debounce.schedule(window, delay, async move {
            this.reorder_pass(window);
        });
    }

    fn schedule_group_autoassign(&self, window: WindowId, group: GroupId) {
        let Some(this) = self.strong() else { return };
        let delay = Duration::from_millis(self.config.group_autoassign_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.commands
                .run(&window, async {
                    if let Err(e) = this.auto_assign_group(window, group) {
                        warn!(window, group, error = %e, "group auto-assign failed");
                    }
                })
                .await;
        });
    }

    fn schedule_tab_transfer(&self, tab: TabId, destination: WindowId) {
        let Some(this) = self.strong() else { return };
        tokio::spawn(async move {
            this.commands
                .run(&destination, async {
                    if let Err(e) = this.transfer_tab_assignment(tab, destination) {
                        warn!(tab, destination, error = %e, "tab transfer failed");
                    }
                })
                .await;
        });
    }

    // ── Reorder guard ───────────────────────────────────────────

    fn reordering(&self) -> MutexGuard<'_, HashSet<WindowId>> {
        self.reordering
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_reordering(&self, window: WindowId) -> bool {
        self.reordering().contains(&window)
    }

    pub(crate) fn begin_reorder(&self, window: WindowId) -> bool {
        self.reordering().insert(window)
    }

    pub(crate) fn end_reorder(&self, window: WindowId) {
        self.reordering().remove(&window);
    }

    // ── Deferred mutations ──────────────────────────────────────

    /// After the grace delay, a new group without an assignment of its
    /// own inherits the workspace its member tabs were individually
    /// assigned to, or failing that the window's active workspace. The
    /// members' individual records fold into the group.
    fn auto_assign_group(&self, window: WindowId, group: GroupId) -> Result<(), BrowserError> {
        if self.migration_blocked() {
            return Ok(());
        }
        let live = match self.host.get_group(group) {
            Ok(g) => g,
            Err(e) if e.is_stale_reference() => return Ok(()),
            Err(e) => return Err(e),
        };
        let mut windows = load_assignments(&self.storage)?;
        let entry = windows.entry(window).or_default();
        if workspace_of_group(entry, &live).is_some() {
            windows.retain(|_, a| !a.is_empty());
            return Ok(());
        }
        let tabs = self.host.list_tabs(window)?;
        let members: Vec<_> = tabs.iter().filter(|t| t.group_id == Some(group)).collect();
        let inherited = members
            .iter()
            .find_map(|t| workspace_of_tab(entry, t))
            .or_else(|| {
                load_active(&self.storage)
                    .ok()
                    .and_then(|active| active.get(&window).cloned())
            });
        let Some(ws) = inherited else {
            windows.retain(|_, a| !a.is_empty());
            return Ok(());
        };
        assign_group(
            entry,
            &ws,
            GroupAssignment {
                title: live.title.clone(),
                color: live.color,
                index: live.index,
                tab_urls: members.iter().map(|t| t.url.clone()).collect(),
            },
        );
        for tab in &members {
            remove_tab_everywhere(entry, Some(tab.id), &tab.url);
        }
        prune_empty(entry);
        windows.retain(|_, a| !a.is_empty());
        save_assignments(&self.storage, &windows)?;
        debug!(window, group, workspace = %ws, "new group inherited member workspace");
        self.schedule_reorder(window);
        Ok(())
    }

    /// Move a tab's stored assignment to the window it was attached to,
    /// keeping its workspace across the cross-window drag.
    fn transfer_tab_assignment(
        &self,
        tab: TabId,
        destination: WindowId,
    ) -> Result<(), BrowserError> {
        let mut windows = load_assignments(&self.storage)?;
        let mut carried: Option<(WorkspaceId, TabAssignment)> = None;
        'search: for (win, assignments) in windows.iter_mut() {
            if *win == destination {
                continue;
            }
            for (ws, entry) in assignments.iter_mut() {
                if let Some(pos) = entry.tabs.iter().position(|t| t.tab_id == Some(tab)) {
                    carried = Some((ws.clone(), entry.tabs.remove(pos)));
                    break 'search;
                }
            }
        }
        let Some((ws, record)) = carried else {
            return Ok(());
        };
        for assignments in windows.values_mut() {
            prune_empty(assignments);
        }
        windows.retain(|_, a| !a.is_empty());
        let entry = windows.entry(destination).or_default();
        assign_tab(entry, &ws, record);
        windows.retain(|_, a| !a.is_empty());
        save_assignments(&self.storage, &windows)?;
        debug!(tab, destination, workspace = %ws, "carried assignment across windows");
        Ok(())
    }

    // ── Workspace commands ──────────────────────────────────────

    fn validate_workspace(&self, id: &str) -> Result<(), ServiceError> {
        if id == GENERAL_WORKSPACE {
            return Ok(());
        }
        let definitions = load_definitions(&self.storage).map_err(ServiceError::Browser)?;
        if definitions.iter().any(|d| d.id == id) {
            Ok(())
        } else {
            Err(ServiceError::UnknownWorkspace(id.to_string()))
        }
    }

    /// Assign a tab to a workspace, refresh the window's records against
    /// live state, and bring it into target order. Serialized per window
    /// so rapid commands cannot interleave their read-modify-write
    /// cycles.
    pub async fn move_tab_to_workspace(
        &self,
        tab: TabId,
        workspace: &str,
    ) -> Result<(), ServiceError> {
        self.validate_workspace(workspace)?;
        let live = self.host.get_tab(tab)?;
        let window = live.window_id;
        self.commands
            .run(&window, async {
                let mut windows = load_assignments(&self.storage)?;
                let entry = windows.entry(window).or_default();
                assign_tab(
                    entry,
                    workspace,
                    TabAssignment {
                        url: live.url.clone(),
                        title: live.title.clone(),
                        index: live.index,
                        tab_id: Some(live.id),
                    },
                );
                windows.retain(|_, a| !a.is_empty());
                save_assignments(&self.storage, &windows)?;
                Ok::<_, BrowserError>(())
            })
            .await?;
        self.sync_pass(window)?;
        self.reorder_pass(window);
        Ok(())
    }

    /// Assign a whole group to a workspace. Member tabs lose any
    /// individual assignment; the group record represents them. Like the
    /// tab command, the write is followed by an immediate sync and
    /// reorder of the window.
    pub async fn move_group_to_workspace(
        &self,
        group: GroupId,
        workspace: &str,
    ) -> Result<(), ServiceError> {
        self.validate_workspace(workspace)?;
        let live = self.host.get_group(group)?;
        let window = live.window_id;
        let members: Vec<_> = self
            .host
            .list_tabs(window)?
            .into_iter()
            .filter(|t| t.group_id == Some(group))
            .collect();
        self.commands
            .run(&window, async {
                let mut windows = load_assignments(&self.storage)?;
                let entry = windows.entry(window).or_default();
                assign_group(
                    entry,
                    workspace,
                    GroupAssignment {
                        title: live.title.clone(),
                        color: live.color,
                        index: live.index,
                        tab_urls: members.iter().map(|t| t.url.clone()).collect(),
                    },
                );
                for tab in &members {
                    remove_tab_everywhere(entry, Some(tab.id), &tab.url);
                }
                prune_empty(entry);
                windows.retain(|_, a| !a.is_empty());
                save_assignments(&self.storage, &windows)?;
                Ok::<_, BrowserError>(())
            })
            .await?;
        self.sync_pass(window)?;
        self.reorder_pass(window);
        Ok(())
    }

    // ── Workspace definitions and active pointers ───────────────

    pub fn workspaces(&self) -> Result<Vec<WorkspaceDefinition>, BrowserError> {
        let mut definitions = load_definitions(&self.storage)?;
        ensure_general(&mut definitions);
        Ok(definitions)
    }

    /// Create a workspace, or refresh the name/icon of an existing one.
    pub fn create_workspace(&self, definition: WorkspaceDefinition) -> Result<(), BrowserError> {
        let mut definitions = load_definitions(&self.storage)?;
        ensure_general(&mut definitions);
        if let Some(existing) = definitions.iter_mut().find(|d| d.id == definition.id) {
            existing.name = definition.name;
            existing.icon = definition.icon;
        } else {
            definitions.push(definition);
        }
        save_definitions(&self.storage, &definitions)
    }

    /// Delete a workspace. Its assignments disappear from every window
    /// and active pointers fall back to `general`; `general` itself is
    /// protected.
    pub fn remove_workspace(&self, id: &str) -> Result<(), BrowserError> {
        let mut definitions = load_definitions(&self.storage)?;
        ensure_general(&mut definitions);
        let mut windows = load_assignments(&self.storage)?;
        let mut active = load_active(&self.storage)?;
        delete_workspace(&mut definitions, &mut windows, &mut active, id);
        save_definitions(&self.storage, &definitions)?;
        save_assignments(&self.storage, &windows)?;
        save_active(&self.storage, &active)
    }

    pub fn active_workspaces(&self) -> Result<ActiveWorkspaceMap, BrowserError> {
        load_active(&self.storage)
    }

    pub fn active_workspace(&self, window: WindowId) -> Result<WorkspaceId, BrowserError> {
        Ok(load_active(&self.storage)?
            .get(&window)
            .cloned()
            .unwrap_or_else(|| GENERAL_WORKSPACE.to_string()))
    }

    pub fn set_active_workspace(
        &self,
        window: WindowId,
        workspace: &str,
    ) -> Result<(), ServiceError> {
        self.validate_workspace(workspace)?;
        let mut active = load_active(&self.storage)?;
        if workspace == GENERAL_WORKSPACE {
            active.remove(&window);
        } else {
            active.insert(window, workspace.to_string());
        }
        save_active(&self.storage, &active)?;
        self.schedule_sync(window);
        Ok(())
    }

    pub fn assignments_for_window(
        &self,
        window: WindowId,
    ) -> Result<WorkspaceAssignments, BrowserError> {
        Ok(load_assignments(&self.storage)?
            .remove(&window)
            .unwrap_or_default())
    }
}

// ─── Tests ────────────────────────────────────────────────────────
