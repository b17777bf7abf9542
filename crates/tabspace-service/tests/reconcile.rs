//! End-to-end reconciliation scenarios against the in-memory browser.

use std::sync::Arc;
use std::time::Duration;

use tabspace_browser::storage::{load_active, load_assignments, save_active, save_assignments};
use tabspace_browser::{BrowserEvent, MemoryBrowser, MemoryStorage};
use tabspace_core::store::{assign_group, assign_tab};
use tabspace_core::types::{
    ActiveWorkspaceMap, GroupAssignment, GroupColor, TabAssignment, WindowAssignments,
    WorkspaceAssignments, WorkspaceDefinition,
};
use tabspace_service::{Reconciler, ReconcilerConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn reconciler() -> Arc<Reconciler<MemoryBrowser, MemoryStorage>> {
    init_tracing();
    Reconciler::new(
        MemoryBrowser::new(),
        MemoryStorage::new(),
        ReconcilerConfig::fast(),
    )
}

fn tab_record(url: &str) -> TabAssignment {
    TabAssignment {
        url: url.into(),
        title: String::new(),
        index: 0,
        tab_id: None,
    }
}

// ─── Migration ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn migration_reattaches_after_restart() {
    init_tracing();
    let storage = MemoryStorage::new();
    let mut stored = WindowAssignments::new();
    let mut entry = WorkspaceAssignments::new();
    assign_group(
        &mut entry,
        "work",
        GroupAssignment {
            title: "Work".into(),
            color: GroupColor::Blue,
            index: 0,
            tab_urls: vec![
                "https://mail.example.com".into(),
                "https://docs.example.com".into(),
            ],
        },
    );
    stored.insert(100, entry);
    save_assignments(&storage, &stored).expect("seed");
    let mut active = ActiveWorkspaceMap::new();
    active.insert(100, "work".into());
    save_active(&storage, &active).expect("seed");

    // The restarted browser re-created the window under a fresh id.
    let browser = MemoryBrowser::new();
    let w = browser.add_window();
    let a = browser.add_tab(w, "https://mail.example.com");
    let b = browser.add_tab(w, "https://docs.example.com");
    let group = browser.add_group(w, "Work", GroupColor::Blue);
    browser.group_tabs(group, &[a, b]);

    let r = Reconciler::new(browser, storage, ReconcilerConfig::fast());
    r.run_migration().await.expect("migration");

    let windows = load_assignments(r.storage()).expect("load");
    assert!(!windows.contains_key(&100), "stale key must be gone");
    let entry = windows.get(&w).expect("migrated entry");
    assert_eq!(entry.get("work").map(|e| e.groups.len()), Some(1));

    let active = load_active(r.storage()).expect("load");
    assert_eq!(active.get(&w).map(String::as_str), Some("work"));
}

#[tokio::test(start_paused = true)]
async fn migration_withholds_contested_window() {
    init_tracing();
    let storage = MemoryStorage::new();
    let mut stored = WindowAssignments::new();
    for id in [100u64, 200] {
        let mut entry = WorkspaceAssignments::new();
        assign_tab(&mut entry, "work", tab_record("https://a.com"));
        assign_tab(&mut entry, "work", tab_record("https://b.com"));
        stored.insert(id, entry);
    }
    save_assignments(&storage, &stored).expect("seed");

    let browser = MemoryBrowser::new();
    let w = browser.add_window();
    browser.add_tab(w, "https://a.com");
    browser.add_tab(w, "https://b.com");

    let r = Reconciler::new(browser, storage, ReconcilerConfig::fast());
    r.run_migration().await.expect("migration");

    // Two equally plausible orphans for one window: migrate neither.
    let windows = load_assignments(r.storage()).expect("load");
    assert!(windows.contains_key(&100));
    assert!(windows.contains_key(&200));
    assert!(!windows.contains_key(&w));
}

#[tokio::test(start_paused = true)]
async fn migration_preserves_unmatchable_orphans() {
    init_tracing();
    let storage = MemoryStorage::new();
    let mut stored = WindowAssignments::new();
    let mut entry = WorkspaceAssignments::new();
    assign_tab(&mut entry, "work", tab_record("https://x.com"));
    assign_tab(&mut entry, "work", tab_record("https://y.com"));
    stored.insert(100, entry);
    save_assignments(&storage, &stored).expect("seed");

    let browser = MemoryBrowser::new();
    let w = browser.add_window();
    browser.add_tab(w, "https://a.com");
    browser.add_tab(w, "https://b.com");

    let r = Reconciler::new(browser, storage, ReconcilerConfig::fast());
    r.run_migration().await.expect("migration");

    // Zero URL overlap clears no gate; the orphan stays under its stale
    // key and the live window stays unclaimed.
    let windows = load_assignments(r.storage()).expect("load");
    assert!(windows.contains_key(&100));
    assert!(!windows.contains_key(&w));
}

#[tokio::test(start_paused = true)]
async fn migration_discards_empty_orphan_entries() {
    let storage = MemoryStorage::new();
    let mut stored = WindowAssignments::new();
    stored.insert(100, WorkspaceAssignments::new());
    save_assignments(&storage, &stored).expect("seed");

    let r = Reconciler::new(MemoryBrowser::new(), storage, ReconcilerConfig::fast());
    r.run_migration().await.expect("migration");

    assert!(load_assignments(r.storage()).expect("load").is_empty());
}

// ─── Sync ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn sync_prunes_records_for_closed_tabs() {
    let r = reconciler();
    let w = r.host().add_window();
    let a = r.host().add_tab(w, "https://a.com");
    let b = r.host().add_tab(w, "https://b.com");
    r.create_workspace(WorkspaceDefinition::new("work", "Work"))
        .expect("create");
    r.move_tab_to_workspace(a, "work").await.expect("assign");
    r.move_tab_to_workspace(b, "work").await.expect("assign");

    r.host().remove_tab(b);
    r.handle_event(BrowserEvent::TabRemoved { window: w, tab: b });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let entry = r.assignments_for_window(w).expect("load");
    let tabs = &entry.get("work").expect("entry").tabs;
    assert_eq!(tabs.len(), 1);
    assert_eq!(tabs[0].tab_id, Some(a));
}

#[tokio::test]
async fn move_command_refreshes_stale_records() {
    let r = reconciler();
    let w = r.host().add_window();
    let a = r.host().add_tab(w, "https://a.com");
    let b = r.host().add_tab(w, "https://b.com");
    r.create_workspace(WorkspaceDefinition::new("work", "Work"))
        .expect("create");
    r.move_tab_to_workspace(a, "work").await.expect("assign");
    r.move_tab_to_workspace(b, "work").await.expect("assign");

    // The tab closes but its removal event never arrives.
    r.host().remove_tab(b);
    r.move_tab_to_workspace(a, "work").await.expect("assign");

    // The command's own sync already pruned the closed tab's record.
    let entry = r.assignments_for_window(w).expect("load");
    let tabs = &entry.get("work").expect("entry").tabs;
    assert_eq!(tabs.len(), 1);
    assert_eq!(tabs[0].tab_id, Some(a));
}

#[tokio::test(start_paused = true)]
async fn sync_leaves_restoring_window_alone() {
    init_tracing();
    let browser = MemoryBrowser::new();
    let w = browser.add_window();
    for _ in 0..4 {
        browser.add_tab(w, "about:blank");
    }
    browser.add_tab(w, "https://real.com");

    let storage = MemoryStorage::new();
    let mut stored = WindowAssignments::new();
    let mut entry = WorkspaceAssignments::new();
    assign_tab(&mut entry, "work", tab_record("https://gone.com"));
    stored.insert(w, entry);
    save_assignments(&storage, &stored).expect("seed");

    let r = Reconciler::new(browser, storage, ReconcilerConfig::fast());
    r.schedule_sync(w);
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Four of five tabs are placeholders: pruning now would destroy the
    // record its navigated tab is about to match.
    let entry = r.assignments_for_window(w).expect("load");
    assert_eq!(entry.get("work").map(|e| e.tabs.len()), Some(1));
}

#[tokio::test(start_paused = true)]
async fn new_group_inherits_member_workspace() {
    let r = reconciler();
    let w = r.host().add_window();
    let a = r.host().add_tab(w, "https://a.com");
    r.create_workspace(WorkspaceDefinition::new("work", "Work"))
        .expect("create");
    r.move_tab_to_workspace(a, "work").await.expect("assign");

    let group = r.host().add_group(w, "New", GroupColor::Cyan);
    r.host().group_tabs(group, &[a]);
    r.handle_event(BrowserEvent::GroupCreated { window: w, group });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let entry = r.assignments_for_window(w).expect("load");
    let work = entry.get("work").expect("workspace kept");
    assert_eq!(work.groups.len(), 1);
    assert_eq!(work.groups[0].signature(), "New|cyan");
    assert!(
        work.tabs.is_empty(),
        "member's individual record folds into the group"
    );
}

#[tokio::test(start_paused = true)]
async fn new_group_falls_back_to_active_workspace() {
    let r = reconciler();
    let w = r.host().add_window();
    let a = r.host().add_tab(w, "https://a.com");
    r.create_workspace(WorkspaceDefinition::new("work", "Work"))
        .expect("create");
    r.set_active_workspace(w, "work").expect("set");

    // No member carries an individual assignment; the active workspace
    // claims the new group.
    let group = r.host().add_group(w, "Fresh", GroupColor::Green);
    r.host().group_tabs(group, &[a]);
    r.handle_event(BrowserEvent::GroupCreated { window: w, group });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let entry = r.assignments_for_window(w).expect("load");
    assert_eq!(entry.get("work").map(|e| e.groups.len()), Some(1));
}

#[tokio::test(start_paused = true)]
async fn attached_tab_keeps_its_workspace() {
    let r = reconciler();
    let w1 = r.host().add_window();
    let w2 = r.host().add_window();
    let a = r.host().add_tab(w1, "https://a.com");
    r.create_workspace(WorkspaceDefinition::new("work", "Work"))
        .expect("create");
    r.move_tab_to_workspace(a, "work").await.expect("assign");

    r.handle_event(BrowserEvent::TabAttached { window: w2, tab: a });
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert!(r.assignments_for_window(w1).expect("load").is_empty());
    let entry = r.assignments_for_window(w2).expect("load");
    assert_eq!(entry.get("work").map(|e| e.tabs.len()), Some(1));
}

// ─── Reorder ──────────────────────────────────────────────────────

#[tokio::test]
async fn assigned_group_moves_behind_general_tabs() {
    let r = reconciler();
    let w = r.host().add_window();
    let b = r.host().add_tab(w, "https://b.com");
    let g1 = r.host().add_tab(w, "https://g1.com");
    let a = r.host().add_tab(w, "https://a.com");
    let g2 = r.host().add_tab(w, "https://g2.com");
    let group = r.host().add_group(w, "Work", GroupColor::Blue);
    r.host().group_tabs(group, &[g1, g2]);

    r.create_workspace(WorkspaceDefinition::new("work", "Work"))
        .expect("create");
    r.move_group_to_workspace(group, "work").await.expect("assign");

    // General tabs keep their relative order up front; the group's tabs
    // sit together at the back.
    assert_eq!(r.host().tab_order(w), vec![b, a, g1, g2]);
}

#[tokio::test]
async fn reorder_converges_to_a_fixed_point() {
    let r = reconciler();
    let w = r.host().add_window();
    let b = r.host().add_tab(w, "https://b.com");
    let g1 = r.host().add_tab(w, "https://g1.com");
    let a = r.host().add_tab(w, "https://a.com");
    let g2 = r.host().add_tab(w, "https://g2.com");
    let group = r.host().add_group(w, "Work", GroupColor::Blue);
    r.host().group_tabs(group, &[g1, g2]);

    r.create_workspace(WorkspaceDefinition::new("work", "Work"))
        .expect("create");
    r.move_group_to_workspace(group, "work").await.expect("assign");
    let settled = r.host().tab_order(w);

    // Re-issuing the command plans no further moves.
    r.move_group_to_workspace(group, "work").await.expect("assign");
    assert_eq!(r.host().tab_order(w), settled);
}

#[tokio::test]
async fn pinned_tabs_stay_in_front() {
    let r = reconciler();
    let w = r.host().add_window();
    let p = r.host().add_pinned_tab(w, "https://pinned.com");
    let a = r.host().add_tab(w, "https://a.com");
    let t = r.host().add_tab(w, "https://t.com");

    r.create_workspace(WorkspaceDefinition::new("work", "Work"))
        .expect("create");
    r.move_tab_to_workspace(t, "work").await.expect("assign");

    let order = r.host().tab_order(w);
    assert_eq!(order[0], p);
    assert_eq!(order, vec![p, a, t]);
}
