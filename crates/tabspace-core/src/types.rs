use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ─── Identifiers ──────────────────────────────────────────────────

/// Live window identifier. Not stable across browser restarts.
pub type WindowId = u64;

/// Live tab identifier. Mostly regenerated across browser restarts.
pub type TabId = u64;

/// Live tab-group identifier. Never survives a browser restart.
pub type GroupId = u64;

/// User-defined workspace identifier.
pub type WorkspaceId = String;

/// The implicit default workspace. Membership in it is the *absence* of any
/// other assignment; it never appears as a key in assignment maps.
pub const GENERAL_WORKSPACE: &str = "general";

// ─── Group Color ──────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum GroupColor {
    #[default]
    Grey,
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
    Orange,
}

impl GroupColor {
    pub const ALL: [Self; 9] = [
        Self::Grey,
        Self::Blue,
        Self::Red,
        Self::Yellow,
        Self::Green,
        Self::Pink,
        Self::Purple,
        Self::Cyan,
        Self::Orange,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grey => "grey",
            Self::Blue => "blue",
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Pink => "pink",
            Self::Purple => "purple",
            Self::Cyan => "cyan",
            Self::Orange => "orange",
        }
    }
}

impl fmt::Display for GroupColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupColor {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grey" | "gray" => Ok(Self::Grey),
            "blue" => Ok(Self::Blue),
            "red" => Ok(Self::Red),
            "yellow" => Ok(Self::Yellow),
            "green" => Ok(Self::Green),
            "pink" => Ok(Self::Pink),
            "purple" => Ok(Self::Purple),
            "cyan" => Ok(Self::Cyan),
            "orange" => Ok(Self::Orange),
            _ => Err(CoreError::UnknownColor(s.to_string())),
        }
    }
}

// ─── Workspace Definitions ────────────────────────────────────────

/// A user-defined logical partition of tabs and groups within one window.
///
/// Exactly one definition has `id == "general"` and `is_default == true`.
/// The order of the definitions list is the user-chosen workspace order and
/// drives the reorder rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceDefinition {
    pub id: WorkspaceId,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub is_default: bool,
    /// When the workspace was created. Absent on records written before
    /// this field existed.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl WorkspaceDefinition {
    /// A user-created workspace.
    pub fn new(id: impl Into<WorkspaceId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            icon: String::new(),
            is_default: false,
            created_at: Some(Utc::now()),
        }
    }

    /// The built-in default workspace definition.
    pub fn general() -> Self {
        Self {
            id: GENERAL_WORKSPACE.to_string(),
            name: "General".to_string(),
            icon: String::new(),
            is_default: true,
            created_at: None,
        }
    }
}

// ─── Persisted Assignments ────────────────────────────────────────

/// A tab group tracked by its restart-durable identity (title, color).
///
/// Live group ids do not survive restarts, so the pair (title, color) is the
/// group's identity; `tab_urls` carries the last-known member URLs for
/// fingerprinting and re-resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAssignment {
    pub title: String,
    #[serde(default)]
    pub color: GroupColor,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub tab_urls: Vec<String>,
}

impl GroupAssignment {
    /// Restart-durable group identity: `"{title}|{color}"`.
    pub fn signature(&self) -> String {
        group_signature(&self.title, self.color)
    }
}

/// Restart-durable group identity for a (title, color) pair.
pub fn group_signature(title: &str, color: GroupColor) -> String {
    format!("{}|{}", title, color.as_str())
}

/// An individually tracked tab, identified primarily by a last-known live
/// `tab_id` and secondarily by normalized URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabAssignment {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub tab_id: Option<TabId>,
}

/// Groups and tabs assigned to one workspace within one window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceEntry {
    #[serde(default)]
    pub groups: Vec<GroupAssignment>,
    #[serde(default)]
    pub tabs: Vec<TabAssignment>,
}

impl WorkspaceEntry {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.tabs.is_empty()
    }
}

/// Per-window map of workspace id → assigned groups/tabs.
/// Never contains the `general` key.
pub type WorkspaceAssignments = BTreeMap<WorkspaceId, WorkspaceEntry>;

/// Full persisted assignment state: window id → workspace assignments.
pub type WindowAssignments = BTreeMap<WindowId, WorkspaceAssignments>;

/// Which workspace newly created tabs/groups join, per window.
pub type ActiveWorkspaceMap = BTreeMap<WindowId, WorkspaceId>;

/// True when every entry of the per-window map is empty.
pub fn assignments_empty(assignments: &WorkspaceAssignments) -> bool {
    assignments.values().all(WorkspaceEntry::is_empty)
}

// ─── Live Model ───────────────────────────────────────────────────

/// A live browser window, by id only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveWindow {
    pub id: WindowId,
}

/// A live tab as reported by the host browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveTab {
    pub id: TabId,
    pub window_id: WindowId,
    pub index: u32,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

/// A live tab group as reported by the host browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveGroup {
    pub id: GroupId,
    pub window_id: WindowId,
    pub title: String,
    #[serde(default)]
    pub color: GroupColor,
    /// Index of the group's first tab in the window.
    #[serde(default)]
    pub index: u32,
}

impl LiveGroup {
    pub fn signature(&self) -> String {
        group_signature(&self.title, self.color)
    }
}

/// Point-in-time capture of one window's tabs and groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub window_id: WindowId,
    pub tabs: Vec<LiveTab>,
    pub groups: Vec<LiveGroup>,
}

impl WindowSnapshot {
    /// Member tabs of a group, in live index order.
    pub fn group_tabs(&self, group: GroupId) -> Vec<&LiveTab> {
        let mut tabs: Vec<&LiveTab> = self
            .tabs
            .iter()
            .filter(|t| t.group_id == Some(group))
            .collect();
        tabs.sort_by_key(|t| t.index);
        tabs
    }
}

// ─── Error ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    UnknownColor(String),
    UnknownWorkspace(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownColor(s) => write!(f, "unknown group color: {s}"),
            Self::UnknownWorkspace(s) => write!(f, "unknown workspace: {s}"),
        }
    }
}

impl std::error::Error for CoreError {}

// ─── Tests ────────────────────────────────────────────────────────
