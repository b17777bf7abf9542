//! Window fingerprints for orphan/live similarity scoring.
//!
//! A fingerprint summarizes a window's content as counts plus two identity
//! sets (group signatures, normalized URLs). Two construction paths:
//!
//! - **orphan fingerprint**: from a persisted `WorkspaceAssignments` — covers
//!   only non-general items, since general membership is never persisted;
//! - **current fingerprint**: from a live `WindowSnapshot` — covers the
//!   window's full content.
//!
//! The orphan side is therefore always a (rough) subset of the current side,
//! which is why the matcher scores asymmetric coverage instead of Jaccard.
//!
//! Fingerprints are ephemeral; they exist only for one migration pass and
//! are never persisted.

use std::collections::BTreeSet;

use crate::types::{WindowSnapshot, WorkspaceAssignments};
use crate::url::{is_placeholder_url, normalize_url};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowFingerprint {
    pub tab_count: usize,
    pub group_count: usize,
    /// Restart-durable group identities: `"{title}|{color}"`.
    pub group_signatures: BTreeSet<String>,
    /// Normalized URLs of every covered tab.
    pub url_set: BTreeSet<String>,
}

impl WindowFingerprint {
    /// Fingerprint of a persisted assignment (the orphan side).
    ///
    /// Tabs inside assigned groups count toward `tab_count` alongside
    /// individually tracked tabs; both contribute to the URL set.
    pub fn from_assignments(assignments: &WorkspaceAssignments) -> Self {
        let mut fp = Self::default();
        for entry in assignments.values() {
            for group in &entry.groups {
                fp.group_count += 1;
                fp.group_signatures.insert(group.signature());
                for url in &group.tab_urls {
                    fp.tab_count += 1;
                    fp.url_set.insert(normalize_url(url));
                }
            }
            for tab in &entry.tabs {
                fp.tab_count += 1;
                fp.url_set.insert(normalize_url(&tab.url));
            }
        }
        fp
    }

    /// Fingerprint of a live window (the current side).
    ///
    /// Placeholder URLs (not-yet-navigated restored tabs) are excluded from
    /// the URL set but still count toward `tab_count`.
    pub fn from_snapshot(snapshot: &WindowSnapshot) -> Self {
        let mut fp = Self::default();
        fp.tab_count = snapshot.tabs.len();
        fp.group_count = snapshot.groups.len();
        for group in &snapshot.groups {
            fp.group_signatures.insert(group.signature());
        }
        for tab in &snapshot.tabs {
            if !is_placeholder_url(&tab.url) {
                fp.url_set.insert(normalize_url(&tab.url));
            }
        }
        fp
    }

    /// True when the fingerprint carries no content at all.
    pub fn is_empty(&self) -> bool {
        self.tab_count == 0 && self.group_count == 0
    }
}
