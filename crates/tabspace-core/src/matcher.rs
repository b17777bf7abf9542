//! Asymmetric similarity scoring between an orphaned assignment and a live
//! window, plus the acceptance gate applied by the migration coordinator.
//!
//! Overlap is scored as **coverage** (intersection / |orphan set|) rather
//! than symmetric Jaccard: the orphan fingerprint only sees non-general
//! items, so it is expected to be a strict subset of the live window's full
//! content and a symmetric metric would systematically under-score correct
//! matches.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::fingerprint::WindowFingerprint;

// ─── Calibration Constants ────────────────────────────────────────

/// Empirically chosen weights and gate thresholds.
///
/// These are calibration constants, not invariants — kept configurable
/// rather than re-derived. Defaults reproduce the shipped behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchThresholds {
    /// Group-coverage weight when both sides carry group signatures.
    pub group_weight: f64,
    /// URL-coverage weight alongside group coverage.
    pub url_weight_grouped: f64,
    /// Count-similarity weight alongside group coverage.
    pub count_weight_grouped: f64,
    /// URL-coverage weight when only URLs are available.
    pub url_weight: f64,
    /// Count-similarity weight alongside URL coverage.
    pub count_weight_urls: f64,
    /// Count-similarity weight when counts are the only signal.
    pub count_weight_only: f64,
    /// Minimum group similarity for a group-bearing orphan.
    pub group_gate: f64,
    /// Alternative overall-score gate for a group-bearing orphan.
    pub group_score_gate: f64,
    /// Minimum URL similarity for a URL-only orphan.
    pub url_gate: f64,
    /// Alternative overall-score gate for a URL-only orphan.
    pub url_score_gate: f64,
    /// Required gap between the best and second-best candidate when more
    /// than one is eligible (ambiguity guard).
    pub margin: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            group_weight: 0.6,
            url_weight_grouped: 0.3,
            count_weight_grouped: 0.1,
            url_weight: 0.7,
            count_weight_urls: 0.3,
            count_weight_only: 0.5,
            group_gate: 0.5,
            group_score_gate: 0.6,
            url_gate: 0.35,
            url_score_gate: 0.5,
            margin: 0.08,
        }
    }
}

// ─── Similarity ───────────────────────────────────────────────────

/// Similarity between one orphan fingerprint and one live window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Similarity {
    /// Weighted overall score in `[0, 1]`.
    pub score: f64,
    /// Group-signature coverage (0 when either side has no groups).
    pub group_similarity: f64,
    /// URL coverage (0 when either side has no URLs).
    pub url_similarity: f64,
    /// Size of the URL intersection.
    pub url_overlap_count: usize,
}

/// What kind of evidence an orphan fingerprint carries; decides which
/// acceptance gate applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanKind {
    /// Carries at least one group signature.
    Grouped,
    /// No groups, but at least one URL.
    UrlOnly,
    /// Counts only — too weak to ever accept.
    CountOnly,
}

impl OrphanKind {
    pub fn of(orphan: &WindowFingerprint) -> Self {
        if !orphan.group_signatures.is_empty() {
            Self::Grouped
        } else if !orphan.url_set.is_empty() {
            Self::UrlOnly
        } else {
            Self::CountOnly
        }
    }
}

/// Coverage of `reference` by `other`: `|reference ∩ other| / |reference|`.
/// Returns (coverage, intersection size); coverage is 0 for an empty
/// reference set.
fn coverage(reference: &BTreeSet<String>, other: &BTreeSet<String>) -> (f64, usize) {
    if reference.is_empty() {
        return (0.0, 0);
    }
    let overlap = reference.intersection(other).count();
    (overlap as f64 / reference.len() as f64, overlap)
}

/// `1 − (|Δtabs|/max(tabs) + |Δgroups|/max(groups)) / 2`.
/// A dimension with zero items on both sides contributes no difference.
fn count_similarity(orphan: &WindowFingerprint, current: &WindowFingerprint) -> f64 {
    let dim = |a: usize, b: usize| -> f64 {
        let max = a.max(b);
        if max == 0 {
            0.0
        } else {
            a.abs_diff(b) as f64 / max as f64
        }
    };
    let tab_diff = dim(orphan.tab_count, current.tab_count);
    let group_diff = dim(orphan.group_count, current.group_count);
    1.0 - (tab_diff + group_diff) / 2.0
}

/// Score how well a live window's content matches an orphaned assignment.
///
/// Weighting depends on data availability:
/// - both sides have group signatures: groups dominate;
/// - both sides have URLs (no group evidence): URLs dominate;
/// - otherwise: counts alone, heavily discounted.
pub fn similarity(
    orphan: &WindowFingerprint,
    current: &WindowFingerprint,
    t: &MatchThresholds,
) -> Similarity {
    let (group_cov, _) = coverage(&orphan.group_signatures, &current.group_signatures);
    let (url_cov, url_overlap) = coverage(&orphan.url_set, &current.url_set);
    let count_sim = count_similarity(orphan, current);

    let both_have_groups =
        !orphan.group_signatures.is_empty() && !current.group_signatures.is_empty();
    let both_have_urls = !orphan.url_set.is_empty() && !current.url_set.is_empty();

    let score = if both_have_groups {
        t.group_weight * group_cov + t.url_weight_grouped * url_cov + t.count_weight_grouped * count_sim
    } else if both_have_urls {
        t.url_weight * url_cov + t.count_weight_urls * count_sim
    } else {
        t.count_weight_only * count_sim
    };

    Similarity {
        score,
        group_similarity: group_cov,
        url_similarity: url_cov,
        url_overlap_count: url_overlap,
    }
}

/// Acceptance gate for a single candidate pair.
///
/// Applied by the migration coordinator, not the matcher: a scored pair is
/// only a *candidate* once it clears the gate for its orphan kind. The
/// ambiguity margin is a separate, cross-candidate check (see
/// `matching::greedy_match`).
pub fn clears_gate(kind: OrphanKind, sim: &Similarity, t: &MatchThresholds) -> bool {
    match kind {
        OrphanKind::Grouped => {
            sim.group_similarity >= t.group_gate || sim.score >= t.group_score_gate
        }
        OrphanKind::UrlOnly => {
            sim.url_overlap_count > 0
                && (sim.url_similarity >= t.url_gate || sim.score >= t.url_score_gate)
        }
        OrphanKind::CountOnly => false,
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(
        tabs: usize,
        groups: usize,
        signatures: &[&str],
        urls: &[&str],
    ) -> WindowFingerprint {
        WindowFingerprint {
            tab_count: tabs,
            group_count: groups,
            group_signatures: signatures.iter().map(|s| s.to_string()).collect(),
            url_set: urls.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn t() -> MatchThresholds {
        MatchThresholds::default()
    }

    // ── Weighting regimes ───────────────────────────────────────

    #[test]
    fn group_regime_weights() {
        // Full group coverage, full URL coverage, identical counts.
        let orphan = fp(2, 1, &["Work|blue"], &["https://a.com", "https://b.com"]);
        let current = fp(2, 1, &["Work|blue"], &["https://a.com", "https://b.com"]);
        let sim = similarity(&orphan, &current, &t());
        assert!((sim.score - 1.0).abs() < 1e-9);
        assert!((sim.group_similarity - 1.0).abs() < 1e-9);
        assert!((sim.url_similarity - 1.0).abs() < 1e-9);
        assert_eq!(sim.url_overlap_count, 2);
    }

    #[test]
    fn group_regime_partial_coverage() {
        let orphan = fp(2, 2, &["Work|blue", "Home|red"], &["https://a.com"]);
        let current = fp(2, 2, &["Work|blue"], &["https://a.com"]);
        let sim = similarity(&orphan, &current, &t());
        // groups: 1/2 covered; urls: 1/1; counts equal.
        let expected = 0.6 * 0.5 + 0.3 * 1.0 + 0.1 * 1.0;
        assert!((sim.score - expected).abs() < 1e-9);
        assert!((sim.group_similarity - 0.5).abs() < 1e-9);
    }

    #[test]
    fn url_regime_when_current_lacks_groups() {
        // Orphan has a group signature but the live side has none yet
        // (restored groups may lag) — falls through to the URL regime.
        let orphan = fp(2, 1, &["Work|blue"], &["https://a.com", "https://b.com"]);
        let current = fp(2, 0, &[], &["https://a.com", "https://b.com"]);
        let sim = similarity(&orphan, &current, &t());
        // urls 2/2; counts: tabs equal, groups 1 vs 0 -> diff 1.0.
        let count_sim = 1.0 - (0.0 + 1.0) / 2.0;
        let expected = 0.7 * 1.0 + 0.3 * count_sim;
        assert!((sim.score - expected).abs() < 1e-9);
    }

    #[test]
    fn count_regime_when_no_shared_evidence() {
        let orphan = fp(4, 0, &[], &[]);
        let current = fp(4, 0, &[], &["https://a.com"]);
        let sim = similarity(&orphan, &current, &t());
        // Counts identical in both dimensions.
        assert!((sim.score - 0.5).abs() < 1e-9);
        assert_eq!(sim.url_overlap_count, 0);
    }

    #[test]
    fn count_similarity_penalizes_divergence() {
        let orphan = fp(2, 0, &[], &[]);
        let current = fp(8, 0, &[], &[]);
        let sim = similarity(&orphan, &current, &t());
        // tab diff 6/8 = 0.75, group dims both zero -> diff 0.
        let expected = 0.5 * (1.0 - 0.75 / 2.0);
        assert!((sim.score - expected).abs() < 1e-9);
    }

    #[test]
    fn asymmetric_coverage_ignores_extra_live_content() {
        // The live window carries general-workspace tabs the orphan cannot
        // see; full coverage of the orphan set must still score 1.0.
        let orphan = fp(1, 0, &[], &["https://a.com"]);
        let current = fp(
            10,
            0,
            &[],
            &["https://a.com", "https://x.com", "https://y.com"],
        );
        let sim = similarity(&orphan, &current, &t());
        assert!((sim.url_similarity - 1.0).abs() < 1e-9);
    }

    // ── Orphan kind ─────────────────────────────────────────────

    #[test]
    fn orphan_kind_classification() {
        assert_eq!(
            OrphanKind::of(&fp(2, 1, &["Work|blue"], &["https://a.com"])),
            OrphanKind::Grouped
        );
        assert_eq!(
            OrphanKind::of(&fp(1, 0, &[], &["https://a.com"])),
            OrphanKind::UrlOnly
        );
        assert_eq!(OrphanKind::of(&fp(3, 0, &[], &[])), OrphanKind::CountOnly);
    }

    // ── Acceptance gate ─────────────────────────────────────────

    #[test]
    fn gate_grouped_passes_on_group_similarity() {
        let sim = Similarity {
            score: 0.4,
            group_similarity: 0.5,
            url_similarity: 0.0,
            url_overlap_count: 0,
        };
        assert!(clears_gate(OrphanKind::Grouped, &sim, &t()));
    }

    #[test]
    fn gate_grouped_passes_on_overall_score() {
        let sim = Similarity {
            score: 0.6,
            group_similarity: 0.2,
            url_similarity: 0.9,
            url_overlap_count: 5,
        };
        assert!(clears_gate(OrphanKind::Grouped, &sim, &t()));
    }

    #[test]
    fn gate_grouped_rejects_weak_match() {
        let sim = Similarity {
            score: 0.45,
            group_similarity: 0.3,
            url_similarity: 0.4,
            url_overlap_count: 1,
        };
        assert!(!clears_gate(OrphanKind::Grouped, &sim, &t()));
    }

    #[test]
    fn gate_url_only_requires_actual_overlap() {
        // High count similarity cannot compensate for zero shared URLs.
        let sim = Similarity {
            score: 0.9,
            group_similarity: 0.0,
            url_similarity: 0.9,
            url_overlap_count: 0,
        };
        assert!(!clears_gate(OrphanKind::UrlOnly, &sim, &t()));
    }

    #[test]
    fn gate_url_only_passes_on_url_similarity() {
        let sim = Similarity {
            score: 0.3,
            group_similarity: 0.0,
            url_similarity: 0.35,
            url_overlap_count: 1,
        };
        assert!(clears_gate(OrphanKind::UrlOnly, &sim, &t()));
    }

    #[test]
    fn gate_url_only_passes_on_overall_score() {
        let sim = Similarity {
            score: 0.5,
            group_similarity: 0.0,
            url_similarity: 0.2,
            url_overlap_count: 1,
        };
        assert!(clears_gate(OrphanKind::UrlOnly, &sim, &t()));
    }

    #[test]
    fn gate_count_only_never_accepted() {
        let sim = Similarity {
            score: 1.0,
            group_similarity: 1.0,
            url_similarity: 1.0,
            url_overlap_count: 10,
        };
        assert!(!clears_gate(OrphanKind::CountOnly, &sim, &t()));
    }

    #[test]
    fn default_thresholds_are_the_shipped_calibration() {
        let t = MatchThresholds::default();
        assert!((t.group_weight - 0.6).abs() < 1e-9);
        assert!((t.url_weight - 0.7).abs() < 1e-9);
        assert!((t.url_gate - 0.35).abs() < 1e-9);
        assert!((t.margin - 0.08).abs() < 1e-9);
    }
}
