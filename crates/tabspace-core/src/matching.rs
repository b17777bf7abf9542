//! Greedy one-to-one resolution of orphan→window candidates.
//!
//! Operates on a precomputed score matrix so the async orchestration can be
//! tested separately from the matching policy. `matrix[o][w]` is `Some`
//! only for pairs that already cleared the acceptance gate.
//!
//! Ambiguity handling is conservative in both directions: an orphan whose
//! two best target windows score within the margin is withheld entirely,
//! and a window contested by two orphans within the margin is given to
//! neither. On ambiguity the data stays attached to its stale window id —
//! inert, never guessed.

use crate::matcher::Similarity;

/// An accepted orphan→window pairing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPair {
    pub orphan: usize,
    pub window: usize,
    pub sim: Similarity,
}

/// Resolve gate-clearing candidates into one-to-one matches, greedily by
/// descending score.
///
/// `matrix` is indexed `[orphan][window]`; entries that failed the gate are
/// `None`. `margin` is the minimum score gap required between an index's
/// best and second-best counterpart whenever it has more than one
/// candidate.
pub fn greedy_match(matrix: &[Vec<Option<Similarity>>], margin: f64) -> Vec<MatchPair> {
    let orphan_count = matrix.len();
    let window_count = matrix.first().map_or(0, Vec::len);

    // Rows (orphans) with an ambiguous best/second-best split are withheld.
    let ambiguous_orphan: Vec<bool> = (0..orphan_count)
        .map(|o| {
            let scores: Vec<f64> = (0..window_count)
                .filter_map(|w| matrix[o][w].map(|s| s.score))
                .collect();
            is_ambiguous(&scores, margin)
        })
        .collect();

    // Columns (windows) contested within the margin are given to neither.
    let ambiguous_window: Vec<bool> = (0..window_count)
        .map(|w| {
            let scores: Vec<f64> = (0..orphan_count)
                .filter_map(|o| matrix[o][w].map(|s| s.score))
                .collect();
            is_ambiguous(&scores, margin)
        })
        .collect();

    let mut pairs: Vec<MatchPair> = Vec::new();
    for (o, row) in matrix.iter().enumerate() {
        if ambiguous_orphan[o] {
            continue;
        }
        for (w, cell) in row.iter().enumerate() {
            if ambiguous_window[w] {
                continue;
            }
            if let Some(sim) = cell {
                pairs.push(MatchPair {
                    orphan: o,
                    window: w,
                    sim: *sim,
                });
            }
        }
    }

    // Descending score; index order as a deterministic tie-break.
    pairs.sort_by(|a, b| {
        b.sim
            .score
            .partial_cmp(&a.sim.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.orphan.cmp(&b.orphan))
            .then(a.window.cmp(&b.window))
    });

    let mut used_orphans = vec![false; orphan_count];
    let mut used_windows = vec![false; window_count];
    let mut matches = Vec::new();
    for pair in pairs {
        if used_orphans[pair.orphan] || used_windows[pair.window] {
            continue;
        }
        used_orphans[pair.orphan] = true;
        used_windows[pair.window] = true;
        matches.push(pair);
    }
    matches
}

/// True when two or more candidates exist and the top two are closer than
/// the margin.
fn is_ambiguous(scores: &[f64], margin: f64) -> bool {
    if scores.len() < 2 {
        return false;
    }
    let mut best = f64::NEG_INFINITY;
    let mut second = f64::NEG_INFINITY;
    for &s in scores {
        if s > best {
            second = best;
            best = s;
        } else if s > second {
            second = s;
        }
    }
    best - second < margin
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sim(score: f64) -> Option<Similarity> {
        Some(Similarity {
            score,
            group_similarity: 0.0,
            url_similarity: 0.0,
            url_overlap_count: 1,
        })
    }

    #[test]
    fn single_clear_match() {
        let matrix = vec![vec![None, sim(0.9)]];
        let matches = greedy_match(&matrix, 0.08);
        assert_eq!(matches.len(), 1);
        assert_eq!((matches[0].orphan, matches[0].window), (0, 1));
    }

    #[test]
    fn each_orphan_and_window_used_once() {
        // Orphan 0 prefers window 0; orphan 1 only matches window 0 too,
        // but with a clearly lower score — it loses and stays unmatched.
        let matrix = vec![vec![sim(0.9), None], vec![sim(0.5), None]];
        let matches = greedy_match(&matrix, 0.08);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].orphan, 0);
    }

    #[test]
    fn greedy_resolves_cross_preferences_by_score() {
        // orphan 0: w0=0.9, w1=0.6; orphan 1: w0=0.7, w1=0.3.
        // Highest pair (0,w0) wins; orphan 1 falls back to w1.
        let matrix = vec![vec![sim(0.9), sim(0.6)], vec![sim(0.7), sim(0.3)]];
        let matches = greedy_match(&matrix, 0.08);
        assert_eq!(matches.len(), 2);
        assert_eq!((matches[0].orphan, matches[0].window), (0, 0));
        assert_eq!((matches[1].orphan, matches[1].window), (1, 1));
    }

    #[test]
    fn ambiguous_orphan_is_withheld() {
        // Orphan 0 scores two windows within the margin: no match at all.
        let matrix = vec![vec![sim(0.62), sim(0.60)]];
        let matches = greedy_match(&matrix, 0.08);
        assert!(matches.is_empty());
    }

    #[test]
    fn contested_window_goes_to_neither() {
        // Two orphans score the same window within the margin.
        let matrix = vec![vec![sim(0.62)], vec![sim(0.60)]];
        let matches = greedy_match(&matrix, 0.08);
        assert!(matches.is_empty());
    }

    #[test]
    fn margin_not_applied_to_sole_candidate() {
        let matrix = vec![vec![sim(0.5)]];
        let matches = greedy_match(&matrix, 0.08);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn margin_cleared_allows_both() {
        let matrix = vec![vec![sim(0.9), sim(0.4)], vec![sim(0.4), sim(0.9)]];
        let matches = greedy_match(&matrix, 0.08);
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn empty_matrix() {
        let matrix: Vec<Vec<Option<Similarity>>> = vec![];
        assert!(greedy_match(&matrix, 0.08).is_empty());
    }

    #[test]
    fn gate_failures_are_not_candidates() {
        let matrix = vec![vec![None, None]];
        assert!(greedy_match(&matrix, 0.08).is_empty());
    }
}
