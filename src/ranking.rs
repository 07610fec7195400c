// 🏅 Rank Filter - per-group aggregate → rank position → position filter
//
// Every ranked report runs through this module instead of re-inlining the
// pattern: order groups by score, assign an ordinal or dense position, and
// keep only the positions asked for (top 5, a single rank, or a union of
// ranges such as 1–3 plus 21–23). Ties are broken on the group key so
// repeated runs always agree.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankOrder {
    /// Smallest score first (least popular, cheapest).
    Ascending,

    /// Largest score first (most popular, priciest).
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankMethod {
    /// Every group gets a distinct position 1..n.
    Ordinal,

    /// Groups with equal scores share a position; the next distinct score
    /// takes the next position (no gaps).
    Dense,
}

/// Set of wanted rank positions: a union of inclusive ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Positions {
    ranges: Vec<(usize, usize)>,
}

impl Positions {
    /// Positions 1 through `n`.
    pub fn top(n: usize) -> Self {
        Positions { ranges: vec![(1, n)] }
    }

    /// Exactly one position.
    pub fn single(position: usize) -> Self {
        Positions {
            ranges: vec![(position, position)],
        }
    }

    /// One inclusive range.
    pub fn range(lo: usize, hi: usize) -> Self {
        Positions { ranges: vec![(lo, hi)] }
    }

    /// Add another inclusive range to the set.
    pub fn and_range(mut self, lo: usize, hi: usize) -> Self {
        self.ranges.push((lo, hi));
        self
    }

    /// Every position, i.e. rank without filtering.
    pub fn all() -> Self {
        Positions {
            ranges: vec![(1, usize::MAX)],
        }
    }

    pub fn contains(&self, position: usize) -> bool {
        self.ranges.iter().any(|&(lo, hi)| position >= lo && position <= hi)
    }
}

// ============================================================================
// RANKED OUTPUT
// ============================================================================

/// One group that survived the position filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked<K> {
    pub key: K,
    pub score: f64,
    pub position: usize,
}

/// Rank `groups` by score and keep the requested positions.
///
/// Input order does not matter; output is sorted by position, ties by key.
/// NaN scores sort as equal to everything, which never happens with GROUP
/// BY aggregates but keeps the sort total.
pub fn rank_filter<K>(
    groups: Vec<(K, f64)>,
    order: RankOrder,
    method: RankMethod,
    positions: &Positions,
) -> Vec<Ranked<K>>
where
    K: Ord + Clone,
{
    let mut sorted = groups;
    sorted.sort_by(|a, b| {
        let by_score = match order {
            RankOrder::Ascending => a.1.partial_cmp(&b.1),
            RankOrder::Descending => b.1.partial_cmp(&a.1),
        }
        .unwrap_or(Ordering::Equal);

        by_score.then_with(|| a.0.cmp(&b.0))
    });

    let mut out = Vec::new();
    let mut position = 0usize;
    let mut previous_score: Option<f64> = None;

    for (index, (key, score)) in sorted.into_iter().enumerate() {
        match method {
            RankMethod::Ordinal => position = index + 1,
            RankMethod::Dense => {
                if previous_score != Some(score) {
                    position += 1;
                }
            }
        }
        previous_score = Some(score);

        if positions.contains(position) {
            out.push(Ranked { key, score, position });
        }
    }

    out
}

/// Number of distinct positions the groups would occupy under `method`.
/// Needed to address ranks from the bottom (e.g. "the 3 least popular"
/// as positions n-2..n).
pub fn position_count<K>(groups: &[(K, f64)], method: RankMethod) -> usize {
    match method {
        RankMethod::Ordinal => groups.len(),
        RankMethod::Dense => {
            let mut scores: Vec<u64> = groups.iter().map(|(_, s)| s.to_bits()).collect();
            scores.sort_unstable();
            scores.dedup();
            scores.len()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn counts() -> Vec<(String, f64)> {
        vec![
            ("Portraits".to_string(), 80.0),
            ("Nude".to_string(), 40.0),
            ("Landscape".to_string(), 60.0),
            ("Still Life".to_string(), 40.0),
            ("Abstract".to_string(), 10.0),
        ]
    }

    #[test]
    fn test_ordinal_positions_have_no_gaps() {
        let ranked = rank_filter(
            counts(),
            RankOrder::Descending,
            RankMethod::Ordinal,
            &Positions::all(),
        );

        let positions: Vec<usize> = ranked.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
        assert_eq!(ranked[0].key, "Portraits");
        assert_eq!(ranked[4].key, "Abstract");
    }

    #[test]
    fn test_ordinal_ties_break_on_key() {
        let ranked = rank_filter(
            counts(),
            RankOrder::Descending,
            RankMethod::Ordinal,
            &Positions::all(),
        );

        // "Nude" and "Still Life" tie on 40; key order decides
        assert_eq!(ranked[2].key, "Nude");
        assert_eq!(ranked[3].key, "Still Life");
    }

    #[test]
    fn test_dense_ties_share_position() {
        let ranked = rank_filter(
            counts(),
            RankOrder::Descending,
            RankMethod::Dense,
            &Positions::all(),
        );

        let positions: Vec<usize> = ranked.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 3, 4]);
    }

    #[test]
    fn test_top_n_filter() {
        let ranked = rank_filter(
            counts(),
            RankOrder::Descending,
            RankMethod::Ordinal,
            &Positions::top(2),
        );

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].key, "Portraits");
        assert_eq!(ranked[1].key, "Landscape");
    }

    #[test]
    fn test_ascending_order() {
        let ranked = rank_filter(
            counts(),
            RankOrder::Ascending,
            RankMethod::Ordinal,
            &Positions::single(1),
        );

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].key, "Abstract");
    }

    #[test]
    fn test_range_union_selects_head_and_tail() {
        let groups: Vec<(String, f64)> = (1..=30)
            .map(|i| (format!("style-{:02}", i), i as f64))
            .collect();

        let ranked = rank_filter(
            groups,
            RankOrder::Descending,
            RankMethod::Ordinal,
            &Positions::range(1, 3).and_range(21, 23),
        );

        let positions: Vec<usize> = ranked.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 21, 22, 23]);
    }

    #[test]
    fn test_position_count() {
        assert_eq!(position_count(&counts(), RankMethod::Ordinal), 5);
        assert_eq!(position_count(&counts(), RankMethod::Dense), 4);
    }

    #[test]
    fn test_empty_groups() {
        let ranked = rank_filter(
            Vec::<(String, f64)>::new(),
            RankOrder::Descending,
            RankMethod::Ordinal,
            &Positions::top(5),
        );
        assert!(ranked.is_empty());
    }
}
