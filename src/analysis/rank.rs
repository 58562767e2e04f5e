//! Ranking - order scored properties by total score

use crate::analysis::types::ScoredProperty;

/// The top `n` properties by `total_score`, descending. The sort is stable,
/// so records with equal scores keep their original input order; `n` past
/// the end of the collection simply returns everything.
pub fn top_n(mut records: Vec<ScoredProperty>, n: usize) -> Vec<ScoredProperty> {
    records.sort_by(|a, b| b.scores.total_score.total_cmp(&a.scores.total_score));
    records.truncate(n);
    records
}
