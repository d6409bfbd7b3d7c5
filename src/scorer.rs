// Weighted-parsimony DP over host labels (Sankoff recurrence with solution
// counting). One postorder pass fills, for every node and candidate host,
// the minimal number of host changes in its subtree and the number of
// distinct optimal subtree labelings. The per-child achieved sub-scores are
// cached so sampling can replay the same decomposition without recomputing.

use crate::errors::TnetError;
use crate::tree::PhyloTree;

pub type Score = u64;

/// Infeasible sentinel. Kept well below `u64::MAX` so the recurrence's small
/// additive adjustments can never wrap; all additions saturate regardless.
pub const INFEASIBLE: Score = u64::MAX / 4;

#[derive(Debug, Clone)]
pub struct ScoreTables {
    /// `score[node][h]`: minimal subtree changes with `node` fixed to host h.
    pub score: Vec<Vec<Score>>,
    /// `count[node][h]`: optimal subtree labelings with `node` fixed to h.
    /// Products saturate at `u128::MAX` on pathologically degenerate trees.
    pub count: Vec<Vec<u128>>,
    /// For internal nodes, the score the left child contributed under each
    /// candidate host of this node; empty for leaves.
    pub left_achieved: Vec<Vec<Score>>,
    pub right_achieved: Vec<Vec<Score>>,
}

/// Child summary for the O(|H|) recurrence: the child's global minimum and
/// the total solution count over hosts attaining it.
fn child_summary(score: &[Score], count: &[u128]) -> (Score, u128) {
    let min = score.iter().copied().fold(INFEASIBLE, Score::min);
    let count_at_min = score
        .iter()
        .zip(count)
        .filter(|(s, _)| **s == min)
        .fold(0u128, |acc, (_, c)| acc.saturating_add(*c));
    (min, count_at_min)
}

/// `min over h' of score[h'] + (0 if h' == parent_host else 1)`.
pub fn achieved_score(score: &[Score], min: Score, parent_host: usize) -> Score {
    score[parent_host].min(min.saturating_add(1))
}

/// Total count over the hosts attaining `achieved_score`. With the child's
/// own entry at the minimum only the match contributes; one above the
/// minimum it ties with every host at the minimum; otherwise only the hosts
/// at the minimum remain.
fn count_at_achieved(score: &[Score], count: &[u128], min: Score, count_at_min: u128, parent_host: usize) -> u128 {
    let own = score[parent_host];
    if own == min {
        count[parent_host]
    } else if own == min.saturating_add(1) {
        count[parent_host].saturating_add(count_at_min)
    } else {
        count_at_min
    }
}

impl ScoreTables {
    /// Fills all tables in one postorder pass. Pure function of the tree and
    /// the fixed leaf hosts; the result is shared read-only by every
    /// subsequent sampling pass.
    pub fn compute(
        tree: &PhyloTree,
        n_hosts: usize,
        leaf_host: &[Option<usize>],
    ) -> Result<ScoreTables, TnetError> {
        tree.validate_bifurcating()?;
        if n_hosts == 0 {
            return Err(TnetError::Configuration(
                "cannot score against an empty host catalog".to_string(),
            ));
        }

        let n = tree.nodes.len();
        let mut tables = ScoreTables {
            score: vec![Vec::new(); n],
            count: vec![Vec::new(); n],
            left_achieved: vec![Vec::new(); n],
            right_achieved: vec![Vec::new(); n],
        };

        for node in tree.postorder() {
            if tree.nodes[node].is_leaf() {
                let own = leaf_host[node].ok_or_else(|| {
                    TnetError::Configuration(format!(
                        "leaf {} has no resolved host",
                        tree.nodes[node].name
                    ))
                })?;
                let mut score = vec![INFEASIBLE; n_hosts];
                let mut count = vec![0u128; n_hosts];
                score[own] = 0;
                count[own] = 1;
                tables.score[node] = score;
                tables.count[node] = count;
            } else {
                let left = tree.nodes[node].children[0];
                let right = tree.nodes[node].children[1];
                let (l_min, l_count_at_min) =
                    child_summary(&tables.score[left], &tables.count[left]);
                let (r_min, r_count_at_min) =
                    child_summary(&tables.score[right], &tables.count[right]);
                if l_min >= INFEASIBLE || r_min >= INFEASIBLE {
                    return Err(TnetError::Domain(format!(
                        "no feasible host below internal node {}",
                        node
                    )));
                }

                let mut score = Vec::with_capacity(n_hosts);
                let mut count = Vec::with_capacity(n_hosts);
                let mut left_achieved = Vec::with_capacity(n_hosts);
                let mut right_achieved = Vec::with_capacity(n_hosts);
                for h in 0..n_hosts {
                    let la = achieved_score(&tables.score[left], l_min, h);
                    let ra = achieved_score(&tables.score[right], r_min, h);
                    let lc = count_at_achieved(
                        &tables.score[left],
                        &tables.count[left],
                        l_min,
                        l_count_at_min,
                        h,
                    );
                    let rc = count_at_achieved(
                        &tables.score[right],
                        &tables.count[right],
                        r_min,
                        r_count_at_min,
                        h,
                    );
                    score.push(la.saturating_add(ra));
                    count.push(lc.saturating_mul(rc));
                    left_achieved.push(la);
                    right_achieved.push(ra);
                }
                tables.score[node] = score;
                tables.count[node] = count;
                tables.left_achieved[node] = left_achieved;
                tables.right_achieved[node] = right_achieved;
            }
        }
        Ok(tables)
    }
}
