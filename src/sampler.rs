// Stochastic backtracking over the DP tables: one categorical draw for the
// root host, then a preorder pass drawing each internal child's host
// consistent with its parent and the cached optimal decomposition. All draws
// come from the single run-level generator, so draw order (preorder,
// left child before right child) is part of the reproducibility contract.

use rand::Rng;

use crate::errors::TnetError;
use crate::scorer::{Score, ScoreTables, INFEASIBLE};
use crate::tree::PhyloTree;

/// Draws an index from a non-negative integer weight vector. With `maxprob`
/// every entry below the vector's maximum is zeroed first, which restricts
/// the draw to the ties at the maximum (still a weighted draw among them,
/// i.e. uniform, rather than a deterministic pick).
pub fn draw_weighted(
    weights: &[u128],
    maxprob: bool,
    rng: &mut impl Rng,
) -> Result<usize, TnetError> {
    let mut weights = weights.to_vec();
    if maxprob {
        let max = weights.iter().copied().max().unwrap_or(0);
        for w in weights.iter_mut() {
            if *w != max {
                *w = 0;
            }
        }
    }
    let total = weights
        .iter()
        .fold(0u128, |acc, &w| acc.saturating_add(w));
    if total == 0 {
        return Err(TnetError::Domain(
            "all categorical weights are zero".to_string(),
        ));
    }
    let mut ticket = rng.gen_range(0..total);
    for (i, &w) in weights.iter().enumerate() {
        if ticket < w {
            return Ok(i);
        }
        ticket -= w;
    }
    Err(TnetError::Domain(
        "weighted draw exhausted the weight vector".to_string(),
    ))
}

/// Draws the root host among the hosts attaining the root's minimal score,
/// weighted by their solution counts.
pub fn choose_root_host(
    tables: &ScoreTables,
    root: usize,
    maxprob: bool,
    rng: &mut impl Rng,
) -> Result<usize, TnetError> {
    let scores = &tables.score[root];
    let min = scores.iter().copied().fold(INFEASIBLE, Score::min);
    let weights: Vec<u128> = scores
        .iter()
        .zip(&tables.count[root])
        .map(|(s, c)| if *s == min { *c } else { 0 })
        .collect();
    draw_weighted(&weights, maxprob, rng)
}

/// Child counts restricted to the hosts whose effective cost under the
/// parent's host equals the achieved sub-score recorded during scoring.
fn filtered_weights(
    scores: &[Score],
    counts: &[u128],
    parent_host: usize,
    achieved: Score,
) -> Vec<u128> {
    scores
        .iter()
        .zip(counts)
        .enumerate()
        .map(|(i, (s, c))| {
            let effective = if i == parent_host {
                *s
            } else {
                s.saturating_add(1)
            };
            if effective == achieved {
                *c
            } else {
                0
            }
        })
        .collect()
}

/// Assigns a host to every internal node in preorder. The root entry of
/// `assignment` must already hold the drawn root host; leaves are fixed and
/// never reassigned. With `biased` a child whose table puts the parent's
/// host within one change of its own minimum inherits the parent's host
/// outright, trading at most one extra change against a spurious
/// back-transmission.
pub fn assign_internal_hosts(
    tree: &PhyloTree,
    tables: &ScoreTables,
    assignment: &mut [usize],
    biased: bool,
    maxprob: bool,
    rng: &mut impl Rng,
) -> Result<(), TnetError> {
    for node in tree.preorder() {
        if tree.nodes[node].is_leaf() {
            continue;
        }
        let parent_host = assignment[node];
        for (side, &child) in tree.nodes[node].children.iter().enumerate() {
            if tree.nodes[child].is_leaf() {
                continue;
            }
            if biased {
                let child_scores = &tables.score[child];
                let min = child_scores.iter().copied().fold(INFEASIBLE, Score::min);
                if child_scores[parent_host] <= min.saturating_add(1) {
                    assignment[child] = parent_host;
                    continue;
                }
            }
            let achieved = if side == 0 {
                tables.left_achieved[node][parent_host]
            } else {
                tables.right_achieved[node][parent_host]
            };
            let weights = filtered_weights(
                &tables.score[child],
                &tables.count[child],
                parent_host,
                achieved,
            );
            assignment[child] = draw_weighted(&weights, maxprob, rng)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::tests::setup;
    use crate::scorer::ScoreTables;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn draw_respects_zero_weights() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let picked = draw_weighted(&[0, 3, 0, 5, 0], false, &mut rng).unwrap();
            assert!(picked == 1 || picked == 3);
        }
    }

    #[test]
    fn draw_is_deterministic_for_a_seed() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        let seq_a: Vec<usize> = (0..20)
            .map(|_| draw_weighted(&[1, 2, 3, 4], false, &mut a).unwrap())
            .collect();
        let seq_b: Vec<usize> = (0..20)
            .map(|_| draw_weighted(&[1, 2, 3, 4], false, &mut b).unwrap())
            .collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn maxprob_collapses_to_tied_maxima() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let picked = draw_weighted(&[2, 9, 4, 9, 1], true, &mut rng).unwrap();
            assert!(picked == 1 || picked == 3);
        }
    }

    #[test]
    fn zero_weights_are_a_domain_error() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            draw_weighted(&[0, 0, 0], false, &mut rng),
            Err(TnetError::Domain(_))
        ));
    }

    #[test]
    fn root_host_attains_the_minimal_score() {
        let (tree, catalog, leaf_host) = setup("((A_1,B_1),(C_1,A_2));");
        let tables = ScoreTables::compute(&tree, catalog.len(), &leaf_host).unwrap();
        let min = *tables.score[tree.root].iter().min().unwrap();
        for seed in 0..40 {
            let mut rng = StdRng::seed_from_u64(seed);
            let host = choose_root_host(&tables, tree.root, false, &mut rng).unwrap();
            assert_eq!(tables.score[tree.root][host], min);
        }
    }

    #[test]
    fn sampled_labelings_are_optimal() {
        // Every standard sampling pass must reproduce exactly the root's
        // minimal total change count.
        let (tree, catalog, leaf_host) = setup("(((A_1,B_1),C_1),(B_2,A_2));");
        let tables = ScoreTables::compute(&tree, catalog.len(), &leaf_host).unwrap();
        let min = *tables.score[tree.root].iter().min().unwrap();
        for seed in 0..40 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut assignment: Vec<usize> = leaf_host
                .iter()
                .map(|h| h.unwrap_or(0))
                .collect();
            assignment[tree.root] =
                choose_root_host(&tables, tree.root, false, &mut rng).unwrap();
            assign_internal_hosts(&tree, &tables, &mut assignment, false, false, &mut rng)
                .unwrap();
            let mut changes = 0u64;
            for node in tree.preorder() {
                for &child in &tree.nodes[node].children {
                    if assignment[node] != assignment[child] {
                        changes += 1;
                    }
                }
            }
            assert_eq!(changes, min, "non-optimal labeling at seed {}", seed);
        }
    }

    #[test]
    fn biased_child_inherits_near_optimal_parent_host() {
        let (tree, catalog, leaf_host) = setup("(((A_1,B_1),C_1),(B_2,A_2));");
        let tables = ScoreTables::compute(&tree, catalog.len(), &leaf_host).unwrap();
        for seed in 0..40 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut assignment: Vec<usize> = leaf_host
                .iter()
                .map(|h| h.unwrap_or(0))
                .collect();
            assignment[tree.root] =
                choose_root_host(&tables, tree.root, false, &mut rng).unwrap();
            assign_internal_hosts(&tree, &tables, &mut assignment, true, false, &mut rng)
                .unwrap();
            for node in tree.preorder() {
                if tree.nodes[node].is_leaf() {
                    continue;
                }
                let parent_host = assignment[node];
                for &child in &tree.nodes[node].children {
                    if tree.nodes[child].is_leaf() {
                        continue;
                    }
                    let child_scores = &tables.score[child];
                    let min = *child_scores.iter().min().unwrap();
                    if child_scores[parent_host] <= min + 1 {
                        assert_eq!(assignment[child], parent_host);
                    }
                }
            }
        }
    }
}
