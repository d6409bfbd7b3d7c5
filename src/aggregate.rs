// Repeated sampling passes and the aggregate report. Every pass draws a
// root host, assigns all internal hosts, snapshots the labeled tree, and
// walks it once more to collect dated transmission edges and per-leaf
// exposure. The DP tables are shared read-only across passes; each pass owns
// its assignment vector copy.

use std::collections::{BTreeMap, BTreeSet};

use indicatif::ProgressBar;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::TnetError;
use crate::hosts::HostCatalog;
use crate::sampler;
use crate::scorer::ScoreTables;
use crate::tree::PhyloTree;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureSummary {
    /// Occurrences of each ancestor host across all passes.
    pub count: BTreeMap<String, u64>,
    /// Majority host; ties go to the host first seen at the leaves.
    pub country: String,
}

/// The three report sections. Key names and the `->` edge separator are an
/// external contract for downstream tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "Country of exposure")]
    pub exposure: BTreeMap<String, ExposureSummary>,
    /// Edge key -> number of passes containing the edge (each pass counts a
    /// key at most once).
    #[serde(rename = "Transmission edges")]
    pub transmission_edges: BTreeMap<String, u64>,
    /// Every edge occurrence from every pass with the parent node's date,
    /// in pass then preorder-traversal order.
    #[serde(rename = "Dated edges")]
    pub dated_edges: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy)]
pub struct SampleOptions {
    pub times: usize,
    pub biased: bool,
    pub maxprob: bool,
}

/// First host index reaching the maximal count, in catalog order.
pub(crate) fn majority_host(counts: &[u64]) -> usize {
    let mut best = 0;
    let mut best_count = 0;
    for (h, &c) in counts.iter().enumerate() {
        if c > best_count {
            best = h;
            best_count = c;
        }
    }
    best
}

/// Runs `opts.times` independent sampling passes over the precomputed
/// tables. Returns one host assignment snapshot per pass (host index per
/// node id) plus the aggregate report. `node_date` holds the resolved event
/// date per node id (empty when unknown).
pub fn run_samples(
    tree: &PhyloTree,
    catalog: &HostCatalog,
    tables: &ScoreTables,
    leaf_host: &[Option<usize>],
    node_date: &[String],
    opts: &SampleOptions,
    rng: &mut impl Rng,
) -> Result<(Vec<Vec<usize>>, Report), TnetError> {
    if opts.times == 0 {
        return Err(TnetError::Configuration(
            "sample count must be positive".to_string(),
        ));
    }

    let n = tree.nodes.len();
    let mut base = vec![0usize; n];
    for (node, host) in leaf_host.iter().enumerate() {
        if let Some(h) = host {
            base[node] = *h;
        }
    }
    let preorder = tree.preorder();

    let mut snapshots: Vec<Vec<usize>> = Vec::with_capacity(opts.times);
    let mut edge_totals: BTreeMap<String, u64> = BTreeMap::new();
    let mut dated_edges: Vec<(String, String)> = Vec::new();
    let mut exposure_counts = vec![vec![0u64; catalog.len()]; n];

    let progress = ProgressBar::new(opts.times as u64);
    for _ in 0..opts.times {
        let mut assignment = base.clone();
        assignment[tree.root] =
            sampler::choose_root_host(tables, tree.root, opts.maxprob, rng)?;
        sampler::assign_internal_hosts(
            tree,
            tables,
            &mut assignment,
            opts.biased,
            opts.maxprob,
            rng,
        )?;
        snapshots.push(assignment.clone());

        let mut pass_edges: BTreeSet<String> = BTreeSet::new();
        for &node in &preorder {
            for &child in &tree.nodes[node].children {
                if assignment[node] != assignment[child] {
                    let key = format!(
                        "{}->{}",
                        catalog.label(assignment[node]),
                        catalog.label(assignment[child])
                    );
                    dated_edges.push((key.clone(), node_date[node].clone()));
                    pass_edges.insert(key);
                }
                if tree.nodes[child].is_leaf() {
                    exposure_counts[child][assignment[node]] += 1;
                }
            }
        }
        for key in pass_edges {
            *edge_totals.entry(key).or_insert(0) += 1;
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    let mut exposure: BTreeMap<String, ExposureSummary> = BTreeMap::new();
    for &leaf in &tree.leaves() {
        let counts = &exposure_counts[leaf];
        let mut count_map: BTreeMap<String, u64> = BTreeMap::new();
        for (h, &c) in counts.iter().enumerate() {
            if c > 0 {
                count_map.insert(catalog.label(h).to_string(), c);
            }
        }
        let majority = catalog.label(majority_host(counts)).to_string();
        exposure.insert(
            tree.nodes[leaf].name.clone(),
            ExposureSummary {
                count: count_map,
                country: majority,
            },
        );
    }

    Ok((
        snapshots,
        Report {
            exposure,
            transmission_edges: edge_totals,
            dated_edges,
        },
    ))
}
