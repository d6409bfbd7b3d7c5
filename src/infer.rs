// End-to-end pipeline for the `infer` subcommand: read the rooted tree,
// resolve leaf hosts and node dates, run the parsimony DP once, then draw
// the requested number of labeled samples and write the outputs.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::aggregate::{self, SampleOptions};
use crate::errors::TnetError;
use crate::hosts::HostCatalog;
use crate::metadata::Metadata;
use crate::scorer::ScoreTables;
use crate::tree::{self, PhyloTree};

/// Per-node inputs resolved before scoring: the leaf host indices and the
/// event date for every node (empty when unknown).
struct ResolvedInputs {
    catalog: HostCatalog,
    leaf_host: Vec<Option<usize>>,
    node_date: Vec<String>,
}

/// Resolves each leaf's host label and each node's event date. With a
/// metadata table the leaf's country overrides its label and both lookups
/// are strict; without one the label is the leaf name's prefix before the
/// first '_' and dates stay empty. Internal-node dates resolve leniently by
/// the node's own newick label.
fn resolve_inputs(
    tree: &PhyloTree,
    metadata: Option<&Metadata>,
) -> Result<ResolvedInputs, TnetError> {
    let leaves = tree.leaves();
    let mut labels: Vec<String> = Vec::with_capacity(leaves.len());
    for &leaf in &leaves {
        let strain = &tree.nodes[leaf].name;
        let label = match metadata {
            Some(metadata) => metadata
                .countries
                .get(strain)
                .ok_or_else(|| {
                    TnetError::Lookup(format!("strain {:?} has no country in metadata", strain))
                })?
                .clone(),
            None => strain.split('_').next().unwrap_or(strain).to_string(),
        };
        labels.push(label);
    }
    let catalog = HostCatalog::build(&labels)?;

    let mut leaf_host = vec![None; tree.nodes.len()];
    for (&leaf, label) in leaves.iter().zip(&labels) {
        leaf_host[leaf] = catalog.index_of(label);
    }

    let mut node_date = vec![String::new(); tree.nodes.len()];
    if let Some(metadata) = metadata {
        for (node, entry) in tree.nodes.iter().enumerate() {
            if entry.is_leaf() {
                node_date[node] = metadata
                    .dates
                    .get(&entry.name)
                    .ok_or_else(|| {
                        TnetError::Lookup(format!(
                            "strain {:?} has no date in metadata",
                            entry.name
                        ))
                    })?
                    .clone();
            } else if let Some(date) = metadata.dates.get(&entry.name) {
                node_date[node] = date.clone();
            }
        }
    }

    Ok(ResolvedInputs {
        catalog,
        leaf_host,
        node_date,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn start(
    input_tree: &Path,
    output_file: &Path,
    metadata_path: Option<&Path>,
    seed: Option<u64>,
    biased_sampling: bool,
    times: usize,
    maxprob: bool,
    extradata: bool,
) -> Result<(), TnetError> {
    println!("Reading tree from {:?}", input_tree);
    let tree = tree::read_newick_file(input_tree)?;
    tree.validate_bifurcating()?;

    let metadata = match metadata_path {
        Some(path) => Some(Metadata::from_path(path)?),
        None => None,
    };
    let inputs = resolve_inputs(&tree, metadata.as_ref())?;
    println!(
        "{} leaves, {} hosts: {}",
        tree.leaves().len(),
        inputs.catalog.len(),
        inputs.catalog.labels().join(", ")
    );

    let tables = ScoreTables::compute(&tree, inputs.catalog.len(), &inputs.leaf_host)?;
    let root_score = tables.score[tree.root]
        .iter()
        .min()
        .copied()
        .unwrap_or_default();
    println!("Minimal parsimony score at the root: {}", root_score);

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let opts = SampleOptions {
        times,
        biased: biased_sampling,
        maxprob,
    };
    println!("Sampling {} labeled tree(s)", times);
    let (snapshots, report) = aggregate::run_samples(
        &tree,
        &inputs.catalog,
        &tables,
        &inputs.leaf_host,
        &inputs.node_date,
        &opts,
        &mut rng,
    )?;

    let mut out = BufWriter::new(File::create(output_file)?);
    for assignment in &snapshots {
        let labels: Vec<String> = assignment
            .iter()
            .map(|&h| inputs.catalog.label(h).to_string())
            .collect();
        writeln!(out, "{}", tree.to_newick(&labels))?;
    }
    out.flush()?;
    println!("Wrote {} labeled trees to {:?}", snapshots.len(), output_file);

    if extradata {
        let mut json_path = OsString::from(output_file.as_os_str());
        json_path.push(".json");
        let json_file = File::create(&json_path)?;
        serde_json::to_writer(BufWriter::new(json_file), &report)?;
        println!("Wrote report to {:?}", json_path);
    }
    Ok(())
}
