use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod aggregate;
mod edges;
mod errors;
mod hosts;
mod infer;
mod metadata;
mod sampler;
mod scorer;
mod tree;

#[derive(Debug, Parser)]
#[clap(name = "tnet-geo")]
#[clap(about = "Transmission network inference from host-labeled phylogenies.", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

const DEFAULT_SAMPLE_TIMES: usize = 1;

#[derive(Debug, Subcommand)]
enum Commands {
    /// Infer ancestral hosts and transmission edges from a rooted tree
    #[clap(arg_required_else_help = true)]
    Infer {
        /// input newick tree file, plain or gzipped
        #[clap(value_parser, required = true)]
        input_tree: PathBuf,

        /// output path for the labeled newick trees, one per sample
        #[clap(value_parser, required = true)]
        output_file: PathBuf,

        /// csv table with strain, date and country columns
        #[clap(short, long, value_parser)]
        metadata: Option<PathBuf>,

        /// random number generator seed
        #[clap(short, long, value_parser)]
        seed: Option<u64>,

        /// sample optimal solutions with back-transmission bias
        #[clap(short, long, value_parser, default_value_t = false)]
        biased_sampling: bool,

        /// number of independent sampling passes
        #[clap(short, long, value_parser, default_value_t = DEFAULT_SAMPLE_TIMES)]
        times: usize,

        /// restrict every draw to the highest-count hosts
        #[clap(short = 'x', long, value_parser, default_value_t = false)]
        maxprob: bool,

        /// also write a json report next to the output file
        #[clap(short, long, value_parser, default_value_t = false)]
        extradata: bool,
    },

    /// Group dated transmission edges from a json report by month
    #[clap(arg_required_else_help = true)]
    Edges {
        /// json report produced by `infer --extradata`
        #[clap(value_parser, required = true)]
        input_json: PathBuf,

        /// output csv with per-edge monthly counts
        #[clap(short = 'g', long, value_parser, required = true)]
        edge_date_group: PathBuf,
    },
}

fn main() {
    let args = Cli::parse();
    let result = match args.command {
        Commands::Infer {
            input_tree,
            output_file,
            metadata,
            seed,
            biased_sampling,
            times,
            maxprob,
            extradata,
        } => infer::start(
            &input_tree,
            &output_file,
            metadata.as_deref(),
            seed,
            biased_sampling,
            times,
            maxprob,
            extradata,
        ),

        Commands::Edges {
            input_json,
            edge_date_group,
        } => edges::start(&input_json, &edge_date_group),
    };

    if let Err(error) = result {
        eprintln!("Error: {}", error);
        std::process::exit(1);
    }
}
