use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use eyre::WrapErr;
use pbelief_core::{SliceConfig, build_topology, decompose, propagate};
use pbelief_utils::stdio::get_input_reader;

/// Run exact belief propagation over a probabilistic DAG.
///
/// Reads a network (and, for the parametric algebras, a companion
/// probabilities file), decomposes its diamonds, propagates belief in
/// topological order, and writes the resulting node-id to probability map to
/// stdout as JSON.
#[derive(Debug, Parser)]
#[clap(version, verbatim_doc_comment)]
struct Args {
    /// Logging level
    #[clap(long, default_value_t = tracing::Level::INFO)]
    log_level: tracing::Level,

    /// Path to the adjacency-matrix network file (stdin if '-')
    #[clap(long)]
    network: PathBuf,

    /// Path to the JSON probability spec (required for `interval`/`slice`,
    /// ignored for `point`, since the single-algebra CSV carries its own
    /// probabilities inline)
    #[clap(long)]
    probabilities: Option<PathBuf>,

    /// Probability algebra to propagate with
    #[clap(long, value_enum, default_value_t = Algebra::Point)]
    algebra: Algebra,

    /// Slice consolidation tolerance (slice algebra only)
    #[clap(long, default_value_t = pbelief_core::algebra::slice::DEFAULT_TOLERANCE)]
    slice_tolerance: f64,

    /// Slice weight-prune threshold (slice algebra only)
    #[clap(long, default_value_t = pbelief_core::algebra::slice::DEFAULT_PRUNE_THRESHOLD)]
    slice_prune_threshold: f64,

    /// Cap on a diamond's conditioning-set size for the slice algebra
    /// (slice algebra only; point/interval are never capped)
    #[clap(long, default_value_t = pbelief_core::algebra::slice::DEFAULT_MAX_CONDITIONING_NODES)]
    slice_max_conditioning_nodes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Algebra {
    Point,
    Interval,
    Slice,
}

fn main() -> eyre::Result<()> {
    let use_color = std::io::stderr().is_terminal();
    if use_color {
        color_eyre::install()?;
    }

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(args.log_level.into())
        .with_env_var("PBELIEF_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(use_color)
        .with_writer(std::io::stderr)
        .init();

    let is_stdio = |p: &PathBuf| p.as_os_str() == "-";
    let network_path = Some(args.network.clone()).filter(|p| !is_stdio(p));
    let network_reader = get_input_reader(&network_path)?;

    let output = match args.algebra {
        Algebra::Point => {
            let (edges, priors, edge_probs) = pbelief_io::load_single_algebra(network_reader)
                .wrap_err("failed to parse single-algebra network")?;
            let topology = build_topology(&edges)?;
            let catalog = decompose(&topology, &priors)?;
            let beliefs = propagate(&topology, &catalog, &priors, &edge_probs)?;
            tracing::info!(nodes = topology.nodes.len(), "propagated point beliefs");
            pbelief_io::to_json(&beliefs)?
        }
        Algebra::Interval => {
            let probabilities_path = args
                .probabilities
                .ok_or_else(|| eyre::eyre!("--probabilities is required for the interval algebra"))?;
            let edges = pbelief_io::load_network_matrix(network_reader)
                .wrap_err("failed to parse network matrix")?;
            let probabilities_reader = get_input_reader(&Some(probabilities_path))?;
            let (priors, edge_probs) =
                pbelief_io::load_interval_probabilities(probabilities_reader)
                    .wrap_err("failed to parse interval probabilities")?;
            let topology = build_topology(&edges)?;
            let catalog = decompose(&topology, &priors)?;
            let beliefs = propagate(&topology, &catalog, &priors, &edge_probs)?;
            tracing::info!(nodes = topology.nodes.len(), "propagated interval beliefs");
            pbelief_io::to_json(&beliefs)?
        }
        Algebra::Slice => {
            let probabilities_path = args
                .probabilities
                .ok_or_else(|| eyre::eyre!("--probabilities is required for the slice algebra"))?;
            let edges = pbelief_io::load_network_matrix(network_reader)
                .wrap_err("failed to parse network matrix")?;
            let probabilities_reader = get_input_reader(&Some(probabilities_path))?;
            let (mut priors, mut edge_probs) =
                pbelief_io::load_slice_probabilities(probabilities_reader)
                    .wrap_err("failed to parse slice probabilities")?;
            let config = SliceConfig {
                tolerance: args.slice_tolerance,
                prune_threshold: args.slice_prune_threshold,
                max_conditioning_nodes: args.slice_max_conditioning_nodes,
            };
            // `set_config` stamps `config` onto each slice so it keeps being
            // used by every `and`/`add`/`sub` during propagation, not just
            // this initial pass.
            for slice in priors.values_mut() {
                slice.set_config(config);
            }
            for slice in edge_probs.values_mut() {
                slice.set_config(config);
            }
            let topology = build_topology(&edges)?;
            let catalog = decompose(&topology, &priors)?;
            let beliefs = propagate(&topology, &catalog, &priors, &edge_probs)?;
            tracing::info!(nodes = topology.nodes.len(), "propagated slice beliefs");
            pbelief_io::to_json(&beliefs)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
