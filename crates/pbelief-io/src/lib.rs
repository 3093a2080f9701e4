//! Adjacency-matrix and JSON ingestion, and canonical JSON output, for the
//! `pbelief-core` engine. The engine itself never touches a file; everything
//! here exists to make it exercisable end to end from the command line.

pub mod network;
pub mod output;
pub mod probabilities;

pub use network::{load_network_matrix, load_single_algebra};
pub use output::to_json;
pub use probabilities::{load_interval_probabilities, load_slice_probabilities};
