//! The JSON probability-spec companion to a parametric adjacency matrix
//! (spec §6.2): `{ "nodes": {"<id>": <P-spec>}, "edges": {"(i,j)": <P-spec>} }`.

use std::collections::BTreeMap;
use std::io::Read;

use eyre::{WrapErr, eyre};
use pbelief_core::{Interval, NodeId, Slice};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ProbabilitiesFile {
    nodes: BTreeMap<String, serde_json::Value>,
    edges: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct IntervalSpec {
    lower: f64,
    upper: f64,
}

#[derive(Debug, Deserialize)]
struct SliceSpec {
    values: Vec<f64>,
    weights: Vec<f64>,
}

fn parse_edge_key(key: &str) -> eyre::Result<(NodeId, NodeId)> {
    let trimmed = key.trim().trim_start_matches('(').trim_end_matches(')');
    let (u, v) = trimmed
        .split_once(',')
        .ok_or_else(|| eyre!("edge key {key:?} is not of the form \"(i,j)\""))?;
    let u = u
        .trim()
        .parse::<NodeId>()
        .wrap_err_with(|| format!("edge key {key:?}: invalid source id"))?;
    let v = v
        .trim()
        .parse::<NodeId>()
        .wrap_err_with(|| format!("edge key {key:?}: invalid destination id"))?;
    Ok((u, v))
}

/// Parse a probabilities JSON file into interval node priors and edge
/// probabilities.
pub fn load_interval_probabilities<R: Read>(
    reader: R,
) -> eyre::Result<(
    BTreeMap<NodeId, Interval>,
    BTreeMap<(NodeId, NodeId), Interval>,
)> {
    let file: ProbabilitiesFile =
        serde_json::from_reader(reader).wrap_err("failed to parse probabilities JSON")?;

    let nodes = file
        .nodes
        .into_iter()
        .map(|(id, value)| {
            let id: NodeId = id
                .parse()
                .wrap_err_with(|| format!("invalid node id {id:?}"))?;
            let spec: IntervalSpec = serde_json::from_value(value)
                .wrap_err_with(|| format!("node {id}: expected {{lower, upper}}"))?;
            Ok((id, Interval::new(spec.lower, spec.upper)))
        })
        .collect::<eyre::Result<BTreeMap<_, _>>>()?;

    let edges = file
        .edges
        .into_iter()
        .map(|(key, value)| {
            let edge = parse_edge_key(&key)?;
            let spec: IntervalSpec = serde_json::from_value(value)
                .wrap_err_with(|| format!("edge {key}: expected {{lower, upper}}"))?;
            Ok((edge, Interval::new(spec.lower, spec.upper)))
        })
        .collect::<eyre::Result<BTreeMap<_, _>>>()?;

    Ok((nodes, edges))
}

/// Parse a probabilities JSON file into slice node priors and edge
/// probabilities.
pub fn load_slice_probabilities<R: Read>(
    reader: R,
) -> eyre::Result<(BTreeMap<NodeId, Slice>, BTreeMap<(NodeId, NodeId), Slice>)> {
    let file: ProbabilitiesFile =
        serde_json::from_reader(reader).wrap_err("failed to parse probabilities JSON")?;

    let nodes = file
        .nodes
        .into_iter()
        .map(|(id, value)| {
            let id: NodeId = id
                .parse()
                .wrap_err_with(|| format!("invalid node id {id:?}"))?;
            let spec: SliceSpec = serde_json::from_value(value)
                .wrap_err_with(|| format!("node {id}: expected {{values, weights}}"))?;
            if spec.values.len() != spec.weights.len() {
                return Err(eyre!(
                    "node {id}: {} values but {} weights",
                    spec.values.len(),
                    spec.weights.len()
                ));
            }
            Ok((id, Slice::new(spec.values.into_iter().zip(spec.weights))))
        })
        .collect::<eyre::Result<BTreeMap<_, _>>>()?;

    let edges = file
        .edges
        .into_iter()
        .map(|(key, value)| {
            let edge = parse_edge_key(&key)?;
            let spec: SliceSpec = serde_json::from_value(value)
                .wrap_err_with(|| format!("edge {key}: expected {{values, weights}}"))?;
            if spec.values.len() != spec.weights.len() {
                return Err(eyre!(
                    "edge {key}: {} values but {} weights",
                    spec.values.len(),
                    spec.weights.len()
                ));
            }
            Ok((edge, Slice::new(spec.values.into_iter().zip(spec.weights))))
        })
        .collect::<eyre::Result<BTreeMap<_, _>>>()?;

    Ok((nodes, edges))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_interval_probabilities() {
        let json = r#"{
            "nodes": {"1": {"lower": 0.8, "upper": 0.9}},
            "edges": {"(1,2)": {"lower": 0.1, "upper": 0.2}}
        }"#;
        let (nodes, edges) = load_interval_probabilities(json.as_bytes()).unwrap();
        assert_eq!(nodes[&1], Interval::new(0.8, 0.9));
        assert_eq!(edges[&(1, 2)], Interval::new(0.1, 0.2));
    }

    #[test]
    fn parses_slice_probabilities() {
        let json = r#"{
            "nodes": {"1": {"values": [0.2, 0.8], "weights": [0.5, 0.5]}},
            "edges": {}
        }"#;
        let (nodes, _) = load_slice_probabilities(json.as_bytes()).unwrap();
        assert_eq!(nodes[&1].values.len(), 2);
    }

    #[test]
    fn rejects_mismatched_values_and_weights() {
        let json = r#"{
            "nodes": {"1": {"values": [0.2, 0.8], "weights": [1.0]}},
            "edges": {}
        }"#;
        assert!(load_slice_probabilities(json.as_bytes()).is_err());
    }

    #[test]
    fn rejects_malformed_edge_key() {
        assert!(parse_edge_key("1,2").is_ok());
        assert!(parse_edge_key("nonsense").is_err());
    }
}
