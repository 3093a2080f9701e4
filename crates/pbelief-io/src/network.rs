//! Adjacency-matrix CSV parsing (spec §6.2).

use std::collections::BTreeMap;
use std::io::Read;

use eyre::{WrapErr, eyre};
use pbelief_core::{NodeId, Point};

/// Parse the single-algebra variant: each row `i` (1-indexed) is
/// `prior_i, a_{i,1}, …, a_{i,n}`. `a_{i,j} = 0` means no edge; `a_{i,j} ∈
/// (0, 1]` means edge `(i, j)` with that transmission probability. `a_{i,i}`
/// must be `0`.
pub fn load_single_algebra<R: Read>(
    reader: R,
) -> eyre::Result<(
    Vec<(NodeId, NodeId)>,
    BTreeMap<NodeId, Point>,
    BTreeMap<(NodeId, NodeId), Point>,
)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .from_reader(reader);

    let rows: Vec<Vec<f64>> = csv_reader
        .records()
        .enumerate()
        .map(|(i, record)| {
            let record = record.wrap_err_with(|| format!("failed to read row {i}"))?;
            record
                .iter()
                .map(|field| {
                    field
                        .trim()
                        .parse::<f64>()
                        .wrap_err_with(|| format!("row {i}: invalid number {field:?}"))
                })
                .collect::<eyre::Result<Vec<f64>>>()
        })
        .collect::<eyre::Result<Vec<Vec<f64>>>>()?;

    let n = rows.len();
    let mut edges = Vec::new();
    let mut priors = BTreeMap::new();
    let mut edge_probs = BTreeMap::new();

    for (i, row) in rows.iter().enumerate() {
        if row.len() != n + 1 {
            return Err(eyre!(
                "row {i} has {} fields, expected {} (prior + {n} adjacency columns)",
                row.len(),
                n + 1
            ));
        }
        let node = (i + 1) as NodeId;
        let prior = row[0];
        if !(0.0..=1.0).contains(&prior) {
            return Err(eyre!("row {i}: prior {prior} outside [0, 1]"));
        }
        priors.insert(node, Point(prior));

        for (j, &weight) in row[1..].iter().enumerate() {
            if i == j {
                if weight != 0.0 {
                    return Err(eyre!("row {i}: diagonal entry must be 0, got {weight}"));
                }
                continue;
            }
            if weight == 0.0 {
                continue;
            }
            if !(0.0..=1.0).contains(&weight) {
                return Err(eyre!("row {i}, column {j}: weight {weight} outside [0, 1]"));
            }
            let dst = (j + 1) as NodeId;
            edges.push((node, dst));
            edge_probs.insert((node, dst), Point(weight));
        }
    }

    Ok((edges, priors, edge_probs))
}

/// Parse the parametric variant's 0/1 adjacency matrix into an edge list.
/// Probabilities themselves live in a companion JSON file (see
/// [`crate::probabilities`]).
pub fn load_network_matrix<R: Read>(reader: R) -> eyre::Result<Vec<(NodeId, NodeId)>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .from_reader(reader);

    let rows: Vec<Vec<u8>> = csv_reader
        .records()
        .enumerate()
        .map(|(i, record)| {
            let record = record.wrap_err_with(|| format!("failed to read row {i}"))?;
            record
                .iter()
                .map(|field| {
                    field
                        .trim()
                        .parse::<u8>()
                        .wrap_err_with(|| format!("row {i}: expected 0 or 1, got {field:?}"))
                })
                .collect::<eyre::Result<Vec<u8>>>()
        })
        .collect::<eyre::Result<Vec<Vec<u8>>>>()?;

    let n = rows.len();
    let mut edges = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if row.len() != n {
            return Err(eyre!(
                "row {i} has {} columns, expected {n} (a square matrix)",
                row.len()
            ));
        }
        for (j, &bit) in row.iter().enumerate() {
            if i == j {
                if bit != 0 {
                    return Err(eyre!("row {i}: diagonal entry must be 0"));
                }
                continue;
            }
            if bit == 1 {
                edges.push(((i + 1) as NodeId, (j + 1) as NodeId));
            } else if bit != 0 {
                return Err(eyre!("row {i}, column {j}: expected 0 or 1, got {bit}"));
            }
        }
    }
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_algebra_simple_diamond() {
        let csv = "1,0,1,1,0\n\
                    1,0,0,0,1\n\
                    1,0,0,0,1\n\
                    1,0,0,0,0\n";
        let (edges, priors, edge_probs) = load_single_algebra(csv.as_bytes()).unwrap();
        assert_eq!(edges.len(), 4);
        assert!(edges.contains(&(1, 2)));
        assert!(edges.contains(&(2, 4)));
        assert_eq!(priors[&1].0, 1.0);
        assert_eq!(edge_probs[&(1, 2)].0, 1.0);
    }

    #[test]
    fn rejects_nonzero_diagonal() {
        let csv = "1,1\n";
        assert!(load_single_algebra(csv.as_bytes()).is_err());
    }

    #[test]
    fn network_matrix_parses_01() {
        let csv = "0,1\n0,0\n";
        let edges = load_network_matrix(csv.as_bytes()).unwrap();
        assert_eq!(edges, vec![(1, 2)]);
    }
}
