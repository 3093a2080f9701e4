use std::cmp::Reverse;
use std::collections::BTreeSet;

use super::extract::build_subgraph_with_promotion;
use super::AncestorGroup;
use crate::error::PdagResult;
use crate::topology::{NodeId, Topology};

/// Iterate subsumption and overlap-merge passes to fixpoint (spec §4.B.3).
///
/// Returns the cleaned-up group list for one join. An empty result means the
/// join's candidates fully cancelled each other out -- callers treat that as
/// "no diamonds at this join", not an error.
pub(super) fn cleanup_groups(
    topology: &Topology,
    mut groups: Vec<AncestorGroup>,
    join_node: NodeId,
) -> PdagResult<Vec<AncestorGroup>> {
    loop {
        let before_subsumption = groups.len();
        groups = subsumption_filter(groups);

        let merged = overlap_merge(topology, groups, join_node)?;
        let changed_by_merge = merged.0;
        groups = merged.1;

        if !changed_by_merge && groups.len() == before_subsumption {
            return Ok(groups);
        }
    }
}

/// Drop any group whose edge set is a subset of another's. Exact duplicates
/// are broken by keeping the lower index, so the result is deterministic.
fn subsumption_filter(groups: Vec<AncestorGroup>) -> Vec<AncestorGroup> {
    let edge_sets: Vec<BTreeSet<(NodeId, NodeId)>> = groups
        .iter()
        .map(|g| g.subgraph.edges.iter().copied().collect())
        .collect();

    let mut keep = vec![true; groups.len()];
    for i in 0..groups.len() {
        if !keep[i] {
            continue;
        }
        for j in 0..groups.len() {
            if i == j || !keep[j] {
                continue;
            }
            let subset = edge_sets[i].is_subset(&edge_sets[j]);
            let proper = edge_sets[i].len() < edge_sets[j].len();
            let tie_break_duplicate = edge_sets[i] == edge_sets[j] && i > j;
            if subset && (proper || tie_break_duplicate) {
                keep[i] = false;
                break;
            }
        }
    }

    groups
        .into_iter()
        .zip(keep)
        .filter_map(|(g, k)| k.then_some(g))
        .collect()
}

/// Find the first pair of groups sharing a non-join relevant node and merge
/// them into one group rooted at their deepest shared ancestor. Returns
/// whether any merge happened, so the caller knows to keep iterating.
fn overlap_merge(
    topology: &Topology,
    groups: Vec<AncestorGroup>,
    join_node: NodeId,
) -> PdagResult<(bool, Vec<AncestorGroup>)> {
    for i in 0..groups.len() {
        for j in (i + 1)..groups.len() {
            let nodes_i: &BTreeSet<NodeId> = &groups[i].subgraph.nodes;
            let nodes_j: &BTreeSet<NodeId> = &groups[j].subgraph.nodes;
            let shared: Vec<NodeId> = nodes_i
                .intersection(nodes_j)
                .copied()
                .filter(|&n| n != join_node)
                .collect();
            if shared.is_empty() {
                continue;
            }

            let new_root = *shared
                .iter()
                .max_by_key(|&&n| (topology.level_of(n), Reverse(n)))
                .expect("shared is non-empty");

            let mut roots = BTreeSet::from([new_root]);
            let influenced_parents: BTreeSet<NodeId> = groups[i]
                .influenced_parents
                .union(&groups[j].influenced_parents)
                .copied()
                .collect();
            let subgraph =
                build_subgraph_with_promotion(topology, &mut roots, &influenced_parents, join_node)?;

            let merged = AncestorGroup {
                roots,
                influenced_parents,
                subgraph,
            };

            let mut rest: Vec<AncestorGroup> = groups
                .into_iter()
                .enumerate()
                .filter_map(|(k, g)| (k != i && k != j).then_some(g))
                .collect();
            rest.push(merged);
            return Ok((true, rest));
        }
    }
    Ok((false, groups))
}
