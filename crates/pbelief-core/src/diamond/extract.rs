use std::collections::BTreeSet;

use crate::error::{PdagError, PdagResult};
use crate::topology::{NodeId, Topology, build_topology};

/// Build the self-contained subgraph for one candidate group (spec §4.B.2).
///
/// `roots` are the subgraph's designated sources (the fork root plus any
/// sub-forks promoted during [`build_subgraph_with_promotion`]); no edge in
/// the subgraph ends at a root, which is what makes them local sources once
/// the subgraph's own topology is derived.
pub(super) fn extract_subgraph(
    topology: &Topology,
    roots: &BTreeSet<NodeId>,
    influenced_parents: &BTreeSet<NodeId>,
    join_node: NodeId,
) -> PdagResult<Topology> {
    // 1 + 2: base nodes plus the intermediate nodes on a root-to-parent path.
    let mut relevant: BTreeSet<NodeId> = roots.iter().chain(influenced_parents.iter()).copied().collect();
    relevant.insert(join_node);
    for &p in influenced_parents {
        let ancestors_p = topology.ancestors_of(p);
        for &r in roots {
            let descendants_r = topology.descendants_of(r);
            relevant.extend(descendants_r.intersection(&ancestors_p).copied());
        }
    }

    // 4 (+ B.3's final pass, folded in since it's the same rule): every relevant
    // node other than a root or the join pulls in its outside-the-subgraph
    // incoming edges, and the far end becomes a fresh sub-source.
    let intermediate: Vec<NodeId> = relevant
        .iter()
        .copied()
        .filter(|n| !roots.contains(n) && *n != join_node)
        .collect();
    let mut extra_edges: Vec<(NodeId, NodeId)> = Vec::new();
    for r in intermediate {
        for &src in topology.incoming.get(&r).into_iter().flatten() {
            relevant.insert(src);
            extra_edges.push((src, r));
        }
    }

    // 3: edges with both endpoints relevant, none ending at a root.
    let mut edges: Vec<(NodeId, NodeId)> = topology
        .edges
        .iter()
        .copied()
        .filter(|&(u, v)| relevant.contains(&u) && relevant.contains(&v) && !roots.contains(&v))
        .collect();
    for e in extra_edges {
        if !edges.contains(&e) {
            edges.push(e);
        }
    }
    edges.retain(|&(_, v)| !roots.contains(&v));
    edges.sort_unstable();
    edges.dedup();

    build_topology(&edges).map_err(|e| match e {
        PdagError::Cycle(_) | PdagError::SelfLoop(_) => PdagError::InvariantViolation(format!(
            "diamond subgraph at join {join_node} failed to build: {e}"
        )),
        other => other,
    })
}

/// Find a node to promote into `roots`: a non-global-source, non-root ancestor
/// shared by at least one fresh sub-source and another source-like node of the
/// subgraph (spec §4.B.2 step 5 and §4.B.3's shared-subsource promotion --
/// the same mechanism, generalized to apply uniformly).
///
/// Ties on level are broken by smallest node id (spec §9, open question ii).
pub(super) fn find_promotion(
    topology: &Topology,
    roots: &BTreeSet<NodeId>,
    subgraph: &Topology,
) -> Option<NodeId> {
    let candidates: Vec<NodeId> = subgraph
        .sources
        .iter()
        .copied()
        .filter(|n| !roots.contains(n))
        .collect();
    if candidates.is_empty() {
        return None;
    }

    let reference: Vec<NodeId> = roots.iter().copied().chain(candidates.iter().copied()).collect();
    let mut best: Option<NodeId> = None;

    for i in 0..reference.len() {
        for j in (i + 1)..reference.len() {
            let x = reference[i];
            let y = reference[j];
            if roots.contains(&x) && roots.contains(&y) {
                continue;
            }
            let shared: BTreeSet<NodeId> = topology
                .ancestors_of(x)
                .intersection(&topology.ancestors_of(y))
                .copied()
                .filter(|n| !topology.sources.contains(n) && !roots.contains(n))
                .collect();
            for &node in &shared {
                let level = topology.level_of(node);
                best = Some(match best {
                    Some(current) if (topology.level_of(current), current) <= (level, node) => current,
                    _ => node,
                });
            }
        }
    }
    best
}

/// Build a group's subgraph, iterating promotion to fixpoint (spec §4.B.2
/// step 5 / §4.B.3 bullet 3): every time a promotion is found, the promoted
/// node joins `roots` and the subgraph is rebuilt from scratch around the new
/// root set.
pub(super) fn build_subgraph_with_promotion(
    topology: &Topology,
    roots: &mut BTreeSet<NodeId>,
    influenced_parents: &BTreeSet<NodeId>,
    join_node: NodeId,
) -> PdagResult<Topology> {
    loop {
        let subgraph = extract_subgraph(topology, roots, influenced_parents, join_node)?;
        match find_promotion(topology, roots, &subgraph) {
            Some(node) => {
                roots.insert(node);
            }
            None => return Ok(subgraph),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn simple_diamond_subgraph() {
        let topo = build_topology(&[(1, 2), (1, 3), (2, 4), (3, 4)]).unwrap();
        let roots = BTreeSet::from([1]);
        let influenced = BTreeSet::from([2, 3]);
        let sg = extract_subgraph(&topo, &roots, &influenced, 4).unwrap();
        assert_eq!(sg.nodes, BTreeSet::from([1, 2, 3, 4]));
        assert_eq!(sg.sources, BTreeSet::from([1]));
    }

    #[test]
    fn external_source_becomes_fresh_subsource() {
        // 0 -> 2 (external feed into an intermediate node), 1 -> 2, 1 -> 3, 2 -> 4, 3 -> 4
        let topo = build_topology(&[(0, 2), (1, 2), (1, 3), (2, 4), (3, 4)]).unwrap();
        let roots = BTreeSet::from([1]);
        let influenced = BTreeSet::from([2, 3]);
        let sg = extract_subgraph(&topo, &roots, &influenced, 4).unwrap();
        assert!(sg.nodes.contains(&0));
        assert!(sg.sources.contains(&0));
        assert!(sg.sources.contains(&1));
    }

    #[test]
    fn no_edge_ends_at_root() {
        let topo = build_topology(&[(1, 2), (1, 3), (2, 4), (3, 4), (5, 1)]).unwrap();
        let roots = BTreeSet::from([1]);
        let influenced = BTreeSet::from([2, 3]);
        let sg = extract_subgraph(&topo, &roots, &influenced, 4).unwrap();
        // 5 -> 1 exists in the main graph but must not appear in the subgraph.
        assert!(!sg.edges.contains(&(5, 1)));
        assert!(!sg.nodes.contains(&5));
    }
}
