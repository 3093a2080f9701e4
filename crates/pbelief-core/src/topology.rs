use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::{PdagError, PdagResult};

/// Dense node identifier. The engine does not renumber on the caller's
/// behalf; callers that have sparse or non-numeric ids are expected to map
/// them to a dense `u32` range before calling in (spec §3).
pub type NodeId = u32;

/// Per-node/per-edge structure derived from an edge list (spec §3, §4.A).
///
/// Reused both for the whole input graph and for diamond subgraphs (spec's
/// "Diamond subgraph" is exactly a `Topology` built from the subgraph's own
/// edge list: its `sources` are the fresh sub-sources, because the extraction
/// rule that "no edge ends at the fork root" makes the root a local source by
/// construction).
#[derive(Clone, Debug, Default)]
pub struct Topology {
    pub nodes: BTreeSet<NodeId>,
    pub edges: Vec<(NodeId, NodeId)>,
    pub outgoing: BTreeMap<NodeId, BTreeSet<NodeId>>,
    pub incoming: BTreeMap<NodeId, BTreeSet<NodeId>>,
    /// Reflexive: `u in ancestors(u)`.
    pub ancestors: BTreeMap<NodeId, BTreeSet<NodeId>>,
    /// Non-reflexive: `u not in descendants(u)`.
    pub descendants: BTreeMap<NodeId, BTreeSet<NodeId>>,
    /// Topological level order: all of level `k` may be processed once every
    /// set `< k` is complete.
    pub iteration_sets: Vec<Vec<NodeId>>,
    pub forks: BTreeSet<NodeId>,
    pub joins: BTreeSet<NodeId>,
    pub sources: BTreeSet<NodeId>,
    /// Level of each node, i.e. the index into `iteration_sets` it belongs to.
    pub level: BTreeMap<NodeId, usize>,
}

impl Topology {
    pub fn out_degree(&self, n: NodeId) -> usize {
        self.outgoing.get(&n).map_or(0, BTreeSet::len)
    }

    pub fn in_degree(&self, n: NodeId) -> usize {
        self.incoming.get(&n).map_or(0, BTreeSet::len)
    }

    pub fn parents(&self, n: NodeId) -> BTreeSet<NodeId> {
        self.incoming.get(&n).cloned().unwrap_or_default()
    }

    pub fn children(&self, n: NodeId) -> BTreeSet<NodeId> {
        self.outgoing.get(&n).cloned().unwrap_or_default()
    }

    pub fn ancestors_of(&self, n: NodeId) -> BTreeSet<NodeId> {
        self.ancestors.get(&n).cloned().unwrap_or_default()
    }

    pub fn descendants_of(&self, n: NodeId) -> BTreeSet<NodeId> {
        self.descendants.get(&n).cloned().unwrap_or_default()
    }

    pub fn level_of(&self, n: NodeId) -> usize {
        self.level.get(&n).copied().unwrap_or(0)
    }
}

/// Build a [`Topology`] from a raw edge list (spec §4.A).
///
/// Uses Kahn-style level BFS on in-degree zero. At dequeue of node `u` with
/// children `C`, propagates ancestor/descendant closures: `ancestors[c] |=
/// ancestors[u]` for each `c in C`, and for every ancestor `a` of `u`
/// (including `u` itself) `descendants[a] |= descendants[c] | {c}`.
pub fn build_topology(edges: &[(NodeId, NodeId)]) -> PdagResult<Topology> {
    let mut nodes = BTreeSet::new();
    let mut outgoing: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    let mut incoming: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();

    for &(src, dst) in edges {
        if src == dst {
            return Err(PdagError::SelfLoop(src));
        }
        nodes.insert(src);
        nodes.insert(dst);
        outgoing.entry(src).or_default().insert(dst);
        incoming.entry(dst).or_default().insert(src);
    }

    let mut ancestors: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    let mut descendants: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    for &n in &nodes {
        ancestors.entry(n).or_default().insert(n);
        descendants.entry(n).or_default();
    }

    let mut in_degree: BTreeMap<NodeId, usize> = nodes
        .iter()
        .map(|&n| (n, incoming.get(&n).map_or(0, BTreeSet::len)))
        .collect();

    let mut queue: VecDeque<NodeId> = in_degree
        .iter()
        .filter(|&(_, &deg)| deg == 0)
        .map(|(&n, _)| n)
        .collect();

    let mut iteration_sets: Vec<Vec<NodeId>> = Vec::new();
    let mut level: BTreeMap<NodeId, usize> = BTreeMap::new();
    let mut processed = 0usize;

    while !queue.is_empty() {
        let mut current_level: Vec<NodeId> = queue.drain(..).collect();
        current_level.sort_unstable();
        let level_idx = iteration_sets.len();

        for &u in &current_level {
            level.insert(u, level_idx);
            processed += 1;

            let children = outgoing.get(&u).cloned().unwrap_or_default();
            for &c in &children {
                let u_ancestors = ancestors.get(&u).cloned().unwrap_or_default();
                ancestors.entry(c).or_default().extend(u_ancestors.iter());

                let c_descendants_plus_c: BTreeSet<NodeId> = descendants
                    .get(&c)
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .chain(std::iter::once(c))
                    .collect();
                for &a in u_ancestors.iter().chain(std::iter::once(&u)) {
                    descendants
                        .entry(a)
                        .or_default()
                        .extend(c_descendants_plus_c.iter());
                }

                let deg = in_degree.get_mut(&c).expect("child was registered above");
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(c);
                }
            }
        }

        iteration_sets.push(current_level);
    }

    if processed != nodes.len() {
        let stuck = nodes
            .iter()
            .find(|n| !level.contains_key(n))
            .copied()
            .unwrap_or_default();
        return Err(PdagError::Cycle(stuck));
    }

    let forks: BTreeSet<NodeId> = nodes
        .iter()
        .copied()
        .filter(|&n| outgoing.get(&n).map_or(0, BTreeSet::len) > 1)
        .collect();
    let joins: BTreeSet<NodeId> = nodes
        .iter()
        .copied()
        .filter(|&n| incoming.get(&n).map_or(0, BTreeSet::len) > 1)
        .collect();
    let sources: BTreeSet<NodeId> = nodes
        .iter()
        .copied()
        .filter(|&n| incoming.get(&n).map_or(0, BTreeSet::len) == 0)
        .collect();

    Ok(Topology {
        nodes,
        edges: edges.to_vec(),
        outgoing,
        incoming,
        ancestors,
        descendants,
        iteration_sets,
        forks,
        joins,
        sources,
        level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_chain() {
        let topo = build_topology(&[(1, 2), (2, 3), (3, 4)]).unwrap();
        assert_eq!(topo.iteration_sets, vec![vec![1], vec![2], vec![3], vec![4]]);
        assert_eq!(topo.sources, BTreeSet::from([1]));
        assert!(topo.forks.is_empty());
        assert!(topo.joins.is_empty());
        assert_eq!(topo.ancestors_of(4), BTreeSet::from([1, 2, 3, 4]));
        assert_eq!(topo.descendants_of(1), BTreeSet::from([2, 3, 4]));
    }

    #[test]
    fn simple_diamond() {
        let topo = build_topology(&[(1, 2), (1, 3), (2, 4), (3, 4)]).unwrap();
        assert_eq!(topo.forks, BTreeSet::from([1]));
        assert_eq!(topo.joins, BTreeSet::from([4]));
        assert_eq!(topo.sources, BTreeSet::from([1]));
        // Level invariant: every edge (u, v) has level(u) < level(v).
        for &(u, v) in &topo.edges {
            assert!(topo.level_of(u) < topo.level_of(v));
        }
    }

    #[test]
    fn ancestor_descendant_duality() {
        let topo = build_topology(&[(1, 2), (1, 3), (2, 4), (3, 4), (4, 5)]).unwrap();
        for &u in &topo.nodes {
            for &v in &topo.nodes {
                assert_eq!(
                    topo.ancestors_of(v).contains(&u),
                    topo.descendants_of(u).contains(&v)
                );
            }
        }
    }

    #[test]
    fn self_loop_is_fatal() {
        let err = build_topology(&[(1, 1)]).unwrap_err();
        assert_eq!(err, PdagError::SelfLoop(1));
    }

    #[test]
    fn cycle_is_fatal() {
        let err = build_topology(&[(1, 2), (2, 3), (3, 1)]).unwrap_err();
        assert!(matches!(err, PdagError::Cycle(_)));
    }

    #[test]
    fn nested_diamond_levels() {
        let topo = build_topology(&[
            (1, 2),
            (1, 3),
            (2, 4),
            (3, 4),
            (4, 5),
            (4, 6),
            (5, 7),
            (6, 7),
        ])
        .unwrap();
        assert_eq!(topo.forks, BTreeSet::from([1, 4]));
        assert_eq!(topo.joins, BTreeSet::from([4, 7]));
        for &(u, v) in &topo.edges {
            assert!(topo.level_of(u) < topo.level_of(v));
        }
    }
}
