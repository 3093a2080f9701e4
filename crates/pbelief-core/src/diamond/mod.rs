//! Diamond decomposition (spec §4.B).
//!
//! A "diamond" is a fork node and a join node connected by two or more
//! paths that share the fork but are otherwise distinct, which breaks the
//! independence assumption the plain series/parallel combination in
//! [`crate::algebra::inclusion_exclusion`] relies on. This module finds every
//! such structure and carves out a self-contained subgraph for each one, so
//! [`crate::propagate`] can evaluate it exactly by conditioning instead of
//! naively combining its parents as if they were independent.

mod cleanup;
mod extract;

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::algebra::Probability;
use crate::error::{PdagError, PdagResult};
use crate::topology::{NodeId, Topology};
use cleanup::cleanup_groups;
use extract::build_subgraph_with_promotion;

/// One fork (possibly promoted to include sub-forks) and the self-contained
/// subgraph it spans up to a single join.
#[derive(Clone, Debug)]
pub struct AncestorGroup {
    /// The fork plus any nodes promoted into the root set during cleanup.
    pub roots: BTreeSet<NodeId>,
    /// The join's parents whose paths back to `roots` motivated this group.
    pub influenced_parents: BTreeSet<NodeId>,
    /// The diamond's own self-contained topology, conditioning nodes included.
    pub subgraph: Topology,
}

/// Every diamond rooted at a single join, plus the join's parents that are
/// *not* part of any diamond and so combine as ordinary independent edges.
#[derive(Clone, Debug)]
pub struct DiamondsAtJoin {
    pub join: NodeId,
    pub groups: Vec<AncestorGroup>,
    pub non_diamond_parents: BTreeSet<NodeId>,
}

/// The full decomposition result: one entry per join that has at least one
/// incoming diamond. Joins with no diamonds are absent, not present-and-empty.
#[derive(Clone, Debug, Default)]
pub struct DiamondCatalog {
    pub by_join: BTreeMap<NodeId, DiamondsAtJoin>,
}

impl DiamondCatalog {
    pub fn diamonds_at(&self, join: NodeId) -> Option<&DiamondsAtJoin> {
        self.by_join.get(&join)
    }
}

/// Find and carve out every diamond in `topology` (spec §4.B.1-3).
///
/// `node_priors` is used only to prune deterministic sources: a source whose
/// prior is definitely `0` or `1` contributes no genuine branching and is
/// skipped when discovering fork candidates (spec §4.B.1 step 1). A
/// non-source fork with a deterministic prior is *not* pruned -- its own
/// reachedness still depends on its upstream edges, so it remains a real
/// conditioning node even though its prior is `0`/`1`.
pub fn decompose<P: Probability>(
    topology: &Topology,
    node_priors: &BTreeMap<NodeId, P>,
) -> PdagResult<DiamondCatalog> {
    let mut by_join = BTreeMap::new();

    for &join in &topology.joins {
        let parents = topology.parents(join);

        // FA(p): the forks ancestral to each parent of the join.
        let fork_ancestors_of: BTreeMap<NodeId, BTreeSet<NodeId>> = parents
            .iter()
            .map(|&p| {
                let fa: BTreeSet<NodeId> = topology
                    .ancestors_of(p)
                    .intersection(&topology.forks)
                    .copied()
                    .filter(|f| !(topology.sources.contains(f) && is_deterministic(*f, node_priors)))
                    .collect();
                (p, fa)
            })
            .collect();

        // inf(f): invert to the join-parents each fork influences.
        let mut influenced_by_fork: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        for (&p, forks) in &fork_ancestors_of {
            for &f in forks {
                influenced_by_fork.entry(f).or_default().insert(p);
            }
        }

        // A fork is a genuine diamond candidate at this join only if it
        // influences two or more of the join's parents.
        let mut candidates: Vec<AncestorGroup> = Vec::new();
        for (&fork, influenced_parents) in &influenced_by_fork {
            if influenced_parents.len() < 2 {
                continue;
            }
            let mut roots = BTreeSet::from([fork]);
            let subgraph =
                build_subgraph_with_promotion(topology, &mut roots, influenced_parents, join)?;
            candidates.push(AncestorGroup {
                roots,
                influenced_parents: influenced_parents.clone(),
                subgraph,
            });
        }

        if candidates.is_empty() {
            continue;
        }

        let groups = cleanup_groups(topology, candidates, join)?;
        if groups.is_empty() {
            return Err(PdagError::InvariantViolation(format!(
                "diamond cleanup at join {join} eliminated every candidate group"
            )));
        }

        // overlap_merge folds together any two groups sharing a relevant node,
        // which subsumes spec §4.C.1 step 3's narrower "shares a direct edge
        // into the join" rule: if groups i and j both carried an edge (x, join),
        // x would be a relevant node of both subgraphs and the merge would have
        // already fired. This checks that guarantee holds rather than trusting it.
        for (i, gi) in groups.iter().enumerate() {
            for gj in &groups[i + 1..] {
                if !gi.influenced_parents.is_disjoint(&gj.influenced_parents) {
                    return Err(PdagError::InvariantViolation(format!(
                        "diamond cleanup at join {join} left two groups sharing a parent"
                    )));
                }
            }
        }

        let covered: BTreeSet<NodeId> = groups
            .iter()
            .flat_map(|g| g.influenced_parents.iter().copied())
            .collect();
        let non_diamond_parents: BTreeSet<NodeId> =
            parents.difference(&covered).copied().collect();

        by_join.insert(
            join,
            DiamondsAtJoin {
                join,
                groups,
                non_diamond_parents,
            },
        );
    }

    Ok(DiamondCatalog { by_join })
}

fn is_deterministic<P: Probability>(node: NodeId, node_priors: &BTreeMap<NodeId, P>) -> bool {
    node_priors
        .get(&node)
        .is_some_and(|p| p.is_zero() || p.is_one())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::Point;
    use crate::topology::build_topology;

    fn no_priors() -> BTreeMap<NodeId, Point> {
        BTreeMap::new()
    }

    #[test]
    fn simple_diamond_is_found() {
        let topo = build_topology(&[(1, 2), (1, 3), (2, 4), (3, 4)]).unwrap();
        let catalog = decompose(&topo, &no_priors()).unwrap();
        let at_4 = catalog.diamonds_at(4).expect("join 4 has a diamond");
        assert_eq!(at_4.groups.len(), 1);
        assert_eq!(at_4.groups[0].roots, BTreeSet::from([1]));
        assert!(at_4.non_diamond_parents.is_empty());
    }

    #[test]
    fn chain_has_no_diamonds() {
        let topo = build_topology(&[(1, 2), (2, 3), (3, 4)]).unwrap();
        let catalog = decompose(&topo, &no_priors()).unwrap();
        assert!(catalog.by_join.is_empty());
    }

    #[test]
    fn independent_parents_are_not_a_diamond() {
        // Two unrelated sources feeding the same join: no shared fork.
        let topo = build_topology(&[(1, 3), (2, 3)]).unwrap();
        let catalog = decompose(&topo, &no_priors()).unwrap();
        assert!(catalog.by_join.is_empty());
    }

    #[test]
    fn deterministic_fork_is_pruned() {
        let topo = build_topology(&[(1, 2), (1, 3), (2, 4), (3, 4)]).unwrap();
        let mut priors = BTreeMap::new();
        priors.insert(1, Point(1.0));
        let catalog = decompose(&topo, &priors).unwrap();
        assert!(catalog.by_join.is_empty());
    }

    #[test]
    fn non_source_deterministic_fork_is_kept() {
        // Fork 4 has prior 1.0 but is not a source (it has parents 2, 3), so
        // it must still be treated as a conditioning node at join 7.
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
        let mut priors = BTreeMap::new();
        for n in 1..=7 {
            priors.insert(n, Point(1.0));
        }
        let catalog = decompose(&topo, &priors).unwrap();
        let at_7 = catalog.diamonds_at(7).expect("join 7 has a diamond");
        assert!(at_7.groups.iter().any(|g| g.roots.contains(&4)));
    }

    #[test]
    fn nested_diamond_has_two_joins() {
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
        let catalog = decompose(&topo, &no_priors()).unwrap();
        assert!(catalog.diamonds_at(4).is_some());
        assert!(catalog.diamonds_at(7).is_some());
    }
}
