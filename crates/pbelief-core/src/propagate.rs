//! Belief propagator (spec §4.C): the main topological sweep, diamond-join
//! conditioning, and inclusion-exclusion combination.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::algebra::{Probability, inclusion_exclusion};
use crate::diamond::{AncestorGroup, DiamondCatalog, decompose};
use crate::error::{PdagError, PdagResult};
use crate::topology::{NodeId, Topology};

/// Run the main sweep and return each node's exact belief (spec §4.C).
///
/// `catalog` must have been produced by [`crate::diamond::decompose`] on the
/// same `topology` and (for algebras that prune deterministic sources) the
/// same `node_priors`.
pub fn propagate<P: Probability>(
    topology: &Topology,
    catalog: &DiamondCatalog,
    node_priors: &BTreeMap<NodeId, P>,
    edge_probs: &BTreeMap<(NodeId, NodeId), P>,
) -> PdagResult<BTreeMap<NodeId, P>> {
    validate_inputs(topology, node_priors, edge_probs)?;

    let mut belief: BTreeMap<NodeId, P> = BTreeMap::new();

    for level in &topology.iteration_sets {
        for &n in level {
            let prior = node_priors
                .get(&n)
                .ok_or(PdagError::MissingPrior(n))?
                .clone();

            let value = if topology.sources.contains(&n) {
                prior
            } else {
                let combined = combine_parents(n, topology, catalog, &belief, node_priors, edge_probs)?;
                prior.and(&combined)
            };

            belief.insert(n, value.clamp_to_domain());
        }
    }

    Ok(belief)
}

/// Build node `n`'s list of path bundles and reduce it to one combined value
/// (spec §4.C step 2-3, before the node's own prior is applied).
fn combine_parents<P: Probability>(
    n: NodeId,
    topology: &Topology,
    catalog: &DiamondCatalog,
    belief: &BTreeMap<NodeId, P>,
    node_priors: &BTreeMap<NodeId, P>,
    edge_probs: &BTreeMap<(NodeId, NodeId), P>,
) -> PdagResult<P> {
    let mut bundles: Vec<P> = Vec::new();
    let convergence = is_convergence(topology, n);

    let non_diamond_parents: BTreeSet<NodeId> = match catalog.diamonds_at(n) {
        Some(at_join) => {
            if !at_join.groups.is_empty() {
                let per_group = at_join
                    .groups
                    .iter()
                    .map(|g| evaluate_diamond_group(g, n, topology, belief, node_priors, edge_probs))
                    .collect::<PdagResult<Vec<P>>>()?;
                bundles.push(combine(&per_group));
            }
            at_join.non_diamond_parents.clone()
        }
        None => topology.parents(n),
    };

    if convergence {
        for p in &non_diamond_parents {
            bundles.push(edge_contribution(*p, n, belief, edge_probs)?);
        }
    } else if !non_diamond_parents.is_empty() {
        let mut sum: Option<P> = None;
        for p in &non_diamond_parents {
            let contribution = edge_contribution(*p, n, belief, edge_probs)?;
            sum = Some(match sum {
                Some(acc) => acc.add(&contribution),
                None => contribution,
            });
        }
        bundles.push(sum.expect("non_diamond_parents is non-empty"));
    }

    Ok(combine(&bundles))
}

fn combine<P: Probability>(bundles: &[P]) -> P {
    if bundles.len() == 1 {
        bundles[0].clone()
    } else {
        inclusion_exclusion(bundles)
    }
}

fn edge_contribution<P: Probability>(
    p: NodeId,
    n: NodeId,
    belief: &BTreeMap<NodeId, P>,
    edge_probs: &BTreeMap<(NodeId, NodeId), P>,
) -> PdagResult<P> {
    let belief_p = belief.get(&p).ok_or(PdagError::PropagationOrder(p))?;
    let edge_p = edge_probs
        .get(&(p, n))
        .ok_or(PdagError::MissingEdgeProbability(p, n))?;
    Ok(belief_p.and(edge_p))
}

/// A node is a genuine multi-path convergence if it's a join, or if more than
/// one source can reach it -- either way its parents' contributions are not
/// mutually exclusive and must be combined with inclusion-exclusion rather
/// than summed (spec §4.C step 2).
fn is_convergence(topology: &Topology, n: NodeId) -> bool {
    if topology.joins.contains(&n) {
        return true;
    }
    topology
        .ancestors_of(n)
        .intersection(&topology.sources)
        .count()
        > 1
}

/// Evaluate one diamond group's contribution to its join by conditioning
/// (spec §4.C.1): enumerate every truth assignment to the group's
/// conditioning nodes, recursively re-run the whole propagator on the
/// group's self-contained subgraph under each assignment, and weight-sum
/// the results.
fn evaluate_diamond_group<P: Probability>(
    group: &AncestorGroup,
    join: NodeId,
    outer_topology: &Topology,
    belief: &BTreeMap<NodeId, P>,
    node_priors: &BTreeMap<NodeId, P>,
    edge_probs: &BTreeMap<(NodeId, NodeId), P>,
) -> PdagResult<P> {
    let sg = &group.subgraph;

    // C = the group's roots, plus any sub-source of the subgraph that is
    // itself a sub-fork and not a source of the whole outer graph.
    let mut conditioning: BTreeSet<NodeId> = group.roots.clone();
    for &s in &sg.sources {
        if sg.out_degree(s) > 1 && !outer_topology.sources.contains(&s) {
            conditioning.insert(s);
        }
    }
    let conditioning: Vec<NodeId> = conditioning.into_iter().collect(); // sorted: BTreeSet -> Vec preserves order

    let k = conditioning.len();
    // The cap is per-algebra (spec §5 scopes it to the p-box/slice algebra,
    // where 2^k recursive propagations are expensive); Point/Interval report
    // `None` and are never capped. Read it off an already-populated belief
    // rather than `P::one()`/`P::zero()`, which -- for Slice -- would report
    // the bootstrap default config instead of the run's actual one.
    if let Some(cap) = belief.values().next().and_then(|b| b.conditioning_cap()) {
        if k > cap {
            return Err(PdagError::InvariantViolation(format!(
                "diamond at join {join} rooted at {:?} has {k} conditioning nodes, \
                 exceeding the cap of {cap}",
                group.roots
            )));
        }
    }

    let mut acc = P::zero();
    for mask in 0u64..(1u64 << k) {
        let mut sub_priors: BTreeMap<NodeId, P> = BTreeMap::new();
        let mut weight: Option<P> = None;

        for (i, &c) in conditioning.iter().enumerate() {
            let active = mask & (1 << i) != 0;
            let belief_c = belief.get(&c).ok_or(PdagError::PropagationOrder(c))?;
            let factor = if active { belief_c.clone() } else { belief_c.complement() };
            weight = Some(match weight {
                Some(acc_w) => acc_w.and(&factor),
                None => factor,
            });
            sub_priors.insert(c, if active { P::one() } else { P::zero() });
        }
        let weight = weight.unwrap_or_else(P::one);

        for &m in &sg.nodes {
            if sub_priors.contains_key(&m) {
                continue;
            }
            if sg.sources.contains(&m) {
                // Non-conditioning sub-source: use its current outer belief.
                let b = belief.get(&m).ok_or(PdagError::PropagationOrder(m))?;
                sub_priors.insert(m, b.clone());
            } else {
                let p = node_priors.get(&m).ok_or(PdagError::MissingPrior(m))?;
                sub_priors.insert(m, p.clone());
            }
        }

        let mut sub_edge_probs: BTreeMap<(NodeId, NodeId), P> = BTreeMap::new();
        for &(u, v) in &sg.edges {
            let p = edge_probs
                .get(&(u, v))
                .ok_or(PdagError::MissingEdgeProbability(u, v))?;
            sub_edge_probs.insert((u, v), p.clone());
        }

        let sub_catalog = decompose(sg, &sub_priors)?;
        let sub_belief = propagate(sg, &sub_catalog, &sub_priors, &sub_edge_probs)?;
        let belief_join = sub_belief
            .get(&join)
            .ok_or(PdagError::InvariantViolation(format!(
                "diamond subgraph at join {join} produced no belief for its own join node"
            )))?;

        acc = acc.add(&belief_join.and(&weight));
    }

    Ok(acc)
}

fn validate_inputs<P: Probability>(
    topology: &Topology,
    node_priors: &BTreeMap<NodeId, P>,
    edge_probs: &BTreeMap<(NodeId, NodeId), P>,
) -> PdagResult<()> {
    for &n in &topology.nodes {
        let prior = node_priors.get(&n).ok_or(PdagError::MissingPrior(n))?;
        prior.validate()?;
        let has_incoming = topology.in_degree(n) > 0;
        let is_source = topology.sources.contains(&n);
        if has_incoming == is_source {
            return Err(PdagError::InconsistentIndex(n));
        }
    }
    for &(u, v) in &topology.edges {
        let p = edge_probs
            .get(&(u, v))
            .ok_or(PdagError::MissingEdgeProbability(u, v))?;
        p.validate()?;
    }
    Ok(())
}
