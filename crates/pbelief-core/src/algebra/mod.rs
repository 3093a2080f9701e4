//! The probability algebra the propagator is generic over (spec §3).
//!
//! Three instantiations are provided: [`point::Point`] (plain `f64`),
//! [`interval::Interval`] (`[lo, hi]` bounds), and [`slice::Slice`] (a discrete
//! value/weight mixture). Callers pick one at the type-parameter level; the
//! engine itself never branches on which one is in use.

pub mod interval;
pub mod point;
pub mod slice;

pub use interval::Interval;
pub use point::Point;
pub use slice::{Slice, SliceConfig};

use crate::error::PdagResult;

/// Capability interface every probability representation must implement.
///
/// `and` is ⊗ (independent-event AND), `add`/`sub` are ⊕/⊖ (the signed sum
/// inclusion-exclusion is expressed with), and `complement` represents `1 - x`.
/// These are the only primitives the topology analyzer, diamond decomposer,
/// and belief propagator use -- none of them know which concrete algebra
/// they're running over.
pub trait Probability: Clone + std::fmt::Debug {
    fn zero() -> Self;
    fn one() -> Self;

    fn and(&self, rhs: &Self) -> Self;
    fn add(&self, rhs: &Self) -> Self;
    fn sub(&self, rhs: &Self) -> Self;
    fn complement(&self) -> Self;

    /// True if this value is definitely `0` (used to prune deterministic
    /// sources out of diamond conditioning, spec §4.B.1 step 1).
    fn is_zero(&self) -> bool;
    /// True if this value is definitely `1`.
    fn is_one(&self) -> bool;

    /// Reject values outside the algebra's domain (spec §4.C validation).
    fn validate(&self) -> PdagResult<()>;

    /// Re-bound a value that may have drifted outside `[0, 1]` after a chain
    /// of `add`/`sub` (inclusion-exclusion can transiently go negative).
    /// Applied once, at the point a belief is finalized -- not after every
    /// intermediate op, so that accumulation itself stays exact per spec §4.C.3.
    fn clamp_to_domain(&self) -> Self;

    /// Cap on a diamond's conditioning-set size this value's algebra wants
    /// enforced, or `None` if uncapped. Only the slice algebra's `2^|C|`
    /// recursive propagations are expensive enough to need one (spec §5);
    /// `Point` and `Interval` inherit the default `None`.
    fn conditioning_cap(&self) -> Option<usize> {
        None
    }
}

/// Exact inclusion-exclusion over `k` independent contributions (spec §4.C.3):
/// `⊕_{S subset of {1..k}, S != empty} (-1)^(|S|+1) ⊗_{i in S} x_i`.
///
/// Subsets are enumerated in lexicographic bitmask order; the result is
/// order-independent because `add`/`and` are commutative and associative.
pub fn inclusion_exclusion<P: Probability>(xs: &[P]) -> P {
    if xs.is_empty() {
        return P::zero();
    }
    if xs.len() == 1 {
        return xs[0].clone();
    }

    let k = xs.len();
    let mut acc = P::zero();
    for mask in 1u64..(1u64 << k) {
        let mut term: Option<P> = None;
        let mut bits = 0u32;
        for (i, x) in xs.iter().enumerate() {
            if mask & (1 << i) != 0 {
                bits += 1;
                term = Some(match term {
                    Some(t) => t.and(x),
                    None => x.clone(),
                });
            }
        }
        let term = term.expect("mask != 0 implies at least one bit set");
        acc = if bits % 2 == 1 {
            acc.add(&term)
        } else {
            acc.sub(&term)
        };
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inclusion_exclusion_single() {
        let x = Point(0.7);
        assert_eq!(inclusion_exclusion(&[x]).0, 0.7);
    }

    #[test]
    fn inclusion_exclusion_two_independent() {
        // P(A u B) = P(A) + P(B) - P(A)P(B)
        let a = Point(0.6);
        let b = Point(0.5);
        let result = inclusion_exclusion(&[a, b]);
        assert!((result.0 - 0.8).abs() < 1e-12);
    }

    #[test]
    fn inclusion_exclusion_three_independent() {
        let xs = [Point(0.5), Point(0.5), Point(0.5)];
        let result = inclusion_exclusion(&xs);
        // 1 - (1-0.5)^3 = 0.875
        assert!((result.0 - 0.875).abs() < 1e-12);
    }

    #[test]
    fn inclusion_exclusion_empty_is_zero() {
        let xs: [Point; 0] = [];
        assert_eq!(inclusion_exclusion(&xs).0, 0.0);
    }
}
