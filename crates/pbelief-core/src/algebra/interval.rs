use serde::{Deserialize, Serialize};

use super::Probability;
use crate::error::{PdagError, PdagResult};

/// `[lo, hi]` bounds with `0 <= lo <= hi <= 1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lo: f64,
    pub hi: f64,
}

impl Interval {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn degenerate(p: f64) -> Self {
        Self { lo: p, hi: p }
    }
}

impl Probability for Interval {
    fn zero() -> Self {
        Interval::degenerate(0.0)
    }

    fn one() -> Self {
        Interval::degenerate(1.0)
    }

    /// `⊗` uses the min/max of the four corner products (spec §3).
    fn and(&self, rhs: &Self) -> Self {
        let corners = [
            self.lo * rhs.lo,
            self.lo * rhs.hi,
            self.hi * rhs.lo,
            self.hi * rhs.hi,
        ];
        let lo = corners.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = corners.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Interval { lo, hi }
    }

    /// `⊕` adds component-wise, clamped to `[0, 1]`.
    fn add(&self, rhs: &Self) -> Self {
        Interval {
            lo: (self.lo + rhs.lo).clamp(0.0, 1.0),
            hi: (self.hi + rhs.hi).clamp(0.0, 1.0),
        }
    }

    /// `⊖` reverses bounds: `[a.lo - b.hi, a.hi - b.lo]`. Not clamped here --
    /// `x ⊖ x` on a degenerate interval is exactly zero; on a wide interval it
    /// may transiently leave `[0, 1]` during inclusion-exclusion accumulation,
    /// which `clamp_to_domain` resolves once the belief is finalized.
    fn sub(&self, rhs: &Self) -> Self {
        Interval {
            lo: self.lo - rhs.hi,
            hi: self.hi - rhs.lo,
        }
    }

    fn complement(&self) -> Self {
        Interval {
            lo: 1.0 - self.hi,
            hi: 1.0 - self.lo,
        }
    }

    fn is_zero(&self) -> bool {
        self.lo == 0.0 && self.hi == 0.0
    }

    fn is_one(&self) -> bool {
        self.lo == 1.0 && self.hi == 1.0
    }

    fn validate(&self) -> PdagResult<()> {
        if !(0.0..=1.0).contains(&self.lo) || !(0.0..=1.0).contains(&self.hi) || self.lo > self.hi
        {
            return Err(PdagError::OutOfRange(format!(
                "interval [{}, {}] is not a valid probability interval",
                self.lo, self.hi
            )));
        }
        Ok(())
    }

    fn clamp_to_domain(&self) -> Self {
        let lo = self.lo.clamp(0.0, 1.0);
        let hi = self.hi.clamp(0.0, 1.0);
        Interval {
            lo: lo.min(hi),
            hi: lo.max(hi),
        }
    }
}
