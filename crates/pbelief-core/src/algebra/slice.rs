use serde::{Deserialize, Serialize};

use super::Probability;
use crate::error::{PdagError, PdagResult};

/// Default tolerance below which two slice values are considered equal and
/// merged during consolidation (spec §3, §9 "Slice consolidation").
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Default magnitude below which a consolidated term is dropped entirely, to
/// bound slice growth across repeated `and`/`add` cross-products (spec §4.C.3:
/// "Implementations may prune terms whose weight magnitude falls below a
/// tolerance").
pub const DEFAULT_PRUNE_THRESHOLD: f64 = 1e-12;

/// Default cap on a diamond's conditioning-set size for the slice algebra,
/// where `2^|C|` recursive propagations are expensive (spec §5, §9 open
/// question iii).
pub const DEFAULT_MAX_CONDITIONING_NODES: usize = 20;

/// Knobs for slice consolidation, exposed per spec §9 rather than hardcoded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SliceConfig {
    pub tolerance: f64,
    pub prune_threshold: f64,
    pub max_conditioning_nodes: usize,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
            max_conditioning_nodes: DEFAULT_MAX_CONDITIONING_NODES,
        }
    }
}

/// A finite discrete mixture `{(v_i, w_i)}`, `v_i` a probability value and
/// `w_i` its weight. Weights sum to 1 for a *valid input* distribution;
/// intermediate inclusion-exclusion terms may carry negative weights, which
/// is allowed during accumulation and only resolved at [`Slice::clamp_to_domain`].
///
/// `config` travels with the value itself rather than as a side parameter to
/// `propagate`/`inclusion_exclusion`, so the consolidation knobs a caller sets
/// stay in effect through every `and`/`add`/`sub` a slice passes through, not
/// just the initial load. It is not part of the value's identity or its wire
/// format.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Slice {
    pub values: Vec<(f64, f64)>,
    #[serde(skip, default)]
    pub config: SliceConfig,
}

impl PartialEq for Slice {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Default for Slice {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            config: SliceConfig::default(),
        }
    }
}

impl Slice {
    pub fn new(pairs: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut s = Self {
            values: pairs.into_iter().collect(),
            config: SliceConfig::default(),
        };
        let config = s.config;
        s.consolidate(&config);
        s
    }

    pub fn degenerate(p: f64) -> Self {
        Self {
            values: vec![(p, 1.0)],
            config: SliceConfig::default(),
        }
    }

    /// Stamp a consolidation config onto this slice and re-consolidate its
    /// current values under it, so later `and`/`add`/`sub` calls -- which
    /// inherit a slice's own `config` -- keep using it.
    pub fn set_config(&mut self, config: SliceConfig) {
        self.config = config;
        self.consolidate(&config);
    }

    /// Merge values within `config.tolerance` of each other, summing their
    /// weights, and drop terms whose resulting weight magnitude is below
    /// `config.prune_threshold`. Negative weights are preserved as-is.
    pub fn consolidate(&mut self, config: &SliceConfig) {
        self.values
            .sort_by(|a, b| a.0.partial_cmp(&b.0).expect("probability values are finite"));

        let mut merged: Vec<(f64, f64)> = Vec::with_capacity(self.values.len());
        for &(v, w) in &self.values {
            match merged.last_mut() {
                Some((last_v, last_w)) if (v - *last_v).abs() < config.tolerance => {
                    // Weighted-average the cluster's representative value.
                    let total = *last_w + w;
                    if total != 0.0 {
                        *last_v = (*last_v * *last_w + v * w) / total;
                    }
                    *last_w = total;
                }
                _ => merged.push((v, w)),
            }
        }
        merged.retain(|(_, w)| w.abs() >= config.prune_threshold);
        if merged.is_empty() {
            merged.push((0.0, 0.0));
        }
        self.values = merged;
    }

    /// Resolve accumulated negative interim weights by taking their absolute
    /// value and renormalizing so the total weight is 1. Only correct to call
    /// once, on a finalized belief -- never between inclusion-exclusion terms.
    pub fn normalize(&mut self) {
        for (_, w) in &mut self.values {
            *w = w.abs();
        }
        let total: f64 = self.values.iter().map(|(_, w)| *w).sum();
        if total > 0.0 {
            for (_, w) in &mut self.values {
                *w /= total;
            }
        }
    }

    fn cross<F: Fn(f64, f64) -> f64>(&self, rhs: &Self, combine_value: F) -> Self {
        let mut values = Vec::with_capacity(self.values.len() * rhs.values.len());
        for &(v1, w1) in &self.values {
            for &(v2, w2) in &rhs.values {
                values.push((combine_value(v1, v2), w1 * w2));
            }
        }
        // `P::zero()`/`P::one()` identity values are parameterless and so
        // always carry the default config; prefer whichever side actually
        // came from loaded data (more values) so a real run's configured
        // tolerance isn't clobbered by an identity fold seed.
        let config = if rhs.values.len() > self.values.len() {
            rhs.config
        } else {
            self.config
        };
        let mut s = Self { values, config };
        s.consolidate(&config);
        s
    }
}

impl Probability for Slice {
    fn zero() -> Self {
        Slice::degenerate(0.0)
    }

    fn one() -> Self {
        Slice::degenerate(1.0)
    }

    fn and(&self, rhs: &Self) -> Self {
        self.cross(rhs, |a, b| a * b)
    }

    fn add(&self, rhs: &Self) -> Self {
        self.cross(rhs, |a, b| a + b)
    }

    fn sub(&self, rhs: &Self) -> Self {
        self.cross(rhs, |a, b| a - b)
    }

    fn complement(&self) -> Self {
        Slice {
            values: self.values.iter().map(|&(v, w)| (1.0 - v, w)).collect(),
            config: self.config,
        }
    }

    fn is_zero(&self) -> bool {
        self.values.len() == 1 && self.values[0].0 == 0.0 && (self.values[0].1 - 1.0).abs() < 1e-9
    }

    fn is_one(&self) -> bool {
        self.values.len() == 1 && self.values[0].0 == 1.0 && (self.values[0].1 - 1.0).abs() < 1e-9
    }

    fn validate(&self) -> PdagResult<()> {
        if self.values.is_empty() {
            return Err(PdagError::OutOfRange("slice has no values".into()));
        }
        let mut total = 0.0;
        for &(v, w) in &self.values {
            if !(0.0..=1.0).contains(&v) {
                return Err(PdagError::OutOfRange(format!(
                    "slice value {v} outside [0, 1]"
                )));
            }
            if w < 0.0 {
                return Err(PdagError::OutOfRange(format!(
                    "slice weight {w} is negative"
                )));
            }
            total += w;
        }
        if (total - 1.0).abs() > 1e-6 {
            return Err(PdagError::OutOfRange(format!(
                "slice weights sum to {total}, expected 1"
            )));
        }
        Ok(())
    }

    fn clamp_to_domain(&self) -> Self {
        let mut s = Slice {
            values: self
                .values
                .iter()
                .map(|&(v, w)| (v.clamp(0.0, 1.0), w))
                .collect(),
            config: self.config,
        };
        s.normalize();
        s.consolidate(&self.config);
        s
    }

    fn conditioning_cap(&self) -> Option<usize> {
        Some(self.config.max_conditioning_nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_cross_product() {
        let a = Slice::new([(0.2, 0.5), (0.8, 0.5)]);
        let b = Slice::new([(1.0, 1.0)]);
        let result = a.and(&b);
        let mut values = result.values.clone();
        values.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        assert!((values[0].0 - 0.2).abs() < 1e-9);
        assert!((values[1].0 - 0.8).abs() < 1e-9);
    }

    #[test]
    fn cross_product_uses_the_operands_own_config() {
        // Neither operand's own values are close enough to merge under any
        // tolerance below 0.07, but `add`'s cross-product produces a pair
        // 0.03 apart (0.17 and 0.20). The default tolerance (1e-9) leaves
        // all four results distinct; a coarse tolerance set via `set_config`
        // must still be honored by `cross` itself, not just the initial
        // `consolidate` call a caller happens to make.
        let mut a = Slice::new([(0.10, 0.5), (0.20, 0.5)]);
        a.set_config(SliceConfig {
            tolerance: 0.05,
            ..SliceConfig::default()
        });
        let b = Slice::new([(0.00, 0.5), (0.07, 0.5)]);
        let result = a.add(&b);
        assert_eq!(result.values.len(), 3, "{:?}", result.values);
    }

    #[test]
    fn consolidation_merges_close_values() {
        let mut s = Slice {
            values: vec![(0.5, 0.4), (0.5 + 1e-12, 0.6)],
            ..Default::default()
        };
        s.consolidate(&SliceConfig::default());
        assert_eq!(s.values.len(), 1);
        assert!((s.values[0].1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_absorbs_negative_interim_weights() {
        let mut s = Slice {
            values: vec![(0.5, 0.6), (0.5, -0.1)],
            ..Default::default()
        };
        // consolidate first merges same-value entries into (0.5, 0.5)
        s.consolidate(&SliceConfig::default());
        assert!((s.values[0].1 - 0.5).abs() < 1e-9);

        let mut negative = Slice {
            values: vec![(0.3, 0.9), (0.7, -0.1)],
            ..Default::default()
        };
        negative.normalize();
        let total: f64 = negative.values.iter().map(|(_, w)| *w).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(negative.values.iter().all(|&(_, w)| w >= 0.0));
    }

    #[test]
    fn validate_rejects_bad_weights() {
        assert!(Slice::new([(0.5, 0.4)]).validate().is_err());
        assert!(Slice::new([(0.5, 1.0)]).validate().is_ok());
    }

    #[test]
    fn degenerate_is_zero_or_one() {
        assert!(Slice::zero().is_zero());
        assert!(Slice::one().is_one());
        assert!(!Slice::degenerate(0.5).is_zero());
    }
}
