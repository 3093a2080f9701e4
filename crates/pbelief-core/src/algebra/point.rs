use serde::{Deserialize, Serialize};

use super::Probability;
use crate::error::{PdagError, PdagResult};

/// Plain scalar probability in `[0, 1]`. Ops are ordinary arithmetic.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Point(pub f64);

impl Point {
    pub fn new(p: f64) -> Self {
        Self(p)
    }
}

impl Probability for Point {
    fn zero() -> Self {
        Point(0.0)
    }

    fn one() -> Self {
        Point(1.0)
    }

    fn and(&self, rhs: &Self) -> Self {
        Point(self.0 * rhs.0)
    }

    fn add(&self, rhs: &Self) -> Self {
        Point(self.0 + rhs.0)
    }

    fn sub(&self, rhs: &Self) -> Self {
        Point(self.0 - rhs.0)
    }

    fn complement(&self) -> Self {
        Point(1.0 - self.0)
    }

    fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    fn is_one(&self) -> bool {
        self.0 == 1.0
    }

    fn validate(&self) -> PdagResult<()> {
        if !(0.0..=1.0).contains(&self.0) {
            return Err(PdagError::OutOfRange(format!(
                "point probability {} outside [0, 1]",
                self.0
            )));
        }
        Ok(())
    }

    fn clamp_to_domain(&self) -> Self {
        Point(self.0.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities() {
        let x = Point(0.37);
        assert_eq!(Point::zero().add(&x), x);
        assert_eq!(Point::one().and(&x), x);
    }

    #[test]
    fn complement_roundtrip() {
        let x = Point(0.2);
        assert!((x.complement().0 - 0.8).abs() < 1e-12);
    }

    #[test]
    fn validate_rejects_out_of_range() {
        assert!(Point(1.5).validate().is_err());
        assert!(Point(-0.1).validate().is_err());
        assert!(Point(0.5).validate().is_ok());
    }
}
