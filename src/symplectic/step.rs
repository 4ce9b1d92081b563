//! Drift/kick coefficients of composed symplectic steps
//!
//! Order 2 is the drift-kick-drift leapfrog. Higher even orders compose it
//! recursively with the Suzuki-Yoshida triple jump:
//!
//! ```text
//! S_{n}(h) = S_{n-2}(w1 h) S_{n-2}(w0 h) S_{n-2}(w1 h)
//! w1 = 1 / (2 - 2^(1/(n-1))),  w0 = 1 - 2 w1
//! ```
//!
//! Adjacent half drifts are merged, so a composition of `m` leapfrogs has
//! `m + 1` drift/kick pairs with a zero final kick.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Drift and kick coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymplecticStep {
    order: usize,
    cd_pair: Vec<(f64, f64)>,
}

impl Default for SymplecticStep {
    fn default() -> Self {
        Self {
            order: 2,
            cd_pair: vec![(0.5, 1.0), (0.5, 0.0)],
        }
    }
}

impl SymplecticStep {
    /// Coefficients for an even `order >= 2`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for zero or odd orders.
    pub fn initial_symplectic_coefficients(order: usize) -> Result<Self> {
        if order < 2 || order % 2 != 0 {
            return Err(Error::invalid_parameter(
                "order",
                format!("symplectic order must be even and >= 2, got {order}"),
            ));
        }
        let weights = leapfrog_weights(order);
        let m = weights.len();
        let mut cd_pair = Vec::with_capacity(m + 1);
        cd_pair.push((0.5 * weights[0], weights[0]));
        for i in 1..m {
            cd_pair.push((0.5 * (weights[i - 1] + weights[i]), weights[i]));
        }
        cd_pair.push((0.5 * weights[m - 1], 0.0));
        Ok(Self { order, cd_pair })
    }

    /// Accuracy order.
    #[must_use]
    pub const fn order(&self) -> usize {
        self.order
    }

    /// Number of drift/kick pairs in one step.
    #[must_use]
    pub fn cd_pair_size(&self) -> usize {
        self.cd_pair.len()
    }

    /// Drift coefficient of pair `k`.
    #[must_use]
    pub fn ck(&self, k: usize) -> f64 {
        self.cd_pair[k].0
    }

    /// Kick coefficient of pair `k`.
    #[must_use]
    pub fn dk(&self, k: usize) -> f64 {
        self.cd_pair[k].1
    }

    /// Sum of drift coefficients `0..=k`.
    #[must_use]
    pub fn sum_c(&self, k: usize) -> f64 {
        self.cd_pair[..=k].iter().map(|(c, _)| c).sum()
    }

    /// Iterate over `(drift, kick)` pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.cd_pair.iter().copied()
    }
}

fn leapfrog_weights(order: usize) -> Vec<f64> {
    if order == 2 {
        return vec![1.0];
    }
    let inner = leapfrog_weights(order - 2);
    #[allow(clippy::cast_precision_loss)]
    let exponent = 1.0 / (order as f64 - 1.0);
    let w1 = 1.0 / (2.0 - 2.0_f64.powf(exponent));
    let w0 = 1.0 - 2.0 * w1;
    let mut weights = Vec::with_capacity(inner.len() * 3);
    weights.extend(inner.iter().map(|w| w * w1));
    weights.extend(inner.iter().map(|w| w * w0));
    weights.extend(inner.iter().map(|w| w * w1));
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leapfrog() {
        let step = SymplecticStep::initial_symplectic_coefficients(2).unwrap();
        assert_eq!(step, SymplecticStep::default());
        assert_eq!(step.cd_pair_size(), 2);
    }

    #[test]
    fn test_fourth_order_coefficients() {
        let step = SymplecticStep::initial_symplectic_coefficients(4).unwrap();
        assert_eq!(step.cd_pair_size(), 4);
        let w1 = 1.0 / (2.0 - 2.0_f64.powf(1.0 / 3.0));
        assert!((step.ck(0) - 0.5 * w1).abs() < 1e-15);
        assert!((step.dk(0) - w1).abs() < 1e-15);
        // the middle kick goes backwards
        assert!(step.dk(1) < 0.0);
        assert!(step.dk(3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sum_c() {
        let step = SymplecticStep::initial_symplectic_coefficients(6).unwrap();
        let last = step.cd_pair_size() - 1;
        assert!((step.sum_c(last) - 1.0).abs() < 1e-13);
        assert!((step.sum_c(0) - step.ck(0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_orders() {
        assert!(SymplecticStep::initial_symplectic_coefficients(0).is_err());
        assert!(SymplecticStep::initial_symplectic_coefficients(3).is_err());
    }
}
