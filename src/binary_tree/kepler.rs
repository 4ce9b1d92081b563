//! Kepler elements of a two-body relative orbit

use serde::{Deserialize, Serialize};

use crate::vec3::{cross, dot, norm2, Vec3};

const TWO_PI: f64 = std::f64::consts::TAU;

/// Kepler elements derived from a relative position and velocity.
///
/// Negative `semi` marks a hyperbolic orbit. With zero total mass every
/// element is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KeplerOrbit {
    /// Semi-major axis
    pub semi: f64,
    /// Eccentricity
    pub ecc: f64,
    /// Period, `2 pi sqrt(|a|^3 / (G M))`
    pub period: f64,
    /// Current separation
    pub r: f64,
    /// Current `dr . dv`
    pub rv: f64,
}

impl KeplerOrbit {
    /// Elements from relative position `dr`, velocity `dv` and `G (m1 + m2)`.
    #[must_use]
    pub fn from_relative(dr: &Vec3, dv: &Vec3, gm: f64) -> Self {
        let r = norm2(dr).sqrt();
        let rv = dot(dr, dv);
        if gm <= 0.0 || r <= 0.0 {
            return Self {
                r,
                rv,
                ..Self::default()
            };
        }
        let v2 = norm2(dv);
        let inv_semi = 2.0 / r - v2 / gm;
        let semi = if inv_semi == 0.0 { f64::INFINITY } else { 1.0 / inv_semi };

        // eccentricity vector: (v x h)/GM - r_hat
        let h = cross(dr, dv);
        let vxh = cross(dv, &h);
        let e_vec = [
            vxh[0] / gm - dr[0] / r,
            vxh[1] / gm - dr[1] / r,
            vxh[2] / gm - dr[2] / r,
        ];
        let ecc = norm2(&e_vec).sqrt();
        let period = TWO_PI * (semi.abs().powi(3) / gm).sqrt();

        Self {
            semi,
            ecc,
            period,
            r,
            rv,
        }
    }

    /// Whether the orbit is bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.semi > 0.0 && self.semi.is_finite()
    }

    /// Eccentric anomaly (hyperbolic anomaly for unbound orbits) at
    /// separation `r`, signed by the stored `dr . dv`: negative before
    /// pericenter.
    #[must_use]
    pub fn calc_ecc_anomaly(&self, r: f64) -> f64 {
        if self.ecc <= f64::EPSILON || self.semi == 0.0 || !self.semi.is_finite() {
            return 0.0;
        }
        let cos_arg = (1.0 - r / self.semi) / self.ecc;
        let anomaly = if self.semi > 0.0 {
            cos_arg.clamp(-1.0, 1.0).acos()
        } else {
            cos_arg.max(1.0).acosh()
        };
        if self.rv < 0.0 {
            -anomaly
        } else {
            anomaly
        }
    }

    /// Mean anomaly from the eccentric anomaly: `E - e sin E`, or
    /// `e sinh F - F` for unbound orbits.
    #[must_use]
    pub fn calc_mean_anomaly(&self, ecc_anomaly: f64, ecc: f64) -> f64 {
        if self.semi < 0.0 {
            ecc * ecc_anomaly.sinh() - ecc_anomaly
        } else {
            ecc_anomaly - ecc * ecc_anomaly.sin()
        }
    }

    /// Time until the next pericenter passage, `|M| / (2 pi) * P`.
    ///
    /// Only meaningful while approaching (`rv < 0`).
    #[must_use]
    pub fn time_to_pericenter(&self) -> f64 {
        let ecc_anomaly = self.calc_ecc_anomaly(self.r);
        let mean_anomaly = self.calc_mean_anomaly(ecc_anomaly, self.ecc);
        (mean_anomaly / TWO_PI * self.period).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_orbit() {
        // m1 = m2 = 0.5, separation 1, circular speed sqrt(GM/r) = 1
        let orbit = KeplerOrbit::from_relative(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0], 1.0);
        assert!((orbit.semi - 1.0).abs() < 1e-14);
        assert!(orbit.ecc < 1e-14);
        assert!((orbit.period - TWO_PI).abs() < 1e-12);
        assert!(orbit.is_bound());
    }

    #[test]
    fn test_eccentric_orbit_at_apocenter() {
        // apocenter r = a(1+e), v = sqrt(GM/a (1-e)/(1+e))
        let a: f64 = 2.0;
        let e: f64 = 0.5;
        let r = a * (1.0 + e);
        let v = (1.0 / a * (1.0 - e) / (1.0 + e)).sqrt();
        let orbit = KeplerOrbit::from_relative(&[r, 0.0, 0.0], &[0.0, v, 0.0], 1.0);
        assert!((orbit.semi - a).abs() < 1e-12);
        assert!((orbit.ecc - e).abs() < 1e-12);
        let ecc_anomaly = orbit.calc_ecc_anomaly(r);
        assert!((ecc_anomaly.abs() - std::f64::consts::PI).abs() < 1e-6);
        // half an orbit left to pericenter
        assert!((orbit.time_to_pericenter() - 0.5 * orbit.period).abs() < 1e-5);
    }

    #[test]
    fn test_hyperbolic_orbit() {
        let orbit = KeplerOrbit::from_relative(&[1.0, 0.0, 0.0], &[-1.0, 2.0, 0.0], 1.0);
        assert!(orbit.semi < 0.0);
        assert!(orbit.ecc > 1.0);
        assert!(!orbit.is_bound());
        let f = orbit.calc_ecc_anomaly(orbit.r);
        assert!(f < 0.0);
        let m = orbit.calc_mean_anomaly(f, orbit.ecc);
        assert!(m < 0.0);
    }

    #[test]
    fn test_zero_mass() {
        let orbit = KeplerOrbit::from_relative(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0], 0.0);
        assert!(orbit.semi.abs() < f64::EPSILON);
        assert!((orbit.r - 1.0).abs() < f64::EPSILON);
    }
}
