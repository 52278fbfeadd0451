//! SABR stochastic volatility smile (Hagan et al., 2002).
//!
//! ```text
//! dF = α F^β dW₁
//! dα = ν α dW₂
//! dW₁ dW₂ = ρ dt
//! ```
//!
//! Only the lognormal implied-volatility expansion is provided; it is used
//! to generate swaption target prices for calibration.
//!
//! # Example
//!
//! ```
//! use pricer_models::models::sabr::SabrParameters;
//!
//! let sabr = SabrParameters::new(0.05, 0.5, -0.25, 0.5).unwrap();
//! let atm = sabr.implied_volatility(0.03, 0.03, 5.0).unwrap();
//! let otm = sabr.implied_volatility(0.03, 0.05, 5.0).unwrap();
//! assert!(atm > 0.0 && otm > 0.0);
//! ```

use super::error::{check_increasing, ModelError};

/// Below this `|ln(F/K)|` the at-the-money expansion is used.
const ATM_THRESHOLD: f64 = 1e-7;

/// Below this `|z|` the ratio `z / x(z)` is replaced by one.
const Z_THRESHOLD: f64 = 1e-10;

/// SABR parameters for one expiry/tenor node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SabrParameters {
    alpha: f64,
    beta: f64,
    rho: f64,
    nu: f64,
}

impl SabrParameters {
    /// Create validated parameters.
    ///
    /// # Arguments
    ///
    /// * `alpha` - Initial volatility, positive
    /// * `beta` - CEV exponent in [0, 1]
    /// * `rho` - Forward/volatility correlation in (-1, 1)
    /// * `nu` - Volatility of volatility, non-negative
    pub fn new(alpha: f64, beta: f64, rho: f64, nu: f64) -> Result<Self, ModelError> {
        let invalid = |name, value| ModelError::InvalidSabrParameter { name, value };
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(invalid("alpha", alpha));
        }
        if !(0.0..=1.0).contains(&beta) {
            return Err(invalid("beta", beta));
        }
        if rho.is_nan() || rho <= -1.0 || rho >= 1.0 {
            return Err(invalid("rho", rho));
        }
        if !nu.is_finite() || nu < 0.0 {
            return Err(invalid("nu", nu));
        }
        Ok(Self {
            alpha,
            beta,
            rho,
            nu,
        })
    }

    /// Initial volatility.
    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// CEV exponent.
    #[inline]
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Correlation.
    #[inline]
    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Volatility of volatility.
    #[inline]
    pub fn nu(&self) -> f64 {
        self.nu
    }

    /// Black (lognormal) implied volatility from Hagan's expansion.
    ///
    /// ```text
    /// σ_B = α / [(FK)^((1-β)/2) D(L)] · z / x(z) · [1 + ε T]
    /// L    = ln(F/K)
    /// D(L) = 1 + (1-β)² L² / 24 + (1-β)⁴ L⁴ / 1920
    /// z    = ν / α · (FK)^((1-β)/2) · L
    /// x(z) = ln[(√(1 - 2ρz + z²) + z - ρ) / (1 - ρ)]
    /// ε    = (1-β)² α² / (24 (FK)^(1-β)) + ρβνα / (4 (FK)^((1-β)/2)) + (2 - 3ρ²) ν² / 24
    /// ```
    ///
    /// # Errors
    ///
    /// - `NonPositiveRate` if the forward or strike is not positive
    /// - `NonFinite` if the expansion breaks down
    pub fn implied_volatility(
        &self,
        forward: f64,
        strike: f64,
        expiry: f64,
    ) -> Result<f64, ModelError> {
        if forward.is_nan() || forward <= 0.0 {
            return Err(ModelError::NonPositiveRate {
                name: "forward",
                value: forward,
            });
        }
        if strike.is_nan() || strike <= 0.0 {
            return Err(ModelError::NonPositiveRate {
                name: "strike",
                value: strike,
            });
        }

        let (alpha, beta, rho, nu) = (self.alpha, self.beta, self.rho, self.nu);
        let one_minus_beta = 1.0 - beta;
        let log_fk = (forward / strike).ln();
        let fk = forward * strike;
        let fk_half = fk.powf(0.5 * one_minus_beta);

        let correction = one_minus_beta * one_minus_beta / 24.0 * alpha * alpha
            / fk.powf(one_minus_beta)
            + rho * beta * nu * alpha / (4.0 * fk_half)
            + (2.0 - 3.0 * rho * rho) / 24.0 * nu * nu;
        let expansion = 1.0 + correction * expiry.max(0.0);

        let vol = if log_fk.abs() < ATM_THRESHOLD {
            alpha / fk_half * expansion
        } else {
            let l2 = log_fk * log_fk;
            let b2 = one_minus_beta * one_minus_beta;
            let d = 1.0 + b2 / 24.0 * l2 + b2 * b2 / 1920.0 * l2 * l2;
            let z = nu / alpha * fk_half * log_fk;
            let z_over_x = if z.abs() < Z_THRESHOLD {
                1.0
            } else {
                let disc = (1.0 - 2.0 * rho * z + z * z).sqrt();
                z / ((disc + z - rho) / (1.0 - rho)).ln()
            };
            alpha / (fk_half * d) * z_over_x * expansion
        };

        if !vol.is_finite() || vol <= 0.0 {
            return Err(ModelError::NonFinite(format!(
                "SABR volatility at F = {}, K = {}",
                forward, strike
            )));
        }
        Ok(vol)
    }
}

/// SABR parameters on an expiry × tenor grid.
///
/// Each parameter is interpolated bilinearly in (expiry, tenor) and held
/// flat outside the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SabrParameterSurface {
    expiries: Vec<f64>,
    tenors: Vec<f64>,
    // Row-major: nodes[i * tenors.len() + j] is (expiries[i], tenors[j])
    nodes: Vec<SabrParameters>,
}

impl SabrParameterSurface {
    /// Create a surface from row-major nodes.
    pub fn new(
        expiries: Vec<f64>,
        tenors: Vec<f64>,
        nodes: Vec<SabrParameters>,
    ) -> Result<Self, ModelError> {
        if expiries.is_empty() || tenors.is_empty() {
            return Err(ModelError::dimension_mismatch("SABR grid axis", 1, 0));
        }
        check_increasing(&expiries)?;
        check_increasing(&tenors)?;
        let expected = expiries.len() * tenors.len();
        if nodes.len() != expected {
            return Err(ModelError::dimension_mismatch("SABR nodes", expected, nodes.len()));
        }
        Ok(Self {
            expiries,
            tenors,
            nodes,
        })
    }

    /// Surface with the same parameters everywhere.
    pub fn flat(parameters: SabrParameters) -> Self {
        Self {
            expiries: vec![0.0],
            tenors: vec![0.0],
            nodes: vec![parameters],
        }
    }

    /// Expiry axis.
    pub fn expiries(&self) -> &[f64] {
        &self.expiries
    }

    /// Tenor axis.
    pub fn tenors(&self) -> &[f64] {
        &self.tenors
    }

    /// Interpolated parameters at `(expiry, tenor)`.
    pub fn parameters(&self, expiry: f64, tenor: f64) -> SabrParameters {
        let (i0, i1, wi) = locate(&self.expiries, expiry);
        let (j0, j1, wj) = locate(&self.tenors, tenor);
        let n = self.tenors.len();
        let corners = [
            (self.nodes[i0 * n + j0], (1.0 - wi) * (1.0 - wj)),
            (self.nodes[i0 * n + j1], (1.0 - wi) * wj),
            (self.nodes[i1 * n + j0], wi * (1.0 - wj)),
            (self.nodes[i1 * n + j1], wi * wj),
        ];
        let blend = |get: fn(&SabrParameters) -> f64| -> f64 {
            corners.iter().map(|(p, w)| w * get(p)).sum()
        };
        // Convex combination of valid nodes stays valid
        SabrParameters {
            alpha: blend(SabrParameters::alpha),
            beta: blend(SabrParameters::beta),
            rho: blend(SabrParameters::rho),
            nu: blend(SabrParameters::nu),
        }
    }

    /// Implied volatility for a swaption of given expiry and tenor.
    pub fn implied_volatility(
        &self,
        expiry: f64,
        tenor: f64,
        forward: f64,
        strike: f64,
    ) -> Result<f64, ModelError> {
        self.parameters(expiry, tenor)
            .implied_volatility(forward, strike, expiry)
    }
}

/// Neighbouring indices and weight of `x` on `grid`, flat outside.
fn locate(grid: &[f64], x: f64) -> (usize, usize, f64) {
    let last = grid.len() - 1;
    if x <= grid[0] {
        return (0, 0, 0.0);
    }
    if x >= grid[last] {
        return (last, last, 0.0);
    }
    let hi = grid.partition_point(|&g| g <= x);
    let lo = hi - 1;
    (lo, hi, (x - grid[lo]) / (grid[hi] - grid[lo]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sabr() -> SabrParameters {
        SabrParameters::new(0.05, 0.5, -0.25, 0.5).unwrap()
    }

    // ========================================
    // Parameter validation
    // ========================================

    #[test]
    fn test_rejects_out_of_domain() {
        assert!(SabrParameters::new(0.0, 0.5, 0.0, 0.3).is_err());
        assert!(SabrParameters::new(0.05, 1.2, 0.0, 0.3).is_err());
        assert!(SabrParameters::new(0.05, 0.5, -1.0, 0.3).is_err());
        assert!(SabrParameters::new(0.05, 0.5, 0.0, -0.1).is_err());
    }

    // ========================================
    // Implied volatility
    // ========================================

    #[test]
    fn test_lognormal_no_volvol_is_flat() {
        // β = 1, ν = 0: Black with σ = α
        let p = SabrParameters::new(0.2, 1.0, 0.0, 0.0).unwrap();
        for k in [0.01, 0.03, 0.06] {
            assert_relative_eq!(p.implied_volatility(0.03, k, 2.0).unwrap(), 0.2, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_atm_branch_is_continuous() {
        let f = 0.03;
        let atm = sabr().implied_volatility(f, f, 5.0).unwrap();
        let near = sabr().implied_volatility(f, f * (1.0 + 1e-6), 5.0).unwrap();
        assert_relative_eq!(atm, near, max_relative = 1e-5);
    }

    #[test]
    fn test_negative_rho_gives_downward_skew() {
        let f = 0.03;
        let low = sabr().implied_volatility(f, 0.02, 5.0).unwrap();
        let high = sabr().implied_volatility(f, 0.04, 5.0).unwrap();
        assert!(low > high);
    }

    #[test]
    fn test_rejects_non_positive_strike() {
        assert!(matches!(
            sabr().implied_volatility(0.03, 0.0, 1.0),
            Err(ModelError::NonPositiveRate { name: "strike", .. })
        ));
    }

    // ========================================
    // Surface
    // ========================================

    #[test]
    fn test_surface_bilinear_and_flat_extrapolation() {
        let a = |alpha| SabrParameters::new(alpha, 0.5, -0.25, 0.5).unwrap();
        let surface = SabrParameterSurface::new(
            vec![1.0, 5.0],
            vec![2.0, 10.0],
            vec![a(0.04), a(0.06), a(0.08), a(0.10)],
        )
        .unwrap();

        assert_relative_eq!(surface.parameters(3.0, 6.0).alpha(), 0.07, epsilon = 1e-14);
        assert_relative_eq!(surface.parameters(0.5, 1.0).alpha(), 0.04, epsilon = 1e-14);
        assert_relative_eq!(surface.parameters(9.0, 30.0).alpha(), 0.10, epsilon = 1e-14);
        assert_relative_eq!(surface.parameters(5.0, 2.0).alpha(), 0.08, epsilon = 1e-14);
    }

    #[test]
    fn test_surface_rejects_wrong_node_count() {
        assert!(SabrParameterSurface::new(vec![1.0, 2.0], vec![5.0], vec![sabr()]).is_err());
        assert!(SabrParameterSurface::new(vec![2.0, 1.0], vec![5.0], vec![sabr(), sabr()]).is_err());
    }

    #[test]
    fn test_flat_surface() {
        let surface = SabrParameterSurface::flat(sabr());
        assert_eq!(surface.parameters(7.0, 3.0), sabr());
    }
}
