//! Explicit Hull-White swaption formula (Jamshidian decomposition).
//!
//! With `dcf_i = c_i P(0, t_i)` and `α_i = α(θ, t_i)`, the swap value at
//! expiry as a function of the standard normal state `x` is
//!
//! ```text
//! V(x) = Σ dcf_i exp(-α_i x - α_i² / 2)
//! ```
//!
//! The exercise boundary `κ` solves `V(κ) = 0` and
//!
//! ```text
//! PV = ω Σ dcf_i N(-ω (κ + α_i)),   ω = +1 payer, -1 receiver
//! ```

use pricer_core::market_data::curves::CurveSet;
use pricer_core::math::solvers::{BracketConfig, BrentSolver, RootBracketer, SolverConfig};
use pricer_core::types::PricingError;

use super::{discounted_cash_flows, Pricer};
use crate::analytical::norm_cdf;
use crate::instruments::rates::Swaption;
use crate::models::rates::HullWhiteParameters;

/// Seed interval for the exercise boundary in standard deviations.
const KAPPA_SEED: (f64, f64) = (-2.0, 2.0);

/// Exercise-boundary search shared by the Gaussian pricers.
#[derive(Debug, Clone)]
pub(crate) struct ExerciseBoundary {
    bracketer: RootBracketer<f64>,
    solver: BrentSolver<f64>,
}

impl Default for ExerciseBoundary {
    fn default() -> Self {
        Self {
            bracketer: RootBracketer::new(BracketConfig::default()),
            solver: BrentSolver::new(SolverConfig::new(1e-14, 1e-12, 100)),
        }
    }
}

impl ExerciseBoundary {
    /// Option value for one-factor Gaussian bond volatilities `alpha`.
    ///
    /// Falls back to the intrinsic value `max(ω Σ dcf, 0)` when the swap
    /// value never changes sign.
    pub(crate) fn option_value(
        &self,
        dcf: &[f64],
        alpha: &[f64],
        omega: f64,
    ) -> Result<f64, PricingError> {
        let swap_value = |x: f64| -> f64 {
            dcf.iter()
                .zip(alpha)
                .map(|(d, a)| d * (-a * x - 0.5 * a * a).exp())
                .sum()
        };

        let bracket = match self.bracketer.bracket(swap_value, KAPPA_SEED.0, KAPPA_SEED.1) {
            Ok(bracket) => bracket,
            Err(_) => {
                let intrinsic: f64 = dcf.iter().sum();
                return Ok((omega * intrinsic).max(0.0));
            }
        };
        let kappa = self.solver.find_root(swap_value, bracket.low, bracket.high)?;

        Ok(omega
            * dcf
                .iter()
                .zip(alpha)
                .map(|(d, a)| d * norm_cdf(-omega * (kappa + a)))
                .sum::<f64>())
    }
}

/// Hull-White 1F swaption pricer with piecewise-constant volatility.
///
/// # Example
///
/// ```
/// use pricer_core::market_data::curves::CurveSet;
/// use pricer_models::instruments::rates::{Swaption, SwaptionType};
/// use pricer_models::models::rates::HullWhiteParameters;
/// use pricer_models::pricing::{HullWhiteSwaptionPricer, Pricer};
///
/// let curves = CurveSet::with_flat_discount(0.02_f64);
/// let params = HullWhiteParameters::constant(0.02, 0.01).unwrap();
/// let payer = Swaption::vanilla(1.0, 4.0, 1, 0.02, 100.0, SwaptionType::Payer).unwrap();
/// let receiver = Swaption::vanilla(1.0, 4.0, 1, 0.02, 100.0, SwaptionType::Receiver).unwrap();
///
/// let pricer = HullWhiteSwaptionPricer::default();
/// let p = pricer.present_value(&payer, &params, &curves).unwrap();
/// let r = pricer.present_value(&receiver, &params, &curves).unwrap();
///
/// // Payer minus receiver is the forward payer swap
/// let swap = payer.cash_flow_equivalents(&curves).unwrap().present_value(&curves).unwrap();
/// assert!((p - r - swap).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct HullWhiteSwaptionPricer {
    boundary: ExerciseBoundary,
}

impl HullWhiteSwaptionPricer {
    /// Create a pricer with default boundary search settings.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pricer<Swaption, HullWhiteParameters> for HullWhiteSwaptionPricer {
    fn present_value(
        &self,
        swaption: &Swaption,
        model: &HullWhiteParameters,
        curves: &CurveSet<f64>,
    ) -> Result<f64, PricingError> {
        let (dcf, times) = discounted_cash_flows(swaption, curves)?;
        let expiry = swaption.expiry();
        let alpha: Vec<f64> = times
            .iter()
            .map(|&t| model.bond_volatility(expiry, t))
            .collect();

        let value = self
            .boundary
            .option_value(&dcf, &alpha, swaption.swaption_type().omega())?;
        Ok(swaption.position().sign() * value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytical::black_price;
    use crate::instruments::rates::{Position, SwaptionType};
    use approx::assert_relative_eq;
    use pricer_core::market_data::curves::CurveEnum;

    fn curves() -> CurveSet<f64> {
        CurveSet::new(
            CurveEnum::interpolated(&[1.0, 2.0, 5.0, 10.0], &[0.98, 0.955, 0.87, 0.74]).unwrap(),
        )
    }

    // ========================================
    // Structural properties
    // ========================================

    #[test]
    fn test_payer_receiver_parity() {
        let c = curves();
        let params = HullWhiteParameters::constant(0.03, 0.012)
            .unwrap()
            .with_appended_segment(1.0, 0.008)
            .unwrap();
        let pricer = HullWhiteSwaptionPricer::new();
        for strike in [0.01, 0.03, 0.06] {
            let payer = Swaption::vanilla(2.0, 5.0, 2, strike, 1.0e4, SwaptionType::Payer).unwrap();
            let receiver =
                Swaption::vanilla(2.0, 5.0, 2, strike, 1.0e4, SwaptionType::Receiver).unwrap();
            let swap = payer.cash_flow_equivalents(&c).unwrap().present_value(&c).unwrap();
            let p = pricer.present_value(&payer, &params, &c).unwrap();
            let r = pricer.present_value(&receiver, &params, &c).unwrap();
            assert_relative_eq!(p - r, swap, epsilon = 1e-8);
            assert!(p > -1e-10 && r > -1e-10);
        }
    }

    #[test]
    fn test_short_position_negates() {
        let c = curves();
        let params = HullWhiteParameters::constant(0.03, 0.01).unwrap();
        let long = Swaption::vanilla(1.0, 3.0, 1, 0.03, 100.0, SwaptionType::Payer).unwrap();
        let short = long.clone().with_position(Position::Short);
        let pricer = HullWhiteSwaptionPricer::new();
        assert_eq!(
            pricer.present_value(&short, &params, &c).unwrap(),
            -pricer.present_value(&long, &params, &c).unwrap()
        );
    }

    #[test]
    fn test_monotone_in_volatility() {
        let c = curves();
        let swaption = Swaption::vanilla(3.0, 5.0, 1, 0.03, 100.0, SwaptionType::Receiver).unwrap();
        let pricer = HullWhiteSwaptionPricer::new();
        let mut previous = 0.0;
        for sigma in [0.002, 0.005, 0.01, 0.02] {
            let params = HullWhiteParameters::constant(0.02, sigma).unwrap();
            let pv = pricer.present_value(&swaption, &params, &c).unwrap();
            assert!(pv > previous);
            previous = pv;
        }
    }

    #[test]
    fn test_zero_volatility_is_intrinsic() {
        let c = curves();
        let params = HullWhiteParameters::constant(0.02, 0.0).unwrap();
        let payer = Swaption::vanilla(2.0, 5.0, 1, 0.01, 100.0, SwaptionType::Payer).unwrap();
        let swap = payer.cash_flow_equivalents(&c).unwrap().present_value(&c).unwrap();
        assert!(swap > 0.0);
        let pv = HullWhiteSwaptionPricer::new().present_value(&payer, &params, &c).unwrap();
        assert_relative_eq!(pv, swap, epsilon = 1e-12);
    }

    // ========================================
    // One-period swaption against Black on the bond
    // ========================================

    #[test]
    fn test_single_period_matches_bond_option() {
        // One cash flow pair: a receiver is a call on P(θ, t) with strike 1/(1 + δK)
        let c = CurveSet::with_flat_discount(0.03_f64);
        let (a, sigma, theta, strike) = (0.05, 0.01, 2.0, 0.03);
        let params = HullWhiteParameters::constant(a, sigma).unwrap();
        let receiver = Swaption::vanilla(theta, 1.0, 1, strike, 1.0, SwaptionType::Receiver).unwrap();
        let pv = HullWhiteSwaptionPricer::new().present_value(&receiver, &params, &c).unwrap();

        let p_theta = c.discount_factor(theta).unwrap();
        let p_t = c.discount_factor(theta + 1.0).unwrap();
        let std_dev = params.bond_volatility(theta, theta + 1.0);
        let k_bond = 1.0 / (1.0 + strike);
        let expected = (1.0 + strike) * p_theta * black_price(p_t / p_theta, k_bond, std_dev, true);
        assert_relative_eq!(pv, expected, max_relative = 1e-10);
    }
}
