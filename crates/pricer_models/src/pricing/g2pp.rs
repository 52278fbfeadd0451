//! G2++ swaption pricer by integration over the first factor.
//!
//! With the factor covariance `Γ` at expiry decomposed as `Γ = L Lᵀ`, the
//! bond at expiry reads `exp(-b_i z₁ - c_i z₂ - (b_i² + c_i²) / 2)` with
//!
//! ```text
//! b_i = H₁ᵢ L₁₁ + H₂ᵢ L₂₁
//! c_i = H₂ᵢ L₂₂
//! ```
//!
//! Conditional on `z₁` the payoff is a one-factor Gaussian swaption priced
//! in closed form; the outer expectation uses Simpson's rule.

use pricer_core::market_data::curves::CurveSet;
use pricer_core::types::PricingError;

use super::hull_white::ExerciseBoundary;
use super::{discounted_cash_flows, Pricer};
use crate::analytical::norm_pdf;
use crate::instruments::rates::Swaption;
use crate::models::rates::G2ppParameters;

/// Integration range in standard deviations.
const INTEGRATION_LIMIT: f64 = 8.0;

/// Default number of Simpson intervals.
const DEFAULT_INTERVALS: usize = 64;

/// G2++ swaption pricer.
#[derive(Debug, Clone)]
pub struct G2ppSwaptionPricer {
    intervals: usize,
    boundary: ExerciseBoundary,
}

impl Default for G2ppSwaptionPricer {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVALS)
    }
}

impl G2ppSwaptionPricer {
    /// Pricer with `intervals` Simpson intervals on `[-8, 8]`, rounded up
    /// to an even count.
    pub fn new(intervals: usize) -> Self {
        let intervals = intervals.max(2);
        Self {
            intervals: intervals + intervals % 2,
            boundary: ExerciseBoundary::default(),
        }
    }

    /// Number of Simpson intervals.
    pub fn intervals(&self) -> usize {
        self.intervals
    }
}

impl Pricer<Swaption, G2ppParameters> for G2ppSwaptionPricer {
    fn present_value(
        &self,
        swaption: &Swaption,
        model: &G2ppParameters,
        curves: &CurveSet<f64>,
    ) -> Result<f64, PricingError> {
        let (dcf, times) = discounted_cash_flows(swaption, curves)?;
        let expiry = swaption.expiry();
        let omega = swaption.swaption_type().omega();

        let gamma = model.factor_covariance(expiry);
        let l11 = gamma[0][0].max(0.0).sqrt();
        let l21 = if l11 > 0.0 { gamma[0][1] / l11 } else { 0.0 };
        let l22 = (gamma[1][1] - l21 * l21).max(0.0).sqrt();

        let (b, c): (Vec<f64>, Vec<f64>) = times
            .iter()
            .map(|&t| {
                let h1 = model.loading(0, expiry, t);
                let h2 = model.loading(1, expiry, t);
                (h1 * l11 + h2 * l21, h2 * l22)
            })
            .unzip();

        let n = self.intervals;
        let h = 2.0 * INTEGRATION_LIMIT / n as f64;
        let mut conditional = vec![0.0; dcf.len()];
        let mut integral = 0.0;
        for k in 0..=n {
            let z1 = -INTEGRATION_LIMIT + k as f64 * h;
            for ((out, d), bi) in conditional.iter_mut().zip(&dcf).zip(&b) {
                *out = d * (-bi * z1 - 0.5 * bi * bi).exp();
            }
            let value = self.boundary.option_value(&conditional, &c, omega)?;
            let weight = if k == 0 || k == n {
                1.0
            } else if k % 2 == 1 {
                4.0
            } else {
                2.0
            };
            integral += weight * norm_pdf(z1) * value;
        }

        Ok(swaption.position().sign() * integral * h / 3.0)
    }
}
