//! Swaption pricer for the displaced-diffusion LMM.
//!
//! The receiver swaption is a call on the fixed-rate bond `B = Σ c_k P_k / P_0`
//! struck at the notional paid at the start. The bond is approximated as
//! lognormal with a volatility obtained by freezing the rate weights at a
//! mid point `x̄` between today's bond value and the strike; Black's
//! formula then gives the price.

use pricer_core::market_data::curves::CurveSet;
use pricer_core::types::PricingError;

use super::Pricer;
use crate::analytical::black_price;
use crate::instruments::rates::Swaption;
use crate::models::rates::hull_white::exp_ratio;
use crate::models::rates::LmmDdParameters;

/// Frozen-weight LMM-DD swaption pricer.
///
/// Every cash-flow-equivalent date must sit on the model's ibor grid;
/// dates on the grid without a cash flow carry a zero amount.
///
/// # Example
///
/// ```
/// use pricer_core::market_data::curves::CurveSet;
/// use pricer_models::instruments::rates::{Swaption, SwaptionType};
/// use pricer_models::models::rates::LmmDdParameters;
/// use pricer_models::pricing::{LmmDdSwaptionPricer, Pricer};
///
/// let curves = CurveSet::with_flat_discount(0.03_f64);
/// let lmm = LmmDdParameters::regular_two_factor(0.0, 20, 2, 0.1, 0.2, 0.01).unwrap();
/// let swaption = Swaption::vanilla(2.0, 5.0, 2, 0.03, 1.0e4, SwaptionType::Payer).unwrap();
///
/// let pv = LmmDdSwaptionPricer.present_value(&swaption, &lmm, &curves).unwrap();
/// assert!(pv > 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LmmDdSwaptionPricer;

impl Pricer<Swaption, LmmDdParameters> for LmmDdSwaptionPricer {
    fn present_value(
        &self,
        swaption: &Swaption,
        model: &LmmDdParameters,
        curves: &CurveSet<f64>,
    ) -> Result<f64, PricingError> {
        let cfe = swaption.cash_flow_equivalents(curves)?;
        let expiry = swaption.expiry();
        let ibor_times = model.ibor_times();
        let delta = model.accrual_factors();
        let displacement = model.displacements();
        let gamma = model.volatilities();
        let factors = model.factor_count();

        // Receiver-bond amounts on the ibor grid
        let indices = cfe
            .times()
            .iter()
            .map(|&t| model.index_of_time(t))
            .collect::<Result<Vec<_>, _>>()?;
        let start = indices[0];
        let periods = indices[indices.len() - 1] - start;
        if periods == 0 {
            return Err(PricingError::invalid_input(
                "swaption cash flows collapse onto one ibor date",
            ));
        }
        let mut cfa = vec![0.0; periods + 1];
        for (&index, &amount) in indices.iter().zip(cfe.amounts()) {
            cfa[index - start] -= amount;
        }

        let df = ibor_times[start..=start + periods]
            .iter()
            .map(|&t| curves.discount_factor(t))
            .collect::<Result<Vec<_>, _>>()?;
        let libor0: Vec<f64> = (0..periods)
            .map(|k| (df[k] / df[k + 1] - 1.0) / delta[start + k])
            .collect();

        // Amount paid at ibor date k; the start date carries the strike
        let amount_at = |k: usize| if k == 0 { 0.0 } else { cfa[k] };
        let p0: Vec<f64> = df.iter().map(|d| d / df[0]).collect();
        let dp: Vec<f64> = (0..=periods).map(|k| amount_at(k) * p0[k]).collect();
        let b0: f64 = dp.iter().sum();
        let b_strike = -cfa[0];
        let b_mid = 0.5 * (b0 + b_strike);

        let impact = exp_ratio(2.0 * model.mean_reversion(), expiry);

        // Cumulated rate volatilities μ_k = Σ_{j<=k} ratio_j γ_j
        let cumulate = |libor: &[f64]| -> Vec<Vec<f64>> {
            let mut mu = vec![vec![0.0; factors]; periods];
            let mut running = vec![0.0; factors];
            for k in 0..periods {
                let j = start + k;
                let ratio = (libor[k] + displacement[j]) / (libor[k] + 1.0 / delta[j]);
                for f in 0..factors {
                    running[f] += ratio * gamma[j][f];
                }
                mu[k].clone_from(&running);
            }
            mu
        };

        let mu0 = cumulate(&libor0);
        let mut tau2 = vec![0.0; periods + 1];
        for k in 0..periods {
            tau2[k + 1] = mu0[k].iter().map(|m| m * m).sum::<f64>() * impact;
        }
        let tau: Vec<f64> = tau2.iter().map(|t| t.sqrt()).collect();

        let numerator: f64 = -b_mid
            + dp.iter()
                .zip(&tau2)
                .map(|(d, t2)| d - 0.5 * d * t2)
                .sum::<f64>();
        let denominator: f64 = dp.iter().zip(&tau).map(|(d, t)| d * t).sum();
        if denominator == 0.0 {
            // No volatility: intrinsic value
            let intrinsic = if swaption.is_payer() {
                b_strike - b0
            } else {
                b0 - b_strike
            };
            return Ok(swaption.position().sign() * df[0] * intrinsic.max(0.0));
        }
        let x_bar = numerator / denominator;

        let p_mid: Vec<f64> = p0
            .iter()
            .zip(tau.iter().zip(&tau2))
            .map(|(p, (t, t2))| p * (1.0 - x_bar * t - 0.5 * t2))
            .collect();
        let libor_mid: Vec<f64> = (0..periods)
            .map(|k| (p_mid[k] / p_mid[k + 1] - 1.0) / delta[start + k])
            .collect();
        let mu_mid = cumulate(&libor_mid);

        let mut sigma = vec![0.0; factors];
        for k in 0..periods {
            let weight = amount_at(k + 1) * p_mid[k + 1] / b_mid;
            for f in 0..factors {
                sigma[f] += weight * mu_mid[k][f];
            }
        }
        let total_std_dev = (sigma.iter().map(|s| s * s).sum::<f64>() * impact).sqrt();
        if !total_std_dev.is_finite() {
            return Err(PricingError::NumericalInstability(format!(
                "LMM bond volatility for swaption expiring at {}",
                expiry
            )));
        }

        let value = df[0] * black_price(b0, b_strike, total_std_dev, !swaption.is_payer());
        Ok(swaption.position().sign() * value)
    }
}
