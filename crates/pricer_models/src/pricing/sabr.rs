//! SABR swaption prices used as calibration targets.

use pricer_core::market_data::curves::CurveSet;
use pricer_core::types::PricingError;

use super::TargetPriceProvider;
use crate::analytical::black_price;
use crate::instruments::rates::Swaption;
use crate::models::sabr::SabrParameterSurface;

/// Black swaption price with the SABR implied volatility of the
/// swaption's (expiry, tenor) node.
///
/// ```text
/// PV = A · Black(S, K, σ_SABR(S, K) √θ)
/// ```
///
/// with `A` the annuity and `S` the forward swap rate.
///
/// # Example
///
/// ```
/// use pricer_core::market_data::curves::CurveSet;
/// use pricer_models::instruments::rates::{Swaption, SwaptionType};
/// use pricer_models::models::sabr::{SabrParameterSurface, SabrParameters};
/// use pricer_models::pricing::{SabrSwaptionTargetProvider, TargetPriceProvider};
///
/// let surface = SabrParameterSurface::flat(SabrParameters::new(0.05, 0.5, -0.25, 0.5).unwrap());
/// let provider = SabrSwaptionTargetProvider::new(surface);
/// let curves = CurveSet::with_flat_discount(0.03_f64);
/// let swaption = Swaption::vanilla(1.0, 5.0, 1, 0.03, 1.0e6, SwaptionType::Payer).unwrap();
///
/// assert!(provider.target_price(&swaption, &curves).unwrap() > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct SabrSwaptionTargetProvider {
    surface: SabrParameterSurface,
}

impl SabrSwaptionTargetProvider {
    /// Create a provider on a parameter surface.
    pub fn new(surface: SabrParameterSurface) -> Self {
        Self { surface }
    }

    /// The parameter surface.
    pub fn surface(&self) -> &SabrParameterSurface {
        &self.surface
    }

    /// SABR implied volatility for `swaption`.
    pub fn implied_volatility(
        &self,
        swaption: &Swaption,
        curves: &CurveSet<f64>,
    ) -> Result<f64, PricingError> {
        let forward = swaption.forward_swap_rate(curves)?;
        Ok(self.surface.implied_volatility(
            swaption.expiry(),
            swaption.tenor(),
            forward,
            swaption.strike(),
        )?)
    }
}

impl TargetPriceProvider<Swaption> for SabrSwaptionTargetProvider {
    fn target_price(&self, swaption: &Swaption, curves: &CurveSet<f64>) -> Result<f64, PricingError> {
        let annuity = swaption.annuity(curves)?;
        let forward = swaption.forward_swap_rate(curves)?;
        let volatility = self.implied_volatility(swaption, curves)?;
        let std_dev = volatility * swaption.expiry().sqrt();
        let value = annuity * black_price(forward, swaption.strike(), std_dev, swaption.is_payer());
        Ok(swaption.position().sign() * value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::rates::SwaptionType;
    use crate::models::sabr::SabrParameters;
    use approx::assert_relative_eq;

    fn provider() -> SabrSwaptionTargetProvider {
        SabrSwaptionTargetProvider::new(SabrParameterSurface::flat(
            SabrParameters::new(0.05, 0.5, -0.25, 0.5).unwrap(),
        ))
    }

    #[test]
    fn test_parity_with_forward_swap() {
        let c = CurveSet::with_flat_discount(0.03_f64);
        let payer = Swaption::vanilla(2.0, 5.0, 1, 0.035, 100.0, SwaptionType::Payer).unwrap();
        let receiver = Swaption::vanilla(2.0, 5.0, 1, 0.035, 100.0, SwaptionType::Receiver).unwrap();
        let p = provider().target_price(&payer, &c).unwrap();
        let r = provider().target_price(&receiver, &c).unwrap();
        let swap = payer.cash_flow_equivalents(&c).unwrap().present_value(&c).unwrap();
        assert_relative_eq!(p - r, swap, epsilon = 1e-12);
    }

    #[test]
    fn test_uses_node_volatility() {
        let c = CurveSet::with_flat_discount(0.03_f64);
        let swaption = Swaption::vanilla(3.0, 4.0, 1, 0.03, 1.0, SwaptionType::Payer).unwrap();
        let forward = swaption.forward_swap_rate(&c).unwrap();
        let expected = SabrParameters::new(0.05, 0.5, -0.25, 0.5)
            .unwrap()
            .implied_volatility(forward, 0.03, 3.0)
            .unwrap();
        assert_relative_eq!(
            provider().implied_volatility(&swaption, &c).unwrap(),
            expected,
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_negative_strike_is_an_error() {
        let c = CurveSet::with_flat_discount(0.03_f64);
        let swaption = Swaption::vanilla(1.0, 2.0, 1, -0.01, 1.0, SwaptionType::Payer).unwrap();
        assert!(provider().target_price(&swaption, &c).is_err());
    }
}
