//! Targets generated by a model with known parameters.

use pricer_core::market_data::curves::CurveSet;
use pricer_core::types::PricingError;

use super::{Pricer, TargetPriceProvider};

/// Target prices from a pricer under fixed parameters.
///
/// Calibrating a model to its own prices recovers the generating
/// parameters, which makes this the natural provider for round-trip checks.
#[derive(Debug, Clone)]
pub struct ModelPriceProvider<P, M> {
    pricer: P,
    parameters: M,
}

impl<P, M> ModelPriceProvider<P, M> {
    /// Wrap a pricer and the parameters that generate the targets.
    pub fn new(pricer: P, parameters: M) -> Self {
        Self { pricer, parameters }
    }

    /// The generating parameters.
    pub fn parameters(&self) -> &M {
        &self.parameters
    }
}

impl<I, P, M> TargetPriceProvider<I> for ModelPriceProvider<P, M>
where
    P: Pricer<I, M>,
{
    fn target_price(&self, instrument: &I, curves: &CurveSet<f64>) -> Result<f64, PricingError> {
        self.pricer.present_value(instrument, &self.parameters, curves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::rates::{Swaption, SwaptionType};
    use crate::models::rates::HullWhiteParameters;
    use crate::pricing::HullWhiteSwaptionPricer;

    #[test]
    fn test_target_equals_model_price() {
        let c = CurveSet::with_flat_discount(0.03_f64);
        let params = HullWhiteParameters::constant(0.02, 0.011).unwrap();
        let swaption = Swaption::vanilla(1.0, 5.0, 1, 0.03, 100.0, SwaptionType::Payer).unwrap();
        let provider = ModelPriceProvider::new(HullWhiteSwaptionPricer::new(), params.clone());

        let direct = HullWhiteSwaptionPricer::new()
            .present_value(&swaption, &params, &c)
            .unwrap();
        assert_eq!(provider.target_price(&swaption, &c).unwrap(), direct);
        assert_eq!(provider.parameters(), &params);
    }
}
