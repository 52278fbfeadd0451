//! Pricing contracts and closed-form swaption pricers.
//!
//! Calibration treats pricing as a black box behind two traits:
//!
//! - [`Pricer`]: model price of an instrument under a parameter set
//! - [`TargetPriceProvider`]: the market (or reference model) price to match
//!
//! Implementations are stateless and read the curves only, so one pricer
//! can be shared across threads.
//!
//! # Example
//!
//! ```
//! use pricer_core::market_data::curves::CurveSet;
//! use pricer_models::instruments::rates::{Swaption, SwaptionType};
//! use pricer_models::models::rates::HullWhiteParameters;
//! use pricer_models::pricing::{HullWhiteSwaptionPricer, Pricer};
//!
//! let curves = CurveSet::with_flat_discount(0.03_f64);
//! let swaption = Swaption::vanilla(2.0, 5.0, 1, 0.03, 1.0e6, SwaptionType::Payer).unwrap();
//! let params = HullWhiteParameters::constant(0.01, 0.01).unwrap();
//!
//! let pv = HullWhiteSwaptionPricer::default()
//!     .present_value(&swaption, &params, &curves)
//!     .unwrap();
//! assert!(pv > 0.0);
//! ```

mod g2pp;
mod hull_white;
mod lmm_dd;
mod model_target;
mod sabr;

pub use g2pp::G2ppSwaptionPricer;
pub use hull_white::HullWhiteSwaptionPricer;
pub use lmm_dd::LmmDdSwaptionPricer;
pub use model_target::ModelPriceProvider;
pub use sabr::SabrSwaptionTargetProvider;

use pricer_core::market_data::curves::CurveSet;
use pricer_core::types::PricingError;

use crate::instruments::rates::Swaption;

/// Model price of an instrument.
///
/// # Type Parameters
///
/// * `I` - Instrument type
/// * `M` - Model parameter type
pub trait Pricer<I, M> {
    /// Present value of `instrument` under `model` today.
    fn present_value(
        &self,
        instrument: &I,
        model: &M,
        curves: &CurveSet<f64>,
    ) -> Result<f64, PricingError>;
}

/// Source of the prices a calibration must reproduce.
pub trait TargetPriceProvider<I> {
    /// Target present value of `instrument` today.
    fn target_price(&self, instrument: &I, curves: &CurveSet<f64>) -> Result<f64, PricingError>;
}

impl<I, M, P: Pricer<I, M> + ?Sized> Pricer<I, M> for &P {
    fn present_value(
        &self,
        instrument: &I,
        model: &M,
        curves: &CurveSet<f64>,
    ) -> Result<f64, PricingError> {
        (**self).present_value(instrument, model, curves)
    }
}

impl<I, T: TargetPriceProvider<I> + ?Sized> TargetPriceProvider<I> for &T {
    fn target_price(&self, instrument: &I, curves: &CurveSet<f64>) -> Result<f64, PricingError> {
        (**self).target_price(instrument, curves)
    }
}

/// Cash-flow equivalents as `(discounted amounts, times)`.
///
/// Every time is at or after expiry since a swaption settles no earlier
/// than it expires.
pub(crate) fn discounted_cash_flows(
    swaption: &Swaption,
    curves: &CurveSet<f64>,
) -> Result<(Vec<f64>, Vec<f64>), PricingError> {
    let cfe = swaption.cash_flow_equivalents(curves)?;
    let discounted = cfe.discounted_amounts(curves)?;
    Ok((discounted, cfe.times().to_vec()))
}
