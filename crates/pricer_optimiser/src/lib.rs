//! # pricer_optimiser
//!
//! Successive calibration of interest-rate models to swaption prices.
//!
//! This crate sits on top of Models (L2): it solves the inverse problem of
//! finding model parameters that reproduce a basket of target prices,
//! one bucket at a time, each bucket holding the already calibrated
//! parameters fixed.
//!
//! ## Architecture Position
//!
//! Layer 3 of the calibration stack.
//! Depends on `pricer_core` (L1) for the solvers and curves and on
//! `pricer_models` (L2) for model parameters, instruments and pricers.
//!
//! ## Modules
//!
//! - `calibration`: engine, objectives (Hull-White, G2++, LMM-DD), baskets,
//!   configuration, errors and the calibration report
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use pricer_core::market_data::curves::CurveSet;
//! use pricer_models::instruments::rates::SwaptionType;
//! use pricer_models::models::rates::HullWhiteParameters;
//! use pricer_models::pricing::{HullWhiteSwaptionPricer, ModelPriceProvider};
//! use pricer_optimiser::calibration::{
//!     calibrate, CalibrationBasket, CalibrationConfig, HullWhiteObjective,
//! };
//!
//! let curves = Arc::new(CurveSet::with_flat_discount(0.03_f64));
//!
//! // Targets generated by a known model
//! let truth = HullWhiteParameters::constant(0.05, 0.012).unwrap();
//! let provider = ModelPriceProvider::new(HullWhiteSwaptionPricer::new(), truth);
//!
//! let basket = CalibrationBasket::expiry_ladder(
//!     &[1.0, 2.0, 3.0], 5.0, 1, 0.03, 1.0e4, SwaptionType::Payer,
//! ).unwrap();
//! let objective = HullWhiteObjective::new(0.05, 0.008, curves).unwrap();
//!
//! let model = calibrate(basket, objective, provider, CalibrationConfig::default()).unwrap();
//! for sigma in model.parameters.volatilities() {
//!     assert!((sigma - 0.012).abs() < 1e-8);
//! }
//! ```

#![warn(missing_docs)]

pub mod calibration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::calibration::*;
}
