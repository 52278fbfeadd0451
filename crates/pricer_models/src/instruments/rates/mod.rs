//! Interest rate instruments.
//!
//! - [`Swaption`]: European physical-delivery swaption on a fixed-vs-ibor swap
//! - [`FixedLeg`]: payment times, accruals and per-period notionals (bullet or amortising)
//! - [`CashFlowEquivalents`]: the swap reduced to signed amounts at dates
//!
//! # Examples
//!
//! ```
//! use pricer_core::market_data::curves::CurveSet;
//! use pricer_models::instruments::rates::{Swaption, SwaptionType};
//!
//! let curves = CurveSet::with_flat_discount(0.03_f64);
//! let swaption = Swaption::vanilla(2.0, 5.0, 1, 0.03, 1.0e6, SwaptionType::Payer).unwrap();
//!
//! let rate = swaption.forward_swap_rate(&curves).unwrap();
//! assert!((rate - ((0.03_f64).exp() - 1.0)).abs() < 1e-12);
//! ```

mod cash_flow;
mod swaption;

pub use cash_flow::CashFlowEquivalents;
pub use swaption::{FixedLeg, Position, Swaption, SwaptionType};
