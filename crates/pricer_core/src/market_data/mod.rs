//! Market data structures for swaption pricing and calibration.
//!
//! # Components
//!
//! - [`curves`]: Yield curve trait, flat and pillar-interpolated curves, and the
//!   discount/forward [`CurveSet`] passed to every pricer
//! - [`error`]: Market data error types (MarketDataError)
//!
//! All curves are generic over `T: Float`.
//!
//! # Example
//!
//! ```
//! use pricer_core::market_data::curves::{CurveSet, YieldCurve};
//!
//! let curves = CurveSet::with_flat_discount(0.03_f64);
//! let df = curves.discount_factor(2.0).unwrap();
//! assert!((df - (-0.06_f64).exp()).abs() < 1e-14);
//! ```

pub mod curves;
pub mod error;

// Re-export commonly used types
pub use curves::{CurveEnum, CurveSet, FlatCurve, InterpolatedCurve, YieldCurve};
pub use error::MarketDataError;
