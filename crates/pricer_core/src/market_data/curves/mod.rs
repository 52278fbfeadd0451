//! Yield curve abstractions.
//!
//! This module provides:
//! - [`YieldCurve`]: Generic trait for discount factor and rate calculations
//! - [`FlatCurve`]: Constant rate yield curve implementation
//! - [`InterpolatedCurve`]: Pillar-based curve, log-linear in discount factors
//! - [`CurveEnum`]: Static dispatch enum wrapping concrete curve implementations
//! - [`CurveSet`]: Discount curve plus optional forward-projection curve

mod curve_enum;
mod curve_set;
mod flat;
mod interpolated;
mod traits;

pub use curve_enum::CurveEnum;
pub use curve_set::CurveSet;
pub use flat::FlatCurve;
pub use interpolated::InterpolatedCurve;
pub use traits::YieldCurve;
