//! Static dispatch over concrete curve implementations.

use super::{FlatCurve, InterpolatedCurve, YieldCurve};
use crate::market_data::error::MarketDataError;
use num_traits::Float;

/// Static dispatch enum wrapping concrete yield curves.
///
/// Avoids `dyn` dispatch in the hot pricing loops.
///
/// # Example
///
/// ```
/// use pricer_core::market_data::curves::{CurveEnum, YieldCurve};
///
/// let curve = CurveEnum::flat(0.03_f64);
/// assert!(curve.discount_factor(1.0).unwrap() < 1.0);
/// assert!(curve.is_flat());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum CurveEnum<T: Float> {
    /// Constant rate curve
    Flat(FlatCurve<T>),
    /// Pillar curve, log-linear in discount factors
    Interpolated(InterpolatedCurve<T>),
}

impl<T: Float> CurveEnum<T> {
    /// Create a flat curve variant.
    #[inline]
    pub fn flat(rate: T) -> Self {
        CurveEnum::Flat(FlatCurve::new(rate))
    }

    /// Create an interpolated curve variant from pillar discount factors.
    pub fn interpolated(times: &[T], discount_factors: &[T]) -> Result<Self, MarketDataError> {
        InterpolatedCurve::new(times, discount_factors).map(CurveEnum::Interpolated)
    }

    /// Returns true for the flat variant.
    #[inline]
    pub fn is_flat(&self) -> bool {
        matches!(self, CurveEnum::Flat(_))
    }
}

impl<T: Float> From<FlatCurve<T>> for CurveEnum<T> {
    fn from(curve: FlatCurve<T>) -> Self {
        CurveEnum::Flat(curve)
    }
}

impl<T: Float> From<InterpolatedCurve<T>> for CurveEnum<T> {
    fn from(curve: InterpolatedCurve<T>) -> Self {
        CurveEnum::Interpolated(curve)
    }
}

impl<T: Float> YieldCurve<T> for CurveEnum<T> {
    #[inline]
    fn discount_factor(&self, t: T) -> Result<T, MarketDataError> {
        match self {
            CurveEnum::Flat(c) => c.discount_factor(t),
            CurveEnum::Interpolated(c) => c.discount_factor(t),
        }
    }

    #[inline]
    fn zero_rate(&self, t: T) -> Result<T, MarketDataError> {
        match self {
            CurveEnum::Flat(c) => c.zero_rate(t),
            CurveEnum::Interpolated(c) => c.zero_rate(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_matches_inner() {
        let inner = InterpolatedCurve::new(&[1.0, 3.0], &[0.98, 0.93]).unwrap();
        let curve = CurveEnum::from(inner.clone());
        assert_eq!(
            curve.discount_factor(2.0).unwrap(),
            inner.discount_factor(2.0).unwrap()
        );
        assert!(!curve.is_flat());
    }

    #[test]
    fn test_interpolated_constructor_error() {
        assert!(CurveEnum::interpolated(&[1.0_f64], &[-1.0]).is_err());
    }
}
