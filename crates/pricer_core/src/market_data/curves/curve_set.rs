//! Discount and forward-projection curves used by pricers.

use super::{CurveEnum, YieldCurve};
use crate::market_data::error::MarketDataError;
use num_traits::Float;

/// Market context handed to every pricer.
///
/// Holds the discount curve and an optional forward-projection curve for
/// the floating index. Without a forward curve the set is single-curve and
/// forwards are projected off the discount curve.
///
/// # Type Parameters
///
/// * `T` - Floating-point type (e.g., `f64`)
///
/// # Example
///
/// ```
/// use pricer_core::market_data::curves::{CurveEnum, CurveSet};
///
/// let single = CurveSet::with_flat_discount(0.03_f64);
/// assert!(single.is_single_curve());
///
/// let dual = CurveSet::new(CurveEnum::flat(0.03_f64)).with_forward(CurveEnum::flat(0.035));
/// let f = dual.ibor_forward(1.0, 1.5, 0.5).unwrap();
/// assert!((f - ((0.0175_f64).exp() - 1.0) / 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CurveSet<T: Float> {
    discount: CurveEnum<T>,
    forward: Option<CurveEnum<T>>,
}

impl<T: Float> CurveSet<T> {
    /// Create a single-curve set.
    #[inline]
    pub fn new(discount: CurveEnum<T>) -> Self {
        Self {
            discount,
            forward: None,
        }
    }

    /// Create a single-curve set on a flat discount rate.
    pub fn with_flat_discount(rate: T) -> Self {
        Self::new(CurveEnum::flat(rate))
    }

    /// Attach a forward-projection curve.
    pub fn with_forward(mut self, forward: CurveEnum<T>) -> Self {
        self.forward = Some(forward);
        self
    }

    /// The discount curve.
    #[inline]
    pub fn discount_curve(&self) -> &CurveEnum<T> {
        &self.discount
    }

    /// The forward curve, falling back to the discount curve.
    #[inline]
    pub fn forward_curve(&self) -> &CurveEnum<T> {
        self.forward.as_ref().unwrap_or(&self.discount)
    }

    /// Returns true when forwards are projected off the discount curve.
    #[inline]
    pub fn is_single_curve(&self) -> bool {
        self.forward.is_none()
    }

    /// Discount factor from the discount curve.
    #[inline]
    pub fn discount_factor(&self, t: T) -> Result<T, MarketDataError> {
        self.discount.discount_factor(t)
    }

    /// Simply compounded index forward for `[start, end]` from the forward curve.
    pub fn ibor_forward(&self, start: T, end: T, accrual: T) -> Result<T, MarketDataError> {
        self.forward_curve().simple_forward(start, end, accrual)
    }

    /// Multiplicative spread between forward projection and discounting:
    ///
    /// ```text
    /// β = (1 + δ F) · D(end) / D(start)
    /// ```
    ///
    /// Equal to one in a single-curve set.
    pub fn basis_factor(&self, start: T, end: T, accrual: T) -> Result<T, MarketDataError> {
        if self.is_single_curve() {
            return Ok(T::one());
        }
        let forward = self.ibor_forward(start, end, accrual)?;
        let df_start = self.discount.discount_factor(start)?;
        let df_end = self.discount.discount_factor(end)?;
        Ok((T::one() + accrual * forward) * df_end / df_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_curve_forward_uses_discount() {
        let curves = CurveSet::with_flat_discount(0.03_f64);
        let f = curves.ibor_forward(2.0, 3.0, 1.0).unwrap();
        assert_relative_eq!(f, (0.03_f64).exp() - 1.0, epsilon = 1e-14);
        assert_eq!(curves.basis_factor(2.0, 3.0, 1.0).unwrap(), 1.0);
    }

    #[test]
    fn test_dual_curve_basis_factor() {
        let curves = CurveSet::new(CurveEnum::flat(0.03_f64)).with_forward(CurveEnum::flat(0.04));
        let beta = curves.basis_factor(1.0, 2.0, 1.0).unwrap();
        // (1 + F) = e^{0.04}, D(2)/D(1) = e^{-0.03}
        assert_relative_eq!(beta, (0.01_f64).exp(), epsilon = 1e-14);
        assert!(!curves.is_single_curve());
    }

    #[test]
    fn test_forward_rejects_bad_accrual() {
        let curves = CurveSet::with_flat_discount(0.03_f64);
        assert!(curves.ibor_forward(1.0, 2.0, -1.0).is_err());
    }
}
