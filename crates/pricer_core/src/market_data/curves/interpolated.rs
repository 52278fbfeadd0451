//! Pillar-based yield curve, log-linear in discount factors.

use super::YieldCurve;
use crate::market_data::error::MarketDataError;
use num_traits::Float;

/// Yield curve defined by discount factors at pillar times.
///
/// `ln D(t)` is interpolated linearly between pillars, which gives
/// piecewise-constant instantaneous forwards. A pillar at `t = 0` with
/// `D = 1` is implied when the first pillar is later. Beyond the last
/// pillar the last forward is extended.
///
/// # Example
///
/// ```
/// use pricer_core::market_data::curves::{InterpolatedCurve, YieldCurve};
///
/// let curve = InterpolatedCurve::from_zero_rates(&[1.0, 5.0, 10.0], &[0.02, 0.03, 0.035]).unwrap();
/// let df = curve.discount_factor(5.0).unwrap();
/// assert!((df - (-0.15_f64).exp()).abs() < 1e-14);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedCurve<T: Float> {
    times: Vec<T>,
    log_dfs: Vec<T>,
}

impl<T: Float> InterpolatedCurve<T> {
    /// Build a curve from pillar discount factors.
    ///
    /// # Errors
    ///
    /// * `InsufficientData` - No pillars
    /// * `UnsortedPillars` - Times not strictly increasing or negative
    /// * `InvalidDiscountFactor` - A discount factor is not positive and finite
    pub fn new(times: &[T], discount_factors: &[T]) -> Result<Self, MarketDataError> {
        if times.is_empty() || times.len() != discount_factors.len() {
            return Err(MarketDataError::InsufficientData {
                got: times.len().min(discount_factors.len()),
                need: 1,
            });
        }

        let mut grid = Vec::with_capacity(times.len() + 1);
        let mut log_dfs = Vec::with_capacity(times.len() + 1);
        if times[0] > T::zero() {
            grid.push(T::zero());
            log_dfs.push(T::zero());
        }

        for (i, (&t, &df)) in times.iter().zip(discount_factors).enumerate() {
            if t < T::zero() || grid.last().map_or(false, |&prev| t <= prev) {
                return Err(MarketDataError::UnsortedPillars { index: i });
            }
            if !(df > T::zero()) || !df.is_finite() {
                return Err(MarketDataError::InvalidDiscountFactor {
                    t: t.to_f64().unwrap_or(f64::NAN),
                    df: df.to_f64().unwrap_or(f64::NAN),
                });
            }
            grid.push(t);
            log_dfs.push(df.ln());
        }

        Ok(Self {
            times: grid,
            log_dfs,
        })
    }

    /// Build a curve from continuously compounded zero rates.
    pub fn from_zero_rates(times: &[T], zero_rates: &[T]) -> Result<Self, MarketDataError> {
        let dfs: Vec<T> = times
            .iter()
            .zip(zero_rates)
            .map(|(&t, &r)| (-r * t).exp())
            .collect();
        Self::new(times, &dfs)
    }

    /// Pillar times, including the implied origin.
    pub fn pillars(&self) -> &[T] {
        &self.times
    }

    fn log_df(&self, t: T) -> T {
        let n = self.times.len();
        if n == 1 {
            // Single pillar at the origin
            return self.log_dfs[0];
        }

        // Segment index with times[i] <= t < times[i + 1], clamped to the ends
        let i = match self.times.iter().position(|&pillar| pillar > t) {
            Some(0) => 0,
            Some(k) => k - 1,
            None => n - 2,
        };
        let (t0, t1) = (self.times[i], self.times[i + 1]);
        let (y0, y1) = (self.log_dfs[i], self.log_dfs[i + 1]);
        y0 + (y1 - y0) * (t - t0) / (t1 - t0)
    }
}

impl<T: Float> YieldCurve<T> for InterpolatedCurve<T> {
    fn discount_factor(&self, t: T) -> Result<T, MarketDataError> {
        if t < T::zero() || t.is_nan() {
            return Err(MarketDataError::InvalidMaturity {
                t: t.to_f64().unwrap_or(0.0),
            });
        }
        Ok(self.log_df(t).exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_curve() -> InterpolatedCurve<f64> {
        InterpolatedCurve::from_zero_rates(&[1.0, 2.0, 5.0], &[0.02, 0.025, 0.03]).unwrap()
    }

    #[test]
    fn test_reprices_pillars() {
        let curve = sample_curve();
        assert_relative_eq!(curve.discount_factor(0.0).unwrap(), 1.0, epsilon = 1e-15);
        assert_relative_eq!(curve.discount_factor(2.0).unwrap(), (-0.05_f64).exp(), epsilon = 1e-14);
        assert_relative_eq!(curve.discount_factor(5.0).unwrap(), (-0.15_f64).exp(), epsilon = 1e-14);
    }

    #[test]
    fn test_log_linear_between_pillars() {
        let curve = sample_curve();
        let mid = curve.discount_factor(1.5).unwrap();
        let expected = (-0.035_f64).exp();
        assert_relative_eq!(mid, expected, epsilon = 1e-14);
    }

    #[test]
    fn test_constant_forward_within_segment() {
        let curve = sample_curve();
        let f1 = curve.forward_rate(2.5, 3.0).unwrap();
        let f2 = curve.forward_rate(4.0, 4.5).unwrap();
        assert_relative_eq!(f1, f2, epsilon = 1e-12);
        assert_relative_eq!(f1, (0.15 - 0.05) / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_extrapolates_last_forward() {
        let curve = sample_curve();
        let f = curve.forward_rate(6.0, 8.0).unwrap();
        assert_relative_eq!(f, (0.15 - 0.05) / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_bad_pillars() {
        assert!(matches!(
            InterpolatedCurve::new(&[2.0, 1.0], &[0.98, 0.99]),
            Err(MarketDataError::UnsortedPillars { index: 1 })
        ));
        assert!(matches!(
            InterpolatedCurve::new(&[1.0], &[0.0]),
            Err(MarketDataError::InvalidDiscountFactor { .. })
        ));
        assert!(matches!(
            InterpolatedCurve::<f64>::new(&[], &[]),
            Err(MarketDataError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_negative_time_rejected() {
        let curve = sample_curve();
        assert!(curve.discount_factor(-1.0).is_err());
    }
}
