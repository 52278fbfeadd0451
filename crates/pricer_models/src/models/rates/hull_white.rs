//! Hull-White one-factor model with piecewise-constant volatility.
//!
//! ```text
//! dr(t) = [θ(t) - a r(t)] dt + σ(t) dW(t)
//! ```
//!
//! `θ(t)` is implied by the initial curve and never stored. The volatility is
//! constant on segments `[t_j, t_{j+1})` with `t_0 = 0` and an unbounded last
//! segment.
//!
//! ## Usage
//!
//! ```
//! use pricer_models::models::rates::HullWhiteParameters;
//!
//! let params = HullWhiteParameters::constant(0.01, 0.01).unwrap();
//! let params = params.with_appended_segment(2.0, 0.012).unwrap();
//!
//! assert_eq!(params.segment_count(), 2);
//! assert_eq!(params.volatility_times(), &[0.0, 2.0, f64::INFINITY]);
//! assert_eq!(params.volatility_at(3.0), 0.012);
//! ```

use crate::models::error::{check_increasing, check_volatilities, ModelError};

/// Below this `|a|` the zero mean reversion limits are used.
const SMALL_MEAN_REVERSION: f64 = 1e-12;

/// `(e^{a x} - 1) / a`, continuous at `a = 0`.
#[inline]
pub(crate) fn exp_ratio(a: f64, x: f64) -> f64 {
    if a.abs() < SMALL_MEAN_REVERSION {
        x
    } else {
        (a * x).exp_m1() / a
    }
}

/// Hull-White 1F parameters.
///
/// # Fields
///
/// * `mean_reversion` - Mean reversion speed `a`
/// * `volatilities` - `σ_j` on segment `j`
/// * `volatility_times` - Segment boundaries, `0` first and `+∞` last
#[derive(Debug, Clone, PartialEq)]
pub struct HullWhiteParameters {
    mean_reversion: f64,
    volatilities: Vec<f64>,
    volatility_times: Vec<f64>,
}

impl HullWhiteParameters {
    /// Create parameters from explicit segments.
    ///
    /// `volatility_times` holds the interior boundaries only; `0` and `+∞`
    /// are added, so `volatilities.len()` must be one more than
    /// `volatility_times.len()`.
    ///
    /// # Errors
    ///
    /// - `InvalidMeanReversion` for a non-finite `a`
    /// - `InvalidVolatility` for a negative or non-finite `σ_j`
    /// - `NonIncreasingTimes` unless `0 < t_1 < ... < t_{n-1} < ∞`
    /// - `DimensionMismatch` on inconsistent lengths
    pub fn new(
        mean_reversion: f64,
        volatilities: Vec<f64>,
        volatility_times: Vec<f64>,
    ) -> Result<Self, ModelError> {
        if !mean_reversion.is_finite() {
            return Err(ModelError::InvalidMeanReversion(mean_reversion));
        }
        if volatilities.len() != volatility_times.len() + 1 {
            return Err(ModelError::dimension_mismatch(
                "Hull-White volatilities",
                volatility_times.len() + 1,
                volatilities.len(),
            ));
        }
        check_volatilities(&volatilities, 0)?;

        let mut times = Vec::with_capacity(volatility_times.len() + 2);
        times.push(0.0);
        times.extend(volatility_times);
        times.push(f64::INFINITY);
        check_increasing(&times)?;

        Ok(Self {
            mean_reversion,
            volatilities,
            volatility_times: times,
        })
    }

    /// Single constant volatility.
    pub fn constant(mean_reversion: f64, volatility: f64) -> Result<Self, ModelError> {
        Self::new(mean_reversion, vec![volatility], Vec::new())
    }

    /// Mean reversion speed.
    #[inline]
    pub fn mean_reversion(&self) -> f64 {
        self.mean_reversion
    }

    /// Volatility per segment.
    #[inline]
    pub fn volatilities(&self) -> &[f64] {
        &self.volatilities
    }

    /// Segment boundaries including `0` and `+∞`.
    #[inline]
    pub fn volatility_times(&self) -> &[f64] {
        &self.volatility_times
    }

    /// Number of volatility segments.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.volatilities.len()
    }

    /// Volatility in force at time `t`.
    pub fn volatility_at(&self, t: f64) -> f64 {
        let j = self.volatility_times[1..].partition_point(|&b| b <= t);
        self.volatilities[j.min(self.volatilities.len() - 1)]
    }

    /// Overwrite the volatility of segment `index`.
    pub fn set_volatility(&mut self, index: usize, volatility: f64) -> Result<(), ModelError> {
        let len = self.volatilities.len();
        if index >= len {
            return Err(ModelError::IndexOutOfRange {
                what: "Hull-White segments",
                index,
                len,
            });
        }
        check_volatilities(&[volatility], index)?;
        self.volatilities[index] = volatility;
        Ok(())
    }

    /// Copy with segment `index` set to `volatility`.
    pub fn with_segment(&self, index: usize, volatility: f64) -> Result<Self, ModelError> {
        let mut params = self.clone();
        params.set_volatility(index, volatility)?;
        Ok(params)
    }

    /// Split the last segment at `start` and give the new tail `volatility`.
    ///
    /// # Errors
    ///
    /// `NonIncreasingTimes` unless `start` lies strictly after the last
    /// finite boundary.
    pub fn append_segment(&mut self, start: f64, volatility: f64) -> Result<(), ModelError> {
        let n = self.volatility_times.len();
        let last_finite = self.volatility_times[n - 2];
        if !start.is_finite() || start <= last_finite {
            return Err(ModelError::NonIncreasingTimes {
                index: n - 1,
                time: start,
            });
        }
        check_volatilities(&[volatility], self.volatilities.len())?;
        self.volatility_times.insert(n - 1, start);
        self.volatilities.push(volatility);
        Ok(())
    }

    /// Copy with one more segment starting at `start`.
    pub fn with_appended_segment(&self, start: f64, volatility: f64) -> Result<Self, ModelError> {
        let mut params = self.clone();
        params.append_segment(start, volatility)?;
        Ok(params)
    }

    /// Volatility of the zero-coupon bond maturing at `maturity` relative to
    /// the bond maturing at `expiry`, integrated up to `expiry`:
    ///
    /// ```text
    /// α(θ, t)² = [(e^{-aθ} - e^{-at}) / a]² · Σ_j σ_j² (e^{2a s_{j+1}} - e^{2a s_j}) / (2a)
    /// ```
    ///
    /// with segments clipped to `[0, θ]`.
    pub fn bond_volatility(&self, expiry: f64, maturity: f64) -> f64 {
        let a = self.mean_reversion;
        // (e^{-aθ} - e^{-at}) / a = e^{-aθ} (1 - e^{-a(t-θ)}) / a
        let factor = (-a * expiry).exp() * exp_ratio(-a, maturity - expiry);

        let mut variance = 0.0;
        for (j, &sigma) in self.volatilities.iter().enumerate() {
            let s0 = self.volatility_times[j];
            if s0 >= expiry {
                break;
            }
            let s1 = self.volatility_times[j + 1].min(expiry);
            // (e^{2a s1} - e^{2a s0}) / (2a)
            variance += sigma * sigma * (2.0 * a * s0).exp() * exp_ratio(2.0 * a, s1 - s0);
        }
        factor * variance.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ========================================
    // Construction and editing
    // ========================================

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(HullWhiteParameters::constant(f64::NAN, 0.01).is_err());
        assert!(HullWhiteParameters::constant(0.01, -0.01).is_err());
        assert!(HullWhiteParameters::new(0.01, vec![0.01, 0.01], vec![]).is_err());
        assert!(HullWhiteParameters::new(0.01, vec![0.01, 0.01, 0.01], vec![2.0, 1.0]).is_err());
        assert!(HullWhiteParameters::new(0.01, vec![0.01, 0.01], vec![0.0]).is_err());
    }

    #[test]
    fn test_append_and_set_segment() {
        let mut params = HullWhiteParameters::constant(0.02, 0.01).unwrap();
        params.append_segment(1.0, 0.01).unwrap();
        params.append_segment(3.0, 0.01).unwrap();
        params.set_volatility(2, 0.015).unwrap();

        assert_eq!(params.volatility_times(), &[0.0, 1.0, 3.0, f64::INFINITY]);
        assert_eq!(params.volatilities(), &[0.01, 0.01, 0.015]);
        assert_eq!(params.volatility_at(0.5), 0.01);
        assert_eq!(params.volatility_at(3.0), 0.015);
        assert!(params.append_segment(3.0, 0.01).is_err());
        assert!(params.set_volatility(3, 0.01).is_err());
    }

    #[test]
    fn test_with_segment_leaves_original() {
        let params = HullWhiteParameters::constant(0.02, 0.01).unwrap();
        let bumped = params.with_segment(0, 0.02).unwrap();
        assert_eq!(params.volatilities(), &[0.01]);
        assert_eq!(bumped.volatilities(), &[0.02]);
    }

    // ========================================
    // Bond volatility
    // ========================================

    #[test]
    fn test_bond_volatility_constant_closed_form() {
        let (a, sigma, theta, t) = (0.05, 0.01, 2.0, 5.0);
        let params = HullWhiteParameters::constant(a, sigma).unwrap();
        let expected = ((-a * theta).exp() - (-a * t).exp()) / a
            * sigma
            * (((2.0 * a * theta).exp() - 1.0) / (2.0 * a)).sqrt();
        assert_relative_eq!(params.bond_volatility(theta, t), expected, max_relative = 1e-13);
    }

    #[test]
    fn test_bond_volatility_zero_mean_reversion_limit() {
        // a = 0: (t - θ) σ √θ
        let params = HullWhiteParameters::constant(0.0, 0.01).unwrap();
        assert_relative_eq!(params.bond_volatility(4.0, 6.0), 2.0 * 0.01 * 2.0, epsilon = 1e-15);
        let nearly = HullWhiteParameters::constant(1e-9, 0.01).unwrap();
        assert_relative_eq!(nearly.bond_volatility(4.0, 6.0), 0.04, max_relative = 1e-7);
    }

    #[test]
    fn test_segments_after_expiry_are_ignored() {
        let base = HullWhiteParameters::constant(0.03, 0.01).unwrap();
        let split = base.with_appended_segment(2.0, 0.05).unwrap();
        assert_relative_eq!(
            base.bond_volatility(2.0, 7.0),
            split.bond_volatility(2.0, 7.0),
            max_relative = 1e-14
        );
        assert!(split.bond_volatility(3.0, 7.0) > base.bond_volatility(3.0, 7.0));
    }
}
