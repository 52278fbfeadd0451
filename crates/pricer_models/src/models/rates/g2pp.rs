//! G2++ two-factor Gaussian model with piecewise-constant volatilities.
//!
//! ```text
//! r(t) = x₁(t) + x₂(t) + φ(t)
//! dx_k = -a_k x_k dt + σ_k(t) dW_k,   dW₁ dW₂ = ρ dt
//! ```
//!
//! Both factors share the segment grid `[t_j, t_{j+1})`.

use super::hull_white::exp_ratio;
use crate::models::error::{check_increasing, check_volatilities, ModelError};

/// G2++ parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct G2ppParameters {
    mean_reversions: [f64; 2],
    volatilities: [Vec<f64>; 2],
    volatility_times: Vec<f64>,
    correlation: f64,
}

impl G2ppParameters {
    /// Create parameters from explicit segments.
    ///
    /// # Arguments
    ///
    /// * `mean_reversions` - `[a₁, a₂]`
    /// * `volatilities` - `[σ₁, σ₂]`, one value per segment each
    /// * `volatility_times` - Interior segment boundaries (`0` and `+∞` are implied)
    /// * `correlation` - `ρ` in [-1, 1]
    pub fn new(
        mean_reversions: [f64; 2],
        volatilities: [Vec<f64>; 2],
        volatility_times: Vec<f64>,
        correlation: f64,
    ) -> Result<Self, ModelError> {
        if let Some(&a) = mean_reversions.iter().find(|a| !a.is_finite()) {
            return Err(ModelError::InvalidMeanReversion(a));
        }
        if correlation.is_nan() || correlation.abs() > 1.0 {
            return Err(ModelError::InvalidCorrelation(correlation));
        }
        let segments = volatility_times.len() + 1;
        for vols in &volatilities {
            if vols.len() != segments {
                return Err(ModelError::dimension_mismatch(
                    "G2++ volatilities",
                    segments,
                    vols.len(),
                ));
            }
            check_volatilities(vols, 0)?;
        }

        let mut times = Vec::with_capacity(segments + 1);
        times.push(0.0);
        times.extend(volatility_times);
        times.push(f64::INFINITY);
        check_increasing(&times)?;

        Ok(Self {
            mean_reversions,
            volatilities,
            volatility_times: times,
            correlation,
        })
    }

    /// Constant volatilities.
    pub fn constant(
        mean_reversions: [f64; 2],
        volatilities: [f64; 2],
        correlation: f64,
    ) -> Result<Self, ModelError> {
        Self::new(
            mean_reversions,
            [vec![volatilities[0]], vec![volatilities[1]]],
            Vec::new(),
            correlation,
        )
    }

    /// `[a₁, a₂]`.
    #[inline]
    pub fn mean_reversions(&self) -> [f64; 2] {
        self.mean_reversions
    }

    /// Volatilities of factor `k` per segment.
    #[inline]
    pub fn volatilities(&self, factor: usize) -> &[f64] {
        &self.volatilities[factor.min(1)]
    }

    /// Segment boundaries including `0` and `+∞`.
    #[inline]
    pub fn volatility_times(&self) -> &[f64] {
        &self.volatility_times
    }

    /// Factor correlation.
    #[inline]
    pub fn correlation(&self) -> f64 {
        self.correlation
    }

    /// Number of volatility segments.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.volatility_times.len() - 1
    }

    /// Overwrite both factor volatilities on segment `index`.
    pub fn set_segment(&mut self, index: usize, volatilities: [f64; 2]) -> Result<(), ModelError> {
        let len = self.segment_count();
        if index >= len {
            return Err(ModelError::IndexOutOfRange {
                what: "G2++ segments",
                index,
                len,
            });
        }
        check_volatilities(&volatilities, 0)?;
        self.volatilities[0][index] = volatilities[0];
        self.volatilities[1][index] = volatilities[1];
        Ok(())
    }

    /// Copy with segment `index` set.
    pub fn with_segment(&self, index: usize, volatilities: [f64; 2]) -> Result<Self, ModelError> {
        let mut params = self.clone();
        params.set_segment(index, volatilities)?;
        Ok(params)
    }

    /// Split the last segment at `start`.
    pub fn append_segment(&mut self, start: f64, volatilities: [f64; 2]) -> Result<(), ModelError> {
        let n = self.volatility_times.len();
        if !start.is_finite() || start <= self.volatility_times[n - 2] {
            return Err(ModelError::NonIncreasingTimes {
                index: n - 1,
                time: start,
            });
        }
        check_volatilities(&volatilities, 0)?;
        self.volatility_times.insert(n - 1, start);
        self.volatilities[0].push(volatilities[0]);
        self.volatilities[1].push(volatilities[1]);
        Ok(())
    }

    /// Copy with one more segment starting at `start`.
    pub fn with_appended_segment(
        &self,
        start: f64,
        volatilities: [f64; 2],
    ) -> Result<Self, ModelError> {
        let mut params = self.clone();
        params.append_segment(start, volatilities)?;
        Ok(params)
    }

    /// Bond volatility loading of factor `k` between `expiry` and `maturity`:
    /// `H_k = (e^{-a_k θ} - e^{-a_k t}) / a_k`.
    pub fn loading(&self, factor: usize, expiry: f64, maturity: f64) -> f64 {
        let a = self.mean_reversions[factor.min(1)];
        (-a * expiry).exp() * exp_ratio(-a, maturity - expiry)
    }

    /// Covariance of the discounted factors at `expiry`:
    ///
    /// ```text
    /// Γ_kl = ρ_kl ∫₀^θ σ_k(s) σ_l(s) e^{(a_k + a_l) s} ds
    /// ```
    pub fn factor_covariance(&self, expiry: f64) -> [[f64; 2]; 2] {
        let a = self.mean_reversions;
        let rho = [[1.0, self.correlation], [self.correlation, 1.0]];
        let mut gamma = [[0.0; 2]; 2];
        for j in 0..self.segment_count() {
            let s0 = self.volatility_times[j];
            if s0 >= expiry {
                break;
            }
            let s1 = self.volatility_times[j + 1].min(expiry);
            for k in 0..2 {
                for l in 0..2 {
                    let c = a[k] + a[l];
                    gamma[k][l] += rho[k][l]
                        * self.volatilities[k][j]
                        * self.volatilities[l][j]
                        * (c * s0).exp()
                        * exp_ratio(c, s1 - s0);
                }
            }
        }
        gamma
    }
}
