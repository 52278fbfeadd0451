//! Displaced-diffusion LIBOR Market Model.
//!
//! Forward ibor rates `L_j` on the grid `t_0 < t_1 < ... < t_M` follow
//!
//! ```text
//! d(L_j + d_j) = (L_j + d_j) [μ_j dt + e^{a t} γ_j · dW]
//! ```
//!
//! with a time-homogeneous volatility vector `γ_j` per rate (one entry per
//! factor), a displacement `d_j` and a common mean reversion `a` that
//! shapes the time dependence.
//!
//! # Example
//!
//! ```
//! use pricer_models::models::rates::LmmDdParameters;
//!
//! let lmm = LmmDdParameters::regular_two_factor(0.0, 20, 2, 0.1, 0.2, 0.01).unwrap();
//! assert_eq!(lmm.rate_count(), 20);
//! assert_eq!(lmm.factor_count(), 2);
//! assert_eq!(lmm.index_of_time(5.0004).unwrap(), 10);
//! ```

use std::f64::consts::FRAC_PI_2;

use crate::models::error::{check_increasing, check_volatilities, ModelError};

/// Times within this distance match a grid point.
pub const TIME_TOLERANCE: f64 = 1e-3;

/// LMM-DD parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LmmDdParameters {
    ibor_times: Vec<f64>,
    accrual_factors: Vec<f64>,
    displacements: Vec<f64>,
    volatilities: Vec<Vec<f64>>,
    mean_reversion: f64,
}

impl LmmDdParameters {
    /// Create validated parameters.
    ///
    /// # Arguments
    ///
    /// * `ibor_times` - Grid `t_0..t_M`
    /// * `accrual_factors` - `δ_j` for `[t_j, t_{j+1}]`, length `M`
    /// * `displacements` - `d_j`, length `M`
    /// * `volatilities` - `M` rows of factor loadings, same width
    /// * `mean_reversion` - `a`
    pub fn new(
        ibor_times: Vec<f64>,
        accrual_factors: Vec<f64>,
        displacements: Vec<f64>,
        volatilities: Vec<Vec<f64>>,
        mean_reversion: f64,
    ) -> Result<Self, ModelError> {
        if ibor_times.len() < 2 {
            return Err(ModelError::dimension_mismatch("LMM ibor times", 2, ibor_times.len()));
        }
        check_increasing(&ibor_times)?;
        let m = ibor_times.len() - 1;
        for (what, got) in [
            ("LMM accrual factors", accrual_factors.len()),
            ("LMM displacements", displacements.len()),
            ("LMM volatility rows", volatilities.len()),
        ] {
            if got != m {
                return Err(ModelError::dimension_mismatch(what, m, got));
            }
        }
        if let Some(j) = accrual_factors
            .iter()
            .position(|d| !d.is_finite() || *d <= 0.0)
        {
            return Err(ModelError::InvalidAccrual {
                index: j,
                value: accrual_factors[j],
            });
        }
        if let Some(j) = displacements.iter().position(|d| !d.is_finite()) {
            return Err(ModelError::InvalidDisplacement {
                index: j,
                value: displacements[j],
            });
        }
        let factors = volatilities[0].len();
        if factors == 0 {
            return Err(ModelError::dimension_mismatch("LMM factors", 1, 0));
        }
        for (j, row) in volatilities.iter().enumerate() {
            if row.len() != factors {
                return Err(ModelError::dimension_mismatch("LMM factors", factors, row.len()));
            }
            check_volatilities(row, j * factors)?;
        }
        if !mean_reversion.is_finite() {
            return Err(ModelError::InvalidMeanReversion(mean_reversion));
        }

        Ok(Self {
            ibor_times,
            accrual_factors,
            displacements,
            volatilities,
            mean_reversion,
        })
    }

    /// Two-factor parameters with angle loadings.
    ///
    /// Rate `j` gets `volatility · [cos φ_j, sin φ_j]` with
    /// `φ_j = j π / (2 (M - 1))`, so the first and last rates load on
    /// orthogonal factors.
    pub fn two_factor(
        ibor_times: Vec<f64>,
        accrual_factors: Vec<f64>,
        displacement: f64,
        volatility: f64,
        mean_reversion: f64,
    ) -> Result<Self, ModelError> {
        let m = ibor_times.len().saturating_sub(1);
        let step = if m > 1 {
            FRAC_PI_2 / (m - 1) as f64
        } else {
            0.0
        };
        let volatilities = (0..m)
            .map(|j| {
                let angle = j as f64 * step;
                vec![volatility * angle.cos(), volatility * angle.sin()]
            })
            .collect();
        Self::new(
            ibor_times,
            accrual_factors,
            vec![displacement; m],
            volatilities,
            mean_reversion,
        )
    }

    /// Two-factor parameters on a regular grid of `periods` rates.
    pub fn regular_two_factor(
        start: f64,
        periods: usize,
        frequency: u32,
        displacement: f64,
        volatility: f64,
        mean_reversion: f64,
    ) -> Result<Self, ModelError> {
        if frequency == 0 {
            return Err(ModelError::dimension_mismatch("LMM payment frequency", 1, 0));
        }
        let delta = 1.0 / frequency as f64;
        let times = (0..=periods).map(|i| start + i as f64 * delta).collect();
        Self::two_factor(times, vec![delta; periods], displacement, volatility, mean_reversion)
    }

    /// Rate grid `t_0..t_M`.
    #[inline]
    pub fn ibor_times(&self) -> &[f64] {
        &self.ibor_times
    }

    /// Accrual factors `δ_j`.
    #[inline]
    pub fn accrual_factors(&self) -> &[f64] {
        &self.accrual_factors
    }

    /// Displacements `d_j`.
    #[inline]
    pub fn displacements(&self) -> &[f64] {
        &self.displacements
    }

    /// Factor loadings, one row per rate.
    #[inline]
    pub fn volatilities(&self) -> &[Vec<f64>] {
        &self.volatilities
    }

    /// Mean reversion `a`.
    #[inline]
    pub fn mean_reversion(&self) -> f64 {
        self.mean_reversion
    }

    /// Number of forward rates `M`.
    #[inline]
    pub fn rate_count(&self) -> usize {
        self.accrual_factors.len()
    }

    /// Number of Brownian factors.
    #[inline]
    pub fn factor_count(&self) -> usize {
        self.volatilities[0].len()
    }

    /// Grid index of `time`, within [`TIME_TOLERANCE`].
    pub fn index_of_time(&self, time: f64) -> Result<usize, ModelError> {
        self.ibor_times
            .iter()
            .position(|&t| (t - time).abs() < TIME_TOLERANCE)
            .ok_or(ModelError::TimeNotOnGrid {
                time,
                tolerance: TIME_TOLERANCE,
            })
    }

    fn check_block(&self, start: usize, end: usize) -> Result<(), ModelError> {
        let len = self.rate_count();
        if start >= end || end > len {
            return Err(ModelError::IndexOutOfRange {
                what: "LMM rate block",
                index: if start >= end { start } else { end },
                len,
            });
        }
        Ok(())
    }

    /// Loadings of rates `start..end`.
    pub fn block_volatilities(&self, start: usize, end: usize) -> Result<&[Vec<f64>], ModelError> {
        self.check_block(start, end)?;
        Ok(&self.volatilities[start..end])
    }

    /// Overwrite the loadings of rates `start..start + rows.len()`.
    pub fn set_block_volatilities(
        &mut self,
        start: usize,
        rows: &[Vec<f64>],
    ) -> Result<(), ModelError> {
        self.check_block(start, start + rows.len())?;
        let factors = self.factor_count();
        for (offset, row) in rows.iter().enumerate() {
            if row.len() != factors {
                return Err(ModelError::dimension_mismatch("LMM factors", factors, row.len()));
            }
            check_volatilities(row, (start + offset) * factors)?;
        }
        for (offset, row) in rows.iter().enumerate() {
            self.volatilities[start + offset].clone_from(row);
        }
        Ok(())
    }

    /// Multiply the loadings of rates `start..end` by `factor`.
    pub fn scale_block(&mut self, start: usize, end: usize, factor: f64) -> Result<(), ModelError> {
        self.check_block(start, end)?;
        if !factor.is_finite() || factor < 0.0 {
            return Err(ModelError::InvalidVolatility {
                index: start,
                value: factor,
            });
        }
        for row in &mut self.volatilities[start..end] {
            row.iter_mut().for_each(|v| *v *= factor);
        }
        Ok(())
    }

    /// Copy with the loadings of rates `start..end` scaled.
    pub fn with_block_scaled(&self, start: usize, end: usize, factor: f64) -> Result<Self, ModelError> {
        let mut params = self.clone();
        params.scale_block(start, end, factor)?;
        Ok(params)
    }

    /// Set the displacement of rates `start..end`.
    pub fn set_block_displacement(
        &mut self,
        start: usize,
        end: usize,
        displacement: f64,
    ) -> Result<(), ModelError> {
        self.check_block(start, end)?;
        if !displacement.is_finite() {
            return Err(ModelError::InvalidDisplacement {
                index: start,
                value: displacement,
            });
        }
        self.displacements[start..end].fill(displacement);
        Ok(())
    }

    /// Copy with the displacement of rates `start..end` set.
    pub fn with_block_displacement(
        &self,
        start: usize,
        end: usize,
        displacement: f64,
    ) -> Result<Self, ModelError> {
        let mut params = self.clone();
        params.set_block_displacement(start, end, displacement)?;
        Ok(params)
    }
}
