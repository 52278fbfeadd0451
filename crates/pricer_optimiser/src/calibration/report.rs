//! Calibration output: per-bucket diagnostics and the final fit.

use super::basket::CalibrationNode;
use super::objective::CalibrationMethod;

/// Outcome of one committed bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketReport {
    /// Bucket position in the basket
    pub bucket: usize,
    /// Node shared by the bucket's instruments
    pub node: CalibrationNode,
    /// Strategy used
    pub method: CalibrationMethod,
    /// Committed live values
    pub values: Vec<f64>,
    /// `model - target` per instrument at commit
    pub residuals: Vec<f64>,
    /// Solver iterations
    pub iterations: usize,
    /// Bracket expansions before Brent started (0 for least squares)
    pub bracket_expansions: usize,
    /// False when least squares stopped at a best fit
    pub converged: bool,
}

impl BucketReport {
    /// Largest absolute residual of the bucket.
    pub fn max_abs_residual(&self) -> f64 {
        self.residuals.iter().fold(0.0, |m, r| m.max(r.abs()))
    }

    /// Sum of squared residuals.
    pub fn residual_ss(&self) -> f64 {
        self.residuals.iter().map(|r| r * r).sum()
    }
}

/// Model against target for one instrument after the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstrumentFit {
    /// Bucket of the instrument
    pub bucket: usize,
    /// Price under the calibrated parameters
    pub model_price: f64,
    /// Price to match
    pub target_price: f64,
}

impl InstrumentFit {
    /// `model - target`.
    #[inline]
    pub fn error(&self) -> f64 {
        self.model_price - self.target_price
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationReport {
    /// Calibrated model
    pub model_name: &'static str,
    /// One entry per bucket, in calibration order
    pub buckets: Vec<BucketReport>,
    /// Every instrument repriced with the final parameters
    pub fits: Vec<InstrumentFit>,
}

impl CalibrationReport {
    /// Largest `|model - target|` over the basket.
    pub fn max_abs_error(&self) -> f64 {
        self.fits.iter().fold(0.0, |m, fit| m.max(fit.error().abs()))
    }

    /// Returns true if every instrument is repriced within `tolerance`.
    pub fn is_within(&self, tolerance: f64) -> bool {
        self.max_abs_error() <= tolerance
    }

    /// Buckets where least squares stopped short of its tolerance.
    pub fn best_fit_buckets(&self) -> impl Iterator<Item = &BucketReport> {
        self.buckets.iter().filter(|b| !b.converged)
    }
}

/// Calibrated parameters with their report.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedModel<P> {
    /// Final parameters
    pub parameters: P,
    /// Diagnostics
    pub report: CalibrationReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(converged: bool, residuals: Vec<f64>) -> BucketReport {
        BucketReport {
            bucket: 0,
            node: CalibrationNode::new(1.0, 6.0),
            method: CalibrationMethod::LeastSquares,
            values: vec![1.0, 0.1],
            residuals,
            iterations: 7,
            bracket_expansions: 0,
            converged,
        }
    }

    #[test]
    fn test_bucket_residual_summaries() {
        let b = bucket(true, vec![0.3, -0.4]);
        assert_eq!(b.max_abs_residual(), 0.4);
        assert!((b.residual_ss() - 0.25).abs() < 1e-15);
    }

    #[test]
    fn test_report_fit_queries() {
        let report = CalibrationReport {
            model_name: "LMM-DD",
            buckets: vec![bucket(true, vec![]), bucket(false, vec![])],
            fits: vec![
                InstrumentFit {
                    bucket: 0,
                    model_price: 10.0,
                    target_price: 10.5,
                },
                InstrumentFit {
                    bucket: 1,
                    model_price: 4.0,
                    target_price: 3.9,
                },
            ],
        };

        assert!((report.max_abs_error() - 0.5).abs() < 1e-12);
        assert!(report.is_within(0.5));
        assert!(!report.is_within(0.4));
        assert_eq!(report.best_fit_buckets().count(), 1);
    }
}
