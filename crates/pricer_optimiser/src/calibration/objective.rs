//! The calibration objective protocol.
//!
//! An objective owns the model parameters being calibrated and knows which
//! slice of them is live for the current bucket. The engine drives it
//! through a fixed lifecycle per bucket:
//!
//! ```text
//! begin_bucket ─► set_live_parameter / residual* ─► set_live_parameter(solution) ─► commit
//!                                                └─(failure)─► abandon_bucket
//! ```
//!
//! Segments committed by earlier buckets are never written again.

use std::fmt;

use pricer_core::market_data::curves::CurveSet;
use pricer_core::math::solvers::ParameterBounds;
use pricer_core::types::PricingError;

use super::basket::{CalibrationInstrument, CalibrationInstrumentGroup, CalibrationNode};
use super::error::CalibrationError;

/// Numerical strategy of an objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalibrationMethod {
    /// One live scalar solved by bracketing and Brent.
    RootFinding,
    /// Several live values fitted by damped least squares.
    LeastSquares,
}

impl fmt::Display for CalibrationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootFinding => write!(f, "root finding"),
            Self::LeastSquares => write!(f, "least squares"),
        }
    }
}

/// A bucket being solved: its group and the target prices, computed once.
#[derive(Debug)]
pub struct LiveBucket<'a, I> {
    index: usize,
    group: &'a CalibrationInstrumentGroup<I>,
    targets: Vec<f64>,
}

impl<'a, I> LiveBucket<'a, I> {
    /// Evaluate the targets of `group` on `curves`.
    pub fn new(
        index: usize,
        group: &'a CalibrationInstrumentGroup<I>,
        curves: &CurveSet<f64>,
    ) -> Result<Self, PricingError> {
        let targets = group.target_prices(curves)?;
        Ok(Self {
            index,
            group,
            targets,
        })
    }

    /// Bucket position in the basket.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The bucket's node.
    pub fn node(&self) -> CalibrationNode {
        self.group.node()
    }

    /// The instruments with their targets.
    pub fn group(&self) -> &'a CalibrationInstrumentGroup<I> {
        self.group
    }

    /// Target price per instrument.
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Number of instruments.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns true if the bucket has no instrument.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Model-specific adapter between trial values and priced residuals.
///
/// Implementations own exactly one parameter set. Only the live segment
/// opened by [`begin_bucket`](Self::begin_bucket) may be written; earlier
/// segments are read-only.
///
/// Root-finding objectives have one live value; [`residual`](Self::residual)
/// sums `model - target` over the bucket. Least-squares objectives expose
/// one residual per instrument through
/// [`residual_vector`](Self::residual_vector).
pub trait CalibrationObjective: Send + Sync {
    /// Calibrating instrument.
    type Instrument: CalibrationInstrument + Send + Sync;
    /// Model parameter set.
    type Parameters: Clone + fmt::Debug + Send + Sync;

    /// Short model name used in logs and reports.
    fn model_name(&self) -> &'static str;

    /// Strategy used for every bucket.
    fn method(&self) -> CalibrationMethod;

    /// Current parameters, committed segments plus the live trial.
    fn parameters(&self) -> &Self::Parameters;

    /// Consume the objective, keeping the parameters.
    fn into_parameters(self) -> Self::Parameters
    where
        Self: Sized;

    /// Pricing context.
    fn curves(&self) -> &CurveSet<f64>;

    /// Open the live segment for `bucket`.
    ///
    /// # Errors
    ///
    /// `InvalidBucketOrdering` when the bucket's node does not extend the
    /// segments committed so far.
    fn begin_bucket(
        &mut self,
        bucket: &LiveBucket<'_, Self::Instrument>,
    ) -> Result<(), CalibrationError>;

    /// Write `trial` into the live segment only.
    fn set_live_parameter(&mut self, trial: &[f64]) -> Result<(), CalibrationError>;

    /// Live values currently written.
    fn live_parameter(&self) -> Result<Vec<f64>, CalibrationError>;

    /// Freeze the live values and close the bucket.
    ///
    /// Returns the committed values.
    fn commit(&mut self) -> Result<Vec<f64>, CalibrationError>;

    /// Close the bucket and restore the parameters of the last commit.
    fn abandon_bucket(&mut self);

    /// Number of buckets committed.
    fn committed_buckets(&self) -> usize;

    /// Seed interval for bracketing the live value.
    fn seed_interval(&self) -> (f64, f64);

    /// Starting point for least squares.
    fn initial_guess(&self) -> Vec<f64>;

    /// Admissible box for the live values.
    fn parameter_bounds(&self) -> Option<ParameterBounds>;

    /// Model price of one instrument under the current parameters.
    fn price(&self, instrument: &Self::Instrument) -> Result<f64, PricingError>;

    /// Model price of every instrument of the bucket.
    fn model_prices(
        &self,
        bucket: &LiveBucket<'_, Self::Instrument>,
    ) -> Result<Vec<f64>, PricingError> {
        bucket.group().instruments().map(|i| self.price(i)).collect()
    }

    /// Summed `model - target` for the live value `trial`.
    fn residual(
        &mut self,
        bucket: &LiveBucket<'_, Self::Instrument>,
        trial: f64,
    ) -> Result<f64, CalibrationError> {
        self.set_live_parameter(&[trial])?;
        let prices = self.model_prices(bucket)?;
        Ok(prices
            .iter()
            .zip(bucket.targets())
            .map(|(model, target)| model - target)
            .sum())
    }

    /// `model - target` per instrument for the live values `trial`.
    fn residual_vector(
        &mut self,
        bucket: &LiveBucket<'_, Self::Instrument>,
        trial: &[f64],
    ) -> Result<Vec<f64>, CalibrationError> {
        self.set_live_parameter(trial)?;
        let prices = self.model_prices(bucket)?;
        Ok(prices
            .iter()
            .zip(bucket.targets())
            .map(|(model, target)| model - target)
            .collect())
    }
}

/// Parameters with the snapshot of the last commit and the open bucket.
#[derive(Debug, Clone)]
pub(crate) struct ParameterLedger<P, S> {
    current: P,
    committed: P,
    live: Option<S>,
    committed_buckets: usize,
}

impl<P: Clone, S> ParameterLedger<P, S> {
    pub(crate) fn new(parameters: P) -> Self {
        Self {
            committed: parameters.clone(),
            current: parameters,
            live: None,
            committed_buckets: 0,
        }
    }

    pub(crate) fn current(&self) -> &P {
        &self.current
    }

    pub(crate) fn current_mut(&mut self) -> &mut P {
        &mut self.current
    }

    pub(crate) fn into_current(self) -> P {
        self.current
    }

    pub(crate) fn committed_buckets(&self) -> usize {
        self.committed_buckets
    }

    /// Open a bucket; fails if one is already open.
    pub(crate) fn open(&mut self, segment: S) -> Result<(), CalibrationError> {
        if self.live.is_some() {
            return Err(CalibrationError::invalid_parameter(
                "previous bucket was neither committed nor abandoned",
            ));
        }
        self.live = Some(segment);
        Ok(())
    }

    pub(crate) fn live(&self) -> Result<&S, CalibrationError> {
        self.live.as_ref().ok_or(CalibrationError::BucketNotOpen)
    }

    pub(crate) fn live_mut(&mut self) -> Result<&mut S, CalibrationError> {
        self.live.as_mut().ok_or(CalibrationError::BucketNotOpen)
    }

    pub(crate) fn commit(&mut self) -> Result<S, CalibrationError> {
        let segment = self.live.take().ok_or(CalibrationError::BucketNotOpen)?;
        self.committed = self.current.clone();
        self.committed_buckets += 1;
        Ok(segment)
    }

    pub(crate) fn abandon(&mut self) {
        self.live = None;
        self.current = self.committed.clone();
    }
}

/// Check the dimension of a trial vector.
pub(crate) fn expect_dimension(trial: &[f64], expected: usize) -> Result<(), CalibrationError> {
    if trial.len() != expected {
        return Err(CalibrationError::invalid_parameter(format!(
            "expected {} live values, got {}",
            expected,
            trial.len()
        )));
    }
    Ok(())
}
