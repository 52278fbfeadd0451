//! G2++ objective: one volatility level per bucket.

use std::sync::Arc;

use pricer_core::market_data::curves::CurveSet;
use pricer_core::math::solvers::ParameterBounds;
use pricer_core::types::PricingError;
use pricer_models::instruments::rates::Swaption;
use pricer_models::models::rates::G2ppParameters;
use pricer_models::pricing::{G2ppSwaptionPricer, Pricer};

use crate::calibration::basket::NODE_TOLERANCE;
use crate::calibration::error::CalibrationError;
use crate::calibration::objective::{
    expect_dimension, CalibrationMethod, CalibrationObjective, LiveBucket, ParameterLedger,
};

#[derive(Debug, Clone, Copy)]
struct VolatilitySegment {
    index: usize,
    expiry: f64,
}

/// G2++ with both factor volatilities bootstrapped along expiries.
///
/// The live value is the first factor volatility `σ₁` of the bucket's
/// segment; the second follows as `σ₂ = ratio · σ₁`, with the ratio taken
/// from the seed. Segments are laid out as for
/// [`HullWhiteObjective`](super::HullWhiteObjective). Mean reversions and
/// correlation stay at their seed values.
#[derive(Debug, Clone)]
pub struct G2ppObjective {
    ledger: ParameterLedger<G2ppParameters, VolatilitySegment>,
    pricer: G2ppSwaptionPricer,
    curves: Arc<CurveSet<f64>>,
    ratio: f64,
    last_expiry: Option<f64>,
}

impl G2ppObjective {
    /// Start from constant seed parameters.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` unless the seed has one segment and a positive
    /// first factor volatility.
    pub fn new(seed: G2ppParameters, curves: Arc<CurveSet<f64>>) -> Result<Self, CalibrationError> {
        if seed.segment_count() != 1 {
            return Err(CalibrationError::invalid_parameter(format!(
                "G2++ seed must have one volatility segment, got {}",
                seed.segment_count()
            )));
        }
        let sigma1 = seed.volatilities(0)[0];
        if sigma1 <= 0.0 {
            return Err(CalibrationError::invalid_parameter(
                "G2++ seed needs a positive first factor volatility",
            ));
        }
        let ratio = seed.volatilities(1)[0] / sigma1;
        Ok(Self {
            ledger: ParameterLedger::new(seed),
            pricer: G2ppSwaptionPricer::default(),
            curves,
            ratio,
            last_expiry: None,
        })
    }

    /// Use `pricer` instead of the default 64-interval integration.
    pub fn with_pricer(mut self, pricer: G2ppSwaptionPricer) -> Self {
        self.pricer = pricer;
        self
    }

    /// Fixed `σ₂ / σ₁`.
    pub fn volatility_ratio(&self) -> f64 {
        self.ratio
    }

    fn last_volatilities(&self) -> [f64; 2] {
        let params = self.ledger.current();
        let last = params.segment_count() - 1;
        [params.volatilities(0)[last], params.volatilities(1)[last]]
    }
}

impl CalibrationObjective for G2ppObjective {
    type Instrument = Swaption;
    type Parameters = G2ppParameters;

    fn model_name(&self) -> &'static str {
        "G2++"
    }

    fn method(&self) -> CalibrationMethod {
        CalibrationMethod::RootFinding
    }

    fn parameters(&self) -> &G2ppParameters {
        self.ledger.current()
    }

    fn into_parameters(self) -> G2ppParameters {
        self.ledger.into_current()
    }

    fn curves(&self) -> &CurveSet<f64> {
        &self.curves
    }

    fn begin_bucket(&mut self, bucket: &LiveBucket<'_, Swaption>) -> Result<(), CalibrationError> {
        let expiry = bucket.node().expiry;
        let Some(previous) = self.last_expiry else {
            return self.ledger.open(VolatilitySegment { index: 0, expiry });
        };
        if expiry - previous < NODE_TOLERANCE {
            return Err(CalibrationError::invalid_bucket_ordering(
                bucket.index(),
                previous,
                expiry,
            ));
        }

        let sigmas = self.last_volatilities();
        let index = self.ledger.current().segment_count();
        self.ledger.open(VolatilitySegment { index, expiry })?;
        if let Err(e) = self.ledger.current_mut().append_segment(previous, sigmas) {
            self.ledger.abandon();
            return Err(PricingError::from(e).into());
        }
        Ok(())
    }

    fn set_live_parameter(&mut self, trial: &[f64]) -> Result<(), CalibrationError> {
        expect_dimension(trial, 1)?;
        let segment = *self.ledger.live()?;
        let sigma = trial[0];
        self.ledger
            .current_mut()
            .set_segment(segment.index, [sigma, self.ratio * sigma])
            .map_err(PricingError::from)?;
        Ok(())
    }

    fn live_parameter(&self) -> Result<Vec<f64>, CalibrationError> {
        let segment = self.ledger.live()?;
        Ok(vec![self.ledger.current().volatilities(0)[segment.index]])
    }

    fn commit(&mut self) -> Result<Vec<f64>, CalibrationError> {
        let values = self.live_parameter()?;
        let segment = self.ledger.commit()?;
        self.last_expiry = Some(segment.expiry);
        Ok(values)
    }

    fn abandon_bucket(&mut self) {
        self.ledger.abandon();
    }

    fn committed_buckets(&self) -> usize {
        self.ledger.committed_buckets()
    }

    fn seed_interval(&self) -> (f64, f64) {
        let sigma = self.last_volatilities()[0];
        (0.5 * sigma, 1.5 * sigma)
    }

    fn initial_guess(&self) -> Vec<f64> {
        vec![self.last_volatilities()[0]]
    }

    fn parameter_bounds(&self) -> Option<ParameterBounds> {
        ParameterBounds::new(vec![0.0], vec![f64::INFINITY]).ok()
    }

    fn price(&self, swaption: &Swaption) -> Result<f64, PricingError> {
        self.pricer
            .present_value(swaption, self.ledger.current(), &self.curves)
    }
}
