//! Hull-White 1F objective: one volatility segment per bucket.

use std::sync::Arc;

use pricer_core::market_data::curves::CurveSet;
use pricer_core::math::solvers::ParameterBounds;
use pricer_core::types::PricingError;
use pricer_models::instruments::rates::Swaption;
use pricer_models::models::rates::HullWhiteParameters;
use pricer_models::pricing::{HullWhiteSwaptionPricer, Pricer};

use crate::calibration::basket::NODE_TOLERANCE;
use crate::calibration::error::CalibrationError;
use crate::calibration::objective::{
    expect_dimension, CalibrationMethod, CalibrationObjective, LiveBucket, ParameterLedger,
};

/// Open volatility segment.
#[derive(Debug, Clone, Copy)]
struct VolatilitySegment {
    index: usize,
    expiry: f64,
}

/// Piecewise-constant Hull-White volatility, bootstrapped along expiries.
///
/// Bucket `i` calibrates the volatility on `[θ_{i-1}, +∞)`, where `θ_{i-1}`
/// is the expiry of the previous bucket (`0` for the first one). After the
/// run the segment boundaries are the bucket expiries and the last segment
/// extends to infinity. The mean reversion is never changed.
///
/// Several swaptions in one bucket share the segment; their residuals are
/// summed.
#[derive(Debug, Clone)]
pub struct HullWhiteObjective {
    ledger: ParameterLedger<HullWhiteParameters, VolatilitySegment>,
    pricer: HullWhiteSwaptionPricer,
    curves: Arc<CurveSet<f64>>,
    last_expiry: Option<f64>,
}

impl HullWhiteObjective {
    /// Start from a constant volatility.
    ///
    /// `initial_volatility` seeds the first bracket; every new segment
    /// starts from the volatility committed before it.
    pub fn new(
        mean_reversion: f64,
        initial_volatility: f64,
        curves: Arc<CurveSet<f64>>,
    ) -> Result<Self, CalibrationError> {
        let parameters = HullWhiteParameters::constant(mean_reversion, initial_volatility)
            .map_err(PricingError::from)?;
        Self::from_parameters(parameters, curves)
    }

    /// Start from single-segment parameters.
    pub fn from_parameters(
        parameters: HullWhiteParameters,
        curves: Arc<CurveSet<f64>>,
    ) -> Result<Self, CalibrationError> {
        if parameters.segment_count() != 1 {
            return Err(CalibrationError::invalid_parameter(format!(
                "Hull-White seed must have one volatility segment, got {}",
                parameters.segment_count()
            )));
        }
        Ok(Self {
            ledger: ParameterLedger::new(parameters),
            pricer: HullWhiteSwaptionPricer::new(),
            curves,
            last_expiry: None,
        })
    }

    fn last_volatility(&self) -> f64 {
        self.ledger
            .current()
            .volatilities()
            .last()
            .copied()
            .unwrap_or_default()
    }
}

impl CalibrationObjective for HullWhiteObjective {
    type Instrument = Swaption;
    type Parameters = HullWhiteParameters;

    fn model_name(&self) -> &'static str {
        "Hull-White 1F"
    }

    fn method(&self) -> CalibrationMethod {
        CalibrationMethod::RootFinding
    }

    fn parameters(&self) -> &HullWhiteParameters {
        self.ledger.current()
    }

    fn into_parameters(self) -> HullWhiteParameters {
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

        let sigma = self.last_volatility();
        let index = self.ledger.current().segment_count();
        self.ledger.open(VolatilitySegment { index, expiry })?;
        if let Err(e) = self.ledger.current_mut().append_segment(previous, sigma) {
            self.ledger.abandon();
            return Err(PricingError::from(e).into());
        }
        Ok(())
    }

    fn set_live_parameter(&mut self, trial: &[f64]) -> Result<(), CalibrationError> {
        expect_dimension(trial, 1)?;
        let segment = *self.ledger.live()?;
        self.ledger
            .current_mut()
            .set_volatility(segment.index, trial[0])
            .map_err(PricingError::from)?;
        Ok(())
    }

    fn live_parameter(&self) -> Result<Vec<f64>, CalibrationError> {
        let segment = self.ledger.live()?;
        Ok(vec![self.ledger.current().volatilities()[segment.index]])
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
        let sigma = self.last_volatility();
        if sigma > 0.0 {
            (0.5 * sigma, 1.5 * sigma)
        } else {
            (0.001, 0.01)
        }
    }

    fn initial_guess(&self) -> Vec<f64> {
        vec![self.last_volatility()]
    }

    fn parameter_bounds(&self) -> Option<ParameterBounds> {
        ParameterBounds::new(vec![0.0], vec![f64::INFINITY]).ok()
    }

    fn price(&self, swaption: &Swaption) -> Result<f64, PricingError> {
        self.pricer
            .present_value(swaption, self.ledger.current(), &self.curves)
    }
}
