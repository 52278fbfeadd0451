//! LMM-DD objective: one block of ibor rates per bucket.
//!
//! Bucket `i` owns the rates between the end of the previous block and the
//! grid index of its maturity. The block loadings are the seed loadings
//! times a live factor:
//!
//! - root finding solves the factor alone
//! - least squares fits the factor together with a common displacement
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use pricer_core::market_data::curves::CurveSet;
//! use pricer_models::models::rates::LmmDdParameters;
//! use pricer_optimiser::calibration::{CalibrationMethod, CalibrationObjective, LmmDdObjective};
//!
//! let curves = Arc::new(CurveSet::with_flat_discount(0.03_f64));
//! let seed = LmmDdParameters::regular_two_factor(0.0, 20, 2, 0.1, 0.2, 0.01).unwrap();
//!
//! let objective = LmmDdObjective::least_squares(seed, curves);
//! assert_eq!(objective.method(), CalibrationMethod::LeastSquares);
//! assert_eq!(objective.initial_guess(), vec![1.0, 0.1]);
//! ```

use std::sync::Arc;

use pricer_core::market_data::curves::CurveSet;
use pricer_core::math::solvers::ParameterBounds;
use pricer_core::types::PricingError;
use pricer_models::instruments::rates::Swaption;
use pricer_models::models::rates::LmmDdParameters;
use pricer_models::pricing::{LmmDdSwaptionPricer, Pricer};

use crate::calibration::error::CalibrationError;
use crate::calibration::objective::{
    expect_dimension, CalibrationMethod, CalibrationObjective, LiveBucket, ParameterLedger,
};

/// Rates `start..end` and their live values.
#[derive(Debug, Clone, Copy)]
struct RateBlock {
    start: usize,
    end: usize,
    factor: f64,
    displacement: f64,
}

/// Displaced-diffusion LMM calibrated block by block.
#[derive(Debug, Clone)]
pub struct LmmDdObjective {
    ledger: ParameterLedger<LmmDdParameters, RateBlock>,
    seed_volatilities: Vec<Vec<f64>>,
    method: CalibrationMethod,
    curves: Arc<CurveSet<f64>>,
    next_start: usize,
    factor_bounds: (f64, f64),
    displacement_bounds: (f64, f64),
}

impl LmmDdObjective {
    fn with_method(
        seed: LmmDdParameters,
        curves: Arc<CurveSet<f64>>,
        method: CalibrationMethod,
    ) -> Self {
        Self {
            seed_volatilities: seed.volatilities().to_vec(),
            ledger: ParameterLedger::new(seed),
            method,
            curves,
            next_start: 0,
            factor_bounds: (0.01, 10.0),
            displacement_bounds: (0.0, 1.0),
        }
    }

    /// Solve one loading factor per bucket.
    pub fn root_finding(seed: LmmDdParameters, curves: Arc<CurveSet<f64>>) -> Self {
        Self::with_method(seed, curves, CalibrationMethod::RootFinding)
    }

    /// Fit a loading factor and a displacement per bucket.
    pub fn least_squares(seed: LmmDdParameters, curves: Arc<CurveSet<f64>>) -> Self {
        Self::with_method(seed, curves, CalibrationMethod::LeastSquares)
    }

    /// Box for the loading factor in least squares. Defaults to `[0.01, 10]`.
    pub fn with_factor_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.factor_bounds = (lower, upper);
        self
    }

    /// Box for the displacement in least squares. Defaults to `[0, 1]`.
    pub fn with_displacement_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.displacement_bounds = (lower, upper);
        self
    }

    /// End of the rates committed so far.
    pub fn calibrated_rates(&self) -> usize {
        self.next_start
    }

    fn dimension(&self) -> usize {
        match self.method {
            CalibrationMethod::RootFinding => 1,
            CalibrationMethod::LeastSquares => 2,
        }
    }

    fn write_block(&mut self, block: RateBlock) -> Result<(), CalibrationError> {
        let rows: Vec<Vec<f64>> = self.seed_volatilities[block.start..block.end]
            .iter()
            .map(|row| row.iter().map(|v| v * block.factor).collect())
            .collect();
        let params = self.ledger.current_mut();
        params
            .set_block_volatilities(block.start, &rows)
            .map_err(PricingError::from)?;
        if self.method == CalibrationMethod::LeastSquares {
            params
                .set_block_displacement(block.start, block.end, block.displacement)
                .map_err(PricingError::from)?;
        }
        Ok(())
    }
}

impl CalibrationObjective for LmmDdObjective {
    type Instrument = Swaption;
    type Parameters = LmmDdParameters;

    fn model_name(&self) -> &'static str {
        "LMM-DD"
    }

    fn method(&self) -> CalibrationMethod {
        self.method
    }

    fn parameters(&self) -> &LmmDdParameters {
        self.ledger.current()
    }

    fn into_parameters(self) -> LmmDdParameters {
        self.ledger.into_current()
    }

    fn curves(&self) -> &CurveSet<f64> {
        &self.curves
    }

    fn begin_bucket(&mut self, bucket: &LiveBucket<'_, Swaption>) -> Result<(), CalibrationError> {
        let params = self.ledger.current();
        let maturity = bucket.node().maturity;
        let end = params.index_of_time(maturity).map_err(PricingError::from)?;
        let start = self.next_start;
        if end <= start {
            return Err(CalibrationError::invalid_bucket_ordering(
                bucket.index(),
                params.ibor_times()[start],
                maturity,
            ));
        }
        let displacement = params.displacements()[start];
        self.ledger.open(RateBlock {
            start,
            end,
            factor: 1.0,
            displacement,
        })
    }

    fn set_live_parameter(&mut self, trial: &[f64]) -> Result<(), CalibrationError> {
        expect_dimension(trial, self.dimension())?;
        let mut block = *self.ledger.live()?;
        block.factor = trial[0];
        if let Some(&displacement) = trial.get(1) {
            block.displacement = displacement;
        }
        self.write_block(block)?;
        *self.ledger.live_mut()? = block;
        Ok(())
    }

    fn live_parameter(&self) -> Result<Vec<f64>, CalibrationError> {
        let block = self.ledger.live()?;
        Ok(match self.method {
            CalibrationMethod::RootFinding => vec![block.factor],
            CalibrationMethod::LeastSquares => vec![block.factor, block.displacement],
        })
    }

    fn commit(&mut self) -> Result<Vec<f64>, CalibrationError> {
        let values = self.live_parameter()?;
        let block = self.ledger.commit()?;
        self.next_start = block.end;
        Ok(values)
    }

    fn abandon_bucket(&mut self) {
        self.ledger.abandon();
    }

    fn committed_buckets(&self) -> usize {
        self.ledger.committed_buckets()
    }

    fn seed_interval(&self) -> (f64, f64) {
        (0.8, 1.25)
    }

    fn initial_guess(&self) -> Vec<f64> {
        let displacement = self
            .ledger
            .current()
            .displacements()
            .get(self.next_start)
            .copied()
            .unwrap_or_default();
        match self.method {
            CalibrationMethod::RootFinding => vec![1.0],
            CalibrationMethod::LeastSquares => vec![1.0, displacement],
        }
    }

    fn parameter_bounds(&self) -> Option<ParameterBounds> {
        match self.method {
            CalibrationMethod::RootFinding => {
                ParameterBounds::new(vec![0.0], vec![f64::INFINITY]).ok()
            }
            CalibrationMethod::LeastSquares => ParameterBounds::new(
                vec![self.factor_bounds.0, self.displacement_bounds.0],
                vec![self.factor_bounds.1, self.displacement_bounds.1],
            )
            .ok(),
        }
    }

    fn price(&self, swaption: &Swaption) -> Result<f64, PricingError> {
        LmmDdSwaptionPricer.present_value(swaption, self.ledger.current(), &self.curves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::basket::{CalibrationInstrumentGroup, SharedTargetProvider};
    use approx::assert_relative_eq;
    use pricer_models::instruments::rates::SwaptionType;
    use pricer_models::pricing::ModelPriceProvider;

    fn seed() -> LmmDdParameters {
        LmmDdParameters::regular_two_factor(0.0, 20, 2, 0.1, 0.2, 0.01).unwrap()
    }

    fn curves() -> Arc<CurveSet<f64>> {
        Arc::new(CurveSet::with_flat_discount(0.03_f64))
    }

    fn group(expiry: f64, tenor: f64) -> CalibrationInstrumentGroup<Swaption> {
        let provider: SharedTargetProvider<Swaption> =
            Arc::new(ModelPriceProvider::new(LmmDdSwaptionPricer, seed()));
        let swaption =
            Swaption::vanilla(expiry, tenor, 2, 0.03, 1.0e4, SwaptionType::Payer).unwrap();
        CalibrationInstrumentGroup::single(swaption, provider)
    }

    #[test]
    fn test_blocks_follow_maturities() {
        let c = curves();
        let mut objective = LmmDdObjective::root_finding(seed(), Arc::clone(&c));
        let (g1, g2) = (group(1.0, 1.0), group(1.0, 3.0));

        objective.begin_bucket(&LiveBucket::new(0, &g1, &c).unwrap()).unwrap();
        objective.set_live_parameter(&[1.5]).unwrap();
        objective.commit().unwrap();
        assert_eq!(objective.calibrated_rates(), 4);

        objective.begin_bucket(&LiveBucket::new(1, &g2, &c).unwrap()).unwrap();
        objective.set_live_parameter(&[0.5]).unwrap();
        objective.commit().unwrap();
        assert_eq!(objective.calibrated_rates(), 8);

        let vols = objective.parameters().volatilities();
        let original = seed();
        assert_relative_eq!(vols[3][0], 1.5 * original.volatilities()[3][0]);
        assert_relative_eq!(vols[4][1], 0.5 * original.volatilities()[4][1]);
        assert_eq!(vols[8], original.volatilities()[8]);
    }

    #[test]
    fn test_factor_scales_seed_not_current() {
        let c = curves();
        let mut objective = LmmDdObjective::root_finding(seed(), Arc::clone(&c));
        let g = group(1.0, 2.0);
        objective.begin_bucket(&LiveBucket::new(0, &g, &c).unwrap()).unwrap();
        objective.set_live_parameter(&[2.0]).unwrap();
        objective.set_live_parameter(&[2.0]).unwrap();
        assert_relative_eq!(
            objective.parameters().volatilities()[0][0],
            2.0 * seed().volatilities()[0][0]
        );
    }

    #[test]
    fn test_least_squares_sets_displacement() {
        let c = curves();
        let mut objective = LmmDdObjective::least_squares(seed(), Arc::clone(&c));
        let g = group(1.0, 2.0);
        objective.begin_bucket(&LiveBucket::new(0, &g, &c).unwrap()).unwrap();
        assert_eq!(objective.live_parameter().unwrap(), vec![1.0, 0.1]);

        objective.set_live_parameter(&[1.1, 0.05]).unwrap();
        let displacements = objective.parameters().displacements();
        assert!(displacements[..6].iter().all(|&d| d == 0.05));
        assert_eq!(displacements[6], 0.1);
        assert!(objective.set_live_parameter(&[1.1]).is_err());
    }

    #[test]
    fn test_maturity_inside_committed_block_rejected() {
        let c = curves();
        let mut objective = LmmDdObjective::root_finding(seed(), Arc::clone(&c));
        let (g1, g2) = (group(1.0, 2.0), group(1.0, 1.0));
        objective.begin_bucket(&LiveBucket::new(0, &g1, &c).unwrap()).unwrap();
        objective.set_live_parameter(&[1.0]).unwrap();
        objective.commit().unwrap();

        let err = objective
            .begin_bucket(&LiveBucket::new(1, &g2, &c).unwrap())
            .unwrap_err();
        assert!(err.is_ordering());
    }

    #[test]
    fn test_least_squares_bounds() {
        let objective = LmmDdObjective::least_squares(seed(), curves())
            .with_factor_bounds(0.5, 2.0)
            .with_displacement_bounds(0.0, 0.5);
        let bounds = objective.parameter_bounds().unwrap();
        assert_eq!(bounds.lower(), &[0.5, 0.0]);
        assert_eq!(bounds.upper(), &[2.0, 0.5]);
    }
}
