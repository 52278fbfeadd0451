//! Successive (bootstrap) calibration engine.
//!
//! The engine walks the registered groups in order. For each bucket it opens
//! the objective's live segment, solves it with bracketing + Brent or with
//! least squares depending on [`CalibrationObjective::method`], commits the
//! solution and moves on. A failure stops the run; buckets committed before
//! it stay in the objective's parameters.

use std::fmt;

use pricer_core::math::solvers::{
    BrentSolver, LMTermination, LevenbergMarquardtSolver, RootBracketer,
};
use pricer_core::types::{PricingError, SolverError};
use pricer_models::pricing::TargetPriceProvider;
use tracing::{debug, error, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::basket::{
    check_node_ordering, CalibrationBasket, CalibrationInstrumentGroup, SharedTargetProvider,
};
use super::config::CalibrationConfig;
use super::error::{CalibrationError, CalibrationFailure};
use super::objective::{CalibrationMethod, CalibrationObjective, LiveBucket};
use super::report::{BucketReport, CalibratedModel, CalibrationReport, InstrumentFit};

/// Where the engine stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Nothing solved yet.
    Idle,
    /// Bucket `i` is open in the objective.
    BucketInProgress(usize),
    /// Bucket `i` is solved and frozen.
    BucketCommitted(usize),
    /// Every bucket is committed.
    Done,
    /// The run stopped; `bucket` is the failing bucket when known.
    Failed {
        /// Failing bucket
        bucket: Option<usize>,
    },
}

impl EngineState {
    /// Returns true once the run has ended, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::BucketInProgress(i) => write!(f, "bucket {} in progress", i),
            Self::BucketCommitted(i) => write!(f, "bucket {} committed", i),
            Self::Done => write!(f, "done"),
            Self::Failed { bucket: Some(i) } => write!(f, "failed at bucket {}", i),
            Self::Failed { bucket: None } => write!(f, "failed"),
        }
    }
}

/// Error raised inside a solver callback.
///
/// Solver failures need the bucket index and the last residual before they
/// can become a [`CalibrationError`]; objective errors pass through as-is.
#[derive(Debug)]
enum StepError {
    Solver(SolverError),
    Objective(CalibrationError),
}

impl From<SolverError> for StepError {
    fn from(e: SolverError) -> Self {
        Self::Solver(e)
    }
}

impl From<CalibrationError> for StepError {
    fn from(e: CalibrationError) -> Self {
        Self::Objective(e)
    }
}

impl StepError {
    fn into_calibration_error(self, bucket: usize, last_residual: f64) -> CalibrationError {
        match self {
            Self::Solver(e) => CalibrationError::from_solver(bucket, e, last_residual),
            Self::Objective(e) => e,
        }
    }
}

/// Values found for one bucket, before commit.
struct BucketSolution {
    values: Vec<f64>,
    iterations: usize,
    bracket_expansions: usize,
    converged: bool,
}

/// Bucket-by-bucket calibration of one objective.
///
/// Buckets are solved in registration order: each solve holds every segment
/// committed before it fixed. With `validate_ordering` on, the groups'
/// nodes must be strictly increasing.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use pricer_core::market_data::curves::CurveSet;
/// use pricer_models::instruments::rates::SwaptionType;
/// use pricer_models::models::rates::HullWhiteParameters;
/// use pricer_models::pricing::{HullWhiteSwaptionPricer, ModelPriceProvider};
/// use pricer_optimiser::calibration::{
///     CalibrationBasket, CalibrationConfig, EngineState, HullWhiteObjective,
///     SharedTargetProvider, SuccessiveCalibrationEngine,
/// };
/// use pricer_models::instruments::rates::Swaption;
///
/// let curves = Arc::new(CurveSet::with_flat_discount(0.02_f64));
/// let truth = HullWhiteParameters::constant(0.03, 0.009)
///     .unwrap()
///     .with_appended_segment(1.0, 0.011)
///     .unwrap();
/// let provider: SharedTargetProvider<Swaption> =
///     Arc::new(ModelPriceProvider::new(HullWhiteSwaptionPricer::new(), truth));
///
/// let objective = HullWhiteObjective::new(0.03, 0.01, Arc::clone(&curves)).unwrap();
/// let mut engine = SuccessiveCalibrationEngine::new(objective, CalibrationConfig::default());
/// let basket =
///     CalibrationBasket::expiry_ladder(&[1.0, 2.0], 4.0, 1, 0.02, 1.0e4, SwaptionType::Payer)
///         .unwrap();
/// engine.register_basket(basket, provider).unwrap();
///
/// let report = engine.calibrate().unwrap();
/// assert_eq!(engine.state(), EngineState::Done);
/// assert!(report.is_within(1e-6));
/// ```
pub struct SuccessiveCalibrationEngine<O: CalibrationObjective> {
    objective: O,
    groups: Vec<CalibrationInstrumentGroup<O::Instrument>>,
    config: CalibrationConfig,
    state: EngineState,
    buckets: Vec<BucketReport>,
}

impl<O: CalibrationObjective> fmt::Debug for SuccessiveCalibrationEngine<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuccessiveCalibrationEngine")
            .field("model", &self.objective.model_name())
            .field("groups", &self.groups.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<O: CalibrationObjective> SuccessiveCalibrationEngine<O> {
    /// Create an engine around `objective`.
    pub fn new(objective: O, config: CalibrationConfig) -> Self {
        Self {
            objective,
            groups: Vec::new(),
            config,
            state: EngineState::Idle,
            buckets: Vec::new(),
        }
    }

    /// Create an engine with the default configuration.
    pub fn with_defaults(objective: O) -> Self {
        Self::new(objective, CalibrationConfig::default())
    }

    /// Append one bucket.
    pub fn register_group(&mut self, group: CalibrationInstrumentGroup<O::Instrument>) {
        self.groups.push(group);
    }

    /// Append every bucket of `basket`, all priced by `provider`.
    pub fn register_basket(
        &mut self,
        basket: CalibrationBasket<O::Instrument>,
        provider: SharedTargetProvider<O::Instrument>,
    ) -> Result<(), CalibrationError> {
        let groups = basket.into_groups(provider)?;
        self.groups.extend(groups);
        Ok(())
    }

    /// Registered groups in calibration order.
    pub fn groups(&self) -> &[CalibrationInstrumentGroup<O::Instrument>] {
        &self.groups
    }

    /// Current state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The configuration.
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// The objective, with the parameters committed so far.
    pub fn objective(&self) -> &O {
        &self.objective
    }

    /// Parameters committed so far.
    pub fn parameters(&self) -> &O::Parameters {
        self.objective.parameters()
    }

    /// Reports of the committed buckets.
    pub fn bucket_reports(&self) -> &[BucketReport] {
        &self.buckets
    }

    /// Consume the engine, keeping the parameters.
    pub fn into_parameters(self) -> O::Parameters {
        self.objective.into_parameters()
    }

    /// Solve every registered bucket in order.
    ///
    /// # Errors
    ///
    /// - `AlreadyCalibrated` if the engine has already run
    /// - `EmptyBasket` if no group is registered
    /// - `InvalidBucketOrdering` when ordering validation is on and the
    ///   nodes are not strictly increasing
    /// - `NoBracketFound`, `RootFindingDidNotConverge`,
    ///   `LeastSquaresDidNotConverge` from the failing bucket
    /// - `Pricing` from the pricer or a target provider
    ///
    /// After an error the engine is in `Failed`; the buckets committed
    /// before it remain in [`parameters`](Self::parameters).
    pub fn calibrate(&mut self) -> Result<CalibrationReport, CalibrationError> {
        if self.state != EngineState::Idle {
            return Err(CalibrationError::AlreadyCalibrated);
        }
        if self.groups.is_empty() {
            return Err(CalibrationError::EmptyBasket);
        }
        if let Err(e) = self.preflight() {
            return Err(self.fail(e));
        }

        info!(
            model = self.objective.model_name(),
            method = %self.objective.method(),
            buckets = self.groups.len(),
            "starting successive calibration"
        );

        let mut targets = Vec::with_capacity(self.groups.len());
        for index in 0..self.groups.len() {
            self.state = EngineState::BucketInProgress(index);
            match self.calibrate_bucket(index) {
                Ok(bucket_targets) => {
                    targets.push(bucket_targets);
                    self.state = EngineState::BucketCommitted(index);
                }
                Err(e) => return Err(self.fail(e)),
            }
        }

        let fits = match self.instrument_fits(&targets) {
            Ok(fits) => fits,
            Err(e) => return Err(self.fail(e.into())),
        };
        self.state = EngineState::Done;

        let report = CalibrationReport {
            model_name: self.objective.model_name(),
            buckets: self.buckets.clone(),
            fits,
        };
        info!(
            model = report.model_name,
            buckets = report.buckets.len(),
            max_abs_error = report.max_abs_error(),
            "calibration complete"
        );
        Ok(report)
    }

    /// Run to completion, returning the parameters or the failure with the
    /// committed prefix.
    pub fn run(
        mut self,
    ) -> Result<CalibratedModel<O::Parameters>, CalibrationFailure<O::Parameters>> {
        match self.calibrate() {
            Ok(report) => Ok(CalibratedModel {
                parameters: self.objective.into_parameters(),
                report,
            }),
            Err(error) => {
                let bucket = match self.state {
                    EngineState::Failed { bucket } => bucket,
                    _ => error.bucket(),
                };
                Err(CalibrationFailure {
                    error,
                    bucket,
                    committed_buckets: self.objective.committed_buckets(),
                    committed: self.objective.into_parameters(),
                })
            }
        }
    }

    fn preflight(&self) -> Result<(), CalibrationError> {
        self.config.validate()?;
        if self.config.validate_ordering {
            let nodes: Vec<_> = self.groups.iter().map(|g| g.node()).collect();
            check_node_ordering(&nodes)?;
        }
        Ok(())
    }

    fn fail(&mut self, e: CalibrationError) -> CalibrationError {
        let bucket = match self.state {
            EngineState::BucketInProgress(i) => Some(i),
            _ => e.bucket(),
        };
        self.state = EngineState::Failed { bucket };
        error!(
            model = self.objective.model_name(),
            bucket = ?bucket,
            committed = self.objective.committed_buckets(),
            error = %e,
            "calibration failed"
        );
        e
    }

    /// Open, solve and commit bucket `index`; returns its targets.
    fn calibrate_bucket(&mut self, index: usize) -> Result<Vec<f64>, CalibrationError> {
        let Self {
            objective,
            groups,
            config,
            buckets,
            ..
        } = self;
        let group = &groups[index];
        let bucket = LiveBucket::new(index, group, objective.curves())?;
        objective.begin_bucket(&bucket)?;

        let solved = match objective.method() {
            CalibrationMethod::RootFinding => solve_root(objective, &bucket, config),
            CalibrationMethod::LeastSquares => solve_least_squares(objective, &bucket, config),
        };
        let solution = match solved {
            Ok(solution) => solution,
            Err(e) => {
                objective.abandon_bucket();
                return Err(e);
            }
        };

        // The solver's last evaluation need not be the solution
        let residuals = match objective.residual_vector(&bucket, &solution.values) {
            Ok(r) => r,
            Err(e) => {
                objective.abandon_bucket();
                return Err(e);
            }
        };
        let values = objective.commit()?;

        debug!(
            bucket = index,
            node = %bucket.node(),
            instruments = bucket.len(),
            values = ?values,
            residuals = ?residuals,
            iterations = solution.iterations,
            expansions = solution.bracket_expansions,
            "bucket committed"
        );
        buckets.push(BucketReport {
            bucket: index,
            node: bucket.node(),
            method: objective.method(),
            values,
            residuals,
            iterations: solution.iterations,
            bracket_expansions: solution.bracket_expansions,
            converged: solution.converged,
        });
        Ok(bucket.targets().to_vec())
    }

    #[cfg(feature = "parallel")]
    fn instrument_fits(&self, targets: &[Vec<f64>]) -> Result<Vec<InstrumentFit>, PricingError> {
        let objective = &self.objective;
        fit_jobs(&self.groups, targets)
            .par_iter()
            .map(|&(bucket, instrument, target_price)| {
                Ok(InstrumentFit {
                    bucket,
                    model_price: objective.price(instrument)?,
                    target_price,
                })
            })
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn instrument_fits(&self, targets: &[Vec<f64>]) -> Result<Vec<InstrumentFit>, PricingError> {
        let objective = &self.objective;
        fit_jobs(&self.groups, targets)
            .iter()
            .map(|&(bucket, instrument, target_price)| {
                Ok(InstrumentFit {
                    bucket,
                    model_price: objective.price(instrument)?,
                    target_price,
                })
            })
            .collect()
    }
}

/// `(bucket, instrument, target)` for every basket member.
fn fit_jobs<'a, I>(
    groups: &'a [CalibrationInstrumentGroup<I>],
    targets: &'a [Vec<f64>],
) -> Vec<(usize, &'a I, f64)> {
    groups
        .iter()
        .zip(targets)
        .enumerate()
        .flat_map(|(bucket, (group, t))| {
            group
                .instruments()
                .zip(t.iter().copied())
                .map(move |(instrument, target)| (bucket, instrument, target))
        })
        .collect()
}

/// Bracket the live scalar from the objective's seed, then run Brent.
fn solve_root<O: CalibrationObjective>(
    objective: &mut O,
    bucket: &LiveBucket<'_, O::Instrument>,
    config: &CalibrationConfig,
) -> Result<BucketSolution, CalibrationError> {
    let index = bucket.index();
    let (low_guess, high_guess) = objective.seed_interval();
    let (lower, upper) = match objective.parameter_bounds() {
        Some(bounds) if bounds.len() == 1 => (Some(bounds.lower()[0]), Some(bounds.upper()[0])),
        _ => (None, None),
    };

    let mut last_residual = f64::NAN;
    let bracketer = RootBracketer::new(config.bracket_config(lower, upper));
    let bracketed = bracketer.try_bracket(
        |x| -> Result<f64, StepError> {
            let r = objective.residual(bucket, x)?;
            last_residual = r;
            Ok(r)
        },
        low_guess,
        high_guess,
    );
    let bracket = bracketed.map_err(|e| e.into_calibration_error(index, last_residual))?;
    debug!(
        bucket = index,
        low = bracket.low,
        high = bracket.high,
        expansions = bracket.expansions,
        "residual bracketed"
    );

    let brent = BrentSolver::new(config.solver_config());
    let solved = brent.try_solve(
        |x| -> Result<f64, StepError> {
            let r = objective.residual(bucket, x)?;
            last_residual = r;
            Ok(r)
        },
        bracket.low,
        bracket.high,
    );
    let solution = solved.map_err(|e| e.into_calibration_error(index, last_residual))?;

    Ok(BucketSolution {
        values: vec![solution.root],
        iterations: solution.iterations,
        bracket_expansions: bracket.expansions,
        converged: true,
    })
}

/// Fit the live vector by damped least squares.
///
/// A fit that ends above the residual tolerance is a best fit: accepted with
/// a warning unless `fail_on_least_squares_stagnation` is set.
fn solve_least_squares<O: CalibrationObjective>(
    objective: &mut O,
    bucket: &LiveBucket<'_, O::Instrument>,
    config: &CalibrationConfig,
) -> Result<BucketSolution, CalibrationError> {
    let index = bucket.index();
    let bounds = objective.parameter_bounds();
    let initial = objective.initial_guess();

    let solver = LevenbergMarquardtSolver::new(config.lm_config());
    let fitted = solver.try_solve(
        |p: &[f64]| -> Result<Vec<f64>, StepError> { Ok(objective.residual_vector(bucket, p)?) },
        initial,
        bounds.as_ref(),
    );
    let result = fitted.map_err(|e| e.into_calibration_error(index, f64::NAN))?;

    let exact = result.termination == LMTermination::ResidualTolerance;
    if !exact {
        if config.fail_on_least_squares_stagnation {
            return Err(CalibrationError::least_squares_did_not_converge(
                index,
                result.iterations,
                result.residual_ss,
            ));
        }
        warn!(
            bucket = index,
            termination = ?result.termination,
            residual_ss = result.residual_ss,
            initial_residual_ss = result.initial_residual_ss,
            iterations = result.iterations,
            "least squares stopped at a best fit"
        );
    }

    Ok(BucketSolution {
        values: result.params,
        iterations: result.iterations,
        bracket_expansions: 0,
        converged: exact,
    })
}

/// Calibrate `objective` on `basket`, every instrument priced by `provider`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use pricer_core::market_data::curves::CurveSet;
/// use pricer_models::instruments::rates::SwaptionType;
/// use pricer_models::models::rates::HullWhiteParameters;
/// use pricer_models::pricing::{HullWhiteSwaptionPricer, ModelPriceProvider};
/// use pricer_optimiser::calibration::{
///     calibrate, CalibrationBasket, CalibrationConfig, HullWhiteObjective,
/// };
///
/// let curves = Arc::new(CurveSet::with_flat_discount(0.03_f64));
/// let basket =
///     CalibrationBasket::expiry_ladder(&[1.0, 3.0, 2.0], 5.0, 1, 0.03, 1.0, SwaptionType::Payer)
///         .unwrap();
/// let provider = ModelPriceProvider::new(
///     HullWhiteSwaptionPricer::new(),
///     HullWhiteParameters::constant(0.05, 0.01).unwrap(),
/// );
/// let objective = HullWhiteObjective::new(0.05, 0.008, curves).unwrap();
///
/// // 3Y before 2Y is rejected before anything is solved
/// let failure = calibrate(basket, objective, provider, CalibrationConfig::default()).unwrap_err();
/// assert!(failure.error.is_ordering());
/// assert_eq!(failure.committed_buckets, 0);
/// ```
pub fn calibrate<O, T>(
    basket: CalibrationBasket<O::Instrument>,
    objective: O,
    provider: T,
    config: CalibrationConfig,
) -> Result<CalibratedModel<O::Parameters>, CalibrationFailure<O::Parameters>>
where
    O: CalibrationObjective,
    O::Instrument: 'static,
    T: TargetPriceProvider<O::Instrument> + Send + Sync + 'static,
{
    let provider: SharedTargetProvider<O::Instrument> = std::sync::Arc::new(provider);
    let mut engine = SuccessiveCalibrationEngine::new(objective, config);
    if let Err(error) = engine.register_basket(basket, provider) {
        return Err(CalibrationFailure {
            error,
            bucket: None,
            committed_buckets: 0,
            committed: engine.into_parameters(),
        });
    }
    engine.run()
}
