//! Successive calibration of rate models to swaption baskets.
//!
//! The pieces fit together as follows:
//!
//! - [`CalibrationBasket`]: ordered buckets of calibrating instruments
//! - [`CalibrationInstrumentGroup`]: one bucket paired with its target prices
//! - [`CalibrationObjective`]: owns the model parameters and turns a trial
//!   value into priced residuals ([`HullWhiteObjective`], [`G2ppObjective`],
//!   [`LmmDdObjective`])
//! - [`SuccessiveCalibrationEngine`]: solves the buckets in order and commits
//!   each solution before moving on
//!
//! ```text
//! Idle ─► BucketInProgress(0) ─► BucketCommitted(0) ─► … ─► BucketCommitted(n-1) ─► Done
//!               │                                                    
//!               └──────────────► Failed (committed prefix kept)
//! ```
//!
//! [`calibrate`] runs the whole procedure in one call.

mod basket;
mod config;
mod engine;
mod error;
mod objective;
mod objectives;
mod report;

pub use basket::{
    check_node_ordering, CalibrationBasket, CalibrationInstrument, CalibrationInstrumentGroup,
    CalibrationMember, CalibrationNode, SharedTargetProvider, NODE_TOLERANCE,
};
pub use config::{
    BracketSettings, CalibrationConfig, CalibrationConfigBuilder, ConfigError,
    LeastSquaresSettings, RootFinderSettings,
};
pub use engine::{calibrate, EngineState, SuccessiveCalibrationEngine};
pub use error::{CalibrationError, CalibrationFailure};
pub use objective::{CalibrationMethod, CalibrationObjective, LiveBucket};
pub use objectives::{G2ppObjective, HullWhiteObjective, LmmDdObjective};
pub use report::{BucketReport, CalibratedModel, CalibrationReport, InstrumentFit};
