//! # pricer_core: Numerical Foundation for Successive Model Calibration
//!
//! ## Layer 1 (Foundation) Role
//!
//! pricer_core is the bottom layer of the calibration stack, providing:
//! - One-dimensional root bracketing and Brent root finding (`math::solvers`)
//! - Damped Gauss-Newton / Levenberg-Marquardt least squares (`math::solvers`)
//! - Yield curves and the multicurve context used for pricing (`market_data::curves`)
//! - Error types: `PricingError`, `SolverError` (`types::error`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other pricer_* crates, with minimal external dependencies:
//! - num-traits: Traits for generic numerical computation
//! - thiserror: Structured error enums
//!
//! ## Usage Examples
//!
//! ```rust
//! use pricer_core::math::solvers::{BrentSolver, RootBracketer, SolverConfig};
//!
//! let f = |x: f64| x * x * x - 8.0;
//!
//! // Seed interval does not straddle the root: expand it first
//! let bracket = RootBracketer::with_defaults().bracket(f, 0.1, 0.5).unwrap();
//! assert!(bracket.f_low * bracket.f_high <= 0.0);
//!
//! let root = BrentSolver::new(SolverConfig::default())
//!     .find_root(f, bracket.low, bracket.high)
//!     .unwrap();
//! assert!((root - 2.0).abs() < 1e-9);
//! ```

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod market_data;
pub mod math;
pub mod types;
