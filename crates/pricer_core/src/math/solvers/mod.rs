//! Root-finding and optimization solvers for model calibration.
//!
//! ## Available Solvers
//!
//! ### Root-Finding
//!
//! - [`RootBracketer`]: Geometric expansion of a seed interval until the function changes sign
//! - [`BrentSolver`]: Robust bracketing method without derivative requirement
//!
//! ### Optimization
//!
//! - [`LevenbergMarquardtSolver`]: Box-constrained nonlinear least squares
//!
//! ## Configuration
//!
//! - [`BracketConfig`]: growth factor (default 1.6), expansion budget (default 50), domain bounds
//! - [`SolverConfig`]: function tolerance, variable tolerance and iteration cap for Brent
//! - [`LMConfig`]: tolerances and damping control for least squares
//!
//! ## Fallible Objectives
//!
//! Every solver exposes a `try_*` entry point that accepts `FnMut(..) -> Result<_, E>`
//! with `E: From<SolverError>`. Pricing errors raised inside the objective
//! propagate unchanged while solver failures are converted into `E`.
//!
//! ## Examples
//!
//! ### Root-Finding
//!
//! ```
//! use pricer_core::math::solvers::{BrentSolver, RootBracketer, SolverConfig};
//!
//! let f = |x: f64| x.exp() - 5.0;
//! let bracket = RootBracketer::with_defaults().bracket(f, -1.0, 0.0).unwrap();
//!
//! let solver = BrentSolver::new(SolverConfig::default());
//! let root = solver.find_root(f, bracket.low, bracket.high).unwrap();
//! assert!((root - 5.0_f64.ln()).abs() < 1e-9);
//! ```
//!
//! ### Nonlinear Least-Squares
//!
//! ```
//! use pricer_core::math::solvers::{LevenbergMarquardtSolver, LMConfig};
//!
//! // Minimize (p[0] - 2)² + (p[1] - 3)²
//! let residuals = |params: &[f64]| -> Vec<f64> {
//!     vec![params[0] - 2.0, params[1] - 3.0]
//! };
//!
//! let solver = LevenbergMarquardtSolver::with_defaults();
//! let result = solver.solve(residuals, vec![0.0, 0.0]).unwrap();
//!
//! assert!(result.converged);
//! assert!((result.params[0] - 2.0).abs() < 1e-6);
//! ```

mod bracket;
mod brent;
mod config;
mod levenberg_marquardt;

// Re-export public types at module level
pub use bracket::{RootBracket, RootBracketer};
pub use brent::{BrentSolver, RootSolution};
pub use config::{BracketConfig, SolverConfig};
pub use levenberg_marquardt::{
    LMConfig, LMResult, LMTermination, LevenbergMarquardtSolver, ParameterBounds,
};
