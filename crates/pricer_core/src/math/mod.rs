//! Numerical methods shared by the calibration layers.
//!
//! - [`solvers`]: root bracketing, Brent root finding and nonlinear least squares

pub mod solvers;
