//! Interest rate model parametrisations.
//!
//! This module provides:
//! - [`HullWhiteParameters`]: one-factor Gaussian short rate, piecewise-constant volatility
//! - [`G2ppParameters`]: two correlated Gaussian factors on a shared segment grid
//! - [`LmmDdParameters`]: displaced-diffusion LIBOR Market Model on an ibor grid

pub mod g2pp;
pub mod hull_white;
pub mod lmm_dd;

pub use g2pp::G2ppParameters;
pub use hull_white::HullWhiteParameters;
pub use lmm_dd::LmmDdParameters;
