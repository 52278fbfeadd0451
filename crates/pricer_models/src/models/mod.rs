//! Model parametrisations.
//!
//! - [`rates`]: piecewise-constant Hull-White 1F, G2++ and displaced-diffusion LMM
//! - [`sabr`]: SABR smile parameters and an expiry/tenor parameter surface
//!
//! Parameter sets are plain values. Calibration edits them one segment or
//! block at a time and never shares them between threads mid-run.

pub mod error;
pub mod rates;
pub mod sabr;

pub use error::ModelError;
