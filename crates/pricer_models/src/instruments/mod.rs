//! Calibrating instruments.
//!
//! - [`rates`]: European swaptions on fixed-vs-ibor swaps
//! - [`InstrumentError`]: construction and validation failures

pub mod error;
pub mod rates;

pub use error::InstrumentError;
