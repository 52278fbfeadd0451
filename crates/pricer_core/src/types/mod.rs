//! Core error types.
//!
//! This module provides:
//! - `error`: Structured error types for pricing and solver operations
//!
//! # Re-exports
//!
//! - [`PricingError`], [`SolverError`] from `error`

pub mod error;

pub use error::{PricingError, SolverError};
