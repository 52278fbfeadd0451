//! # Pricer Models (L2: Business Logic)
//!
//! Instruments, model parametrisations and analytic pricers used by the
//! successive calibration engine.
//!
//! This crate provides:
//! - European swaptions with bullet or amortising fixed legs (`instruments::rates`)
//! - Piecewise-constant Hull-White 1F, G2++ and displaced-diffusion LMM
//!   parameter sets (`models::rates`)
//! - A SABR smile and an expiry/tenor parameter surface (`models::sabr`)
//! - Normal distribution and Black formula (`analytical`)
//! - The [`Pricer`](pricing::Pricer) and [`TargetPriceProvider`](pricing::TargetPriceProvider)
//!   seams plus closed-form swaption pricers for each model (`pricing`)
//!
//! ## Design Principles
//!
//! - **Value-type parameters**: every model parameter set is `Clone` and edited
//!   through methods that return a modified copy or mutate a single block
//! - **Cash-flow equivalents**: pricers consume the instrument's
//!   discounted-cash-flow representation, so amortising legs need no special case
//! - **Errors as values**: all pricing entry points return `Result<f64, PricingError>`

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod analytical;
pub mod instruments;
pub mod models;
pub mod pricing;
