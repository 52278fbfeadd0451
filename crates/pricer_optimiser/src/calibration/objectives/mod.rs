//! Per-model calibration objectives.
//!
//! | Objective | Live values per bucket | Method |
//! |-----------|------------------------|--------|
//! | [`HullWhiteObjective`] | volatility of the new segment | root finding |
//! | [`G2ppObjective`] | first factor volatility of the new segment | root finding |
//! | [`LmmDdObjective`] | loading factor (and displacement) of a rate block | either |

mod g2pp;
mod hull_white;
mod lmm_dd;

pub use g2pp::G2ppObjective;
pub use hull_white::HullWhiteObjective;
pub use lmm_dd::LmmDdObjective;
