//! Closed-form building blocks for swaption pricing.
//!
//! - [`distributions`]: standard normal CDF and PDF
//! - [`black`]: Black (1976) formula on total standard deviation

pub mod black;
pub mod distributions;

pub use black::black_price;
pub use distributions::{norm_cdf, norm_pdf};
