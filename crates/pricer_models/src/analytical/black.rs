//! Black (1976) formula.
//!
//! ```text
//! call = F N(d1) - K N(d2)
//! put  = K N(-d2) - F N(-d1)
//! d1,2 = ln(F/K) / s ± s/2,   s = σ √T
//! ```
//!
//! Prices are undiscounted; callers multiply by the relevant numeraire
//! (annuity or discount factor).

use super::distributions::norm_cdf;

/// Standard deviations below this are treated as zero.
const MIN_STD_DEV: f64 = 1e-14;

/// Undiscounted Black price.
///
/// # Arguments
///
/// * `forward` - Forward level of the underlying
/// * `strike` - Strike level
/// * `total_std_dev` - Total standard deviation `σ √T`
/// * `is_call` - Call (`true`) or put (`false`)
///
/// Falls back to intrinsic value when the standard deviation vanishes or the
/// forward or strike is not positive.
///
/// # Example
///
/// ```
/// use pricer_models::analytical::black_price;
///
/// let call = black_price(0.03, 0.03, 0.2, true);
/// let put = black_price(0.03, 0.03, 0.2, false);
/// assert!((call - put).abs() < 1e-15);
/// ```
pub fn black_price(forward: f64, strike: f64, total_std_dev: f64, is_call: bool) -> f64 {
    let omega = if is_call { 1.0 } else { -1.0 };
    if total_std_dev < MIN_STD_DEV || forward <= 0.0 || strike <= 0.0 {
        return (omega * (forward - strike)).max(0.0);
    }
    let d1 = (forward / strike).ln() / total_std_dev + 0.5 * total_std_dev;
    let d2 = d1 - total_std_dev;
    omega * (forward * norm_cdf(omega * d1) - strike * norm_cdf(omega * d2))
}
