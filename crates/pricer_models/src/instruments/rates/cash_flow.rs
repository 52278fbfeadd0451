//! Cash-flow-equivalent representation of a swap.

use pricer_core::market_data::curves::CurveSet;
use pricer_core::market_data::MarketDataError;

/// Times closer than this are merged into one cash flow.
const TIME_MERGE_TOLERANCE: f64 = 1e-10;

/// A swap reduced to signed amounts at payment times.
///
/// Under a deterministic basis between projection and discounting, the
/// floating leg of a swap is equivalent to fixed amounts at its period start
/// and end dates. Amounts follow the payer convention: receiving the
/// floating leg and paying fixed.
///
/// Times are strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct CashFlowEquivalents {
    times: Vec<f64>,
    amounts: Vec<f64>,
}

impl CashFlowEquivalents {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            times: Vec::with_capacity(n),
            amounts: Vec::with_capacity(n),
        }
    }

    /// Add an amount, merging with the last entry when the times coincide.
    ///
    /// Callers add times in non-decreasing order.
    pub(crate) fn add(&mut self, time: f64, amount: f64) {
        if let Some(&last) = self.times.last() {
            if (time - last).abs() < TIME_MERGE_TOLERANCE {
                if let Some(a) = self.amounts.last_mut() {
                    *a += amount;
                }
                return;
            }
        }
        self.times.push(time);
        self.amounts.push(amount);
    }

    /// Payment times.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Signed amounts, payer convention.
    pub fn amounts(&self) -> &[f64] {
        &self.amounts
    }

    /// Number of cash flows.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Returns true if there are no cash flows.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Iterate over `(time, amount)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.amounts.iter().copied())
    }

    /// Amounts multiplied by today's discount factor to their dates.
    pub fn discounted_amounts(&self, curves: &CurveSet<f64>) -> Result<Vec<f64>, MarketDataError> {
        self.iter()
            .map(|(t, a)| curves.discount_factor(t).map(|df| a * df))
            .collect()
    }

    /// Present value of the payer swap today.
    pub fn present_value(&self, curves: &CurveSet<f64>) -> Result<f64, MarketDataError> {
        Ok(self.discounted_amounts(curves)?.iter().sum())
    }
}
