//! European swaption on a fixed-vs-ibor swap.

use std::fmt;

use pricer_core::market_data::curves::CurveSet;
use pricer_core::types::PricingError;

use super::cash_flow::CashFlowEquivalents;
use crate::instruments::error::InstrumentError;

/// Whether the holder enters the swap paying or receiving fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwaptionType {
    /// Right to pay fixed (call on the swap rate).
    Payer,
    /// Right to receive fixed (put on the swap rate).
    Receiver,
}

impl SwaptionType {
    /// +1 for payer, -1 for receiver.
    #[inline]
    pub fn omega(&self) -> f64 {
        match self {
            SwaptionType::Payer => 1.0,
            SwaptionType::Receiver => -1.0,
        }
    }
}

impl fmt::Display for SwaptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwaptionType::Payer => write!(f, "Payer"),
            SwaptionType::Receiver => write!(f, "Receiver"),
        }
    }
}

/// Long or short the option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Position {
    /// Holder of the option.
    #[default]
    Long,
    /// Writer of the option.
    Short,
}

impl Position {
    /// +1 for long, -1 for short.
    #[inline]
    pub fn sign(&self) -> f64 {
        match self {
            Position::Long => 1.0,
            Position::Short => -1.0,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Long => write!(f, "Long"),
            Position::Short => write!(f, "Short"),
        }
    }
}

/// Fixed leg schedule of the underlying swap.
///
/// Period `i` accrues from the previous payment time (the settlement time
/// for the first period) to `payment_times[i]`. The ibor leg shares the
/// schedule and the per-period notionals, so amortising profiles are
/// expressed by varying `notionals`.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedLeg {
    settlement: f64,
    payment_times: Vec<f64>,
    accrual_factors: Vec<f64>,
    notionals: Vec<f64>,
}

impl FixedLeg {
    /// Create a leg from explicit schedule vectors.
    ///
    /// # Errors
    ///
    /// - `InvalidSchedule` if the vectors are empty or of different lengths,
    ///   payment times do not strictly increase after settlement, or an
    ///   accrual factor is not positive
    /// - `InvalidNotional` for a negative or non-finite notional
    pub fn new(
        settlement: f64,
        payment_times: Vec<f64>,
        accrual_factors: Vec<f64>,
        notionals: Vec<f64>,
    ) -> Result<Self, InstrumentError> {
        if payment_times.is_empty() {
            return Err(InstrumentError::invalid_schedule("fixed leg has no periods"));
        }
        if accrual_factors.len() != payment_times.len() || notionals.len() != payment_times.len()
        {
            return Err(InstrumentError::invalid_schedule(format!(
                "length mismatch: {} payment times, {} accruals, {} notionals",
                payment_times.len(),
                accrual_factors.len(),
                notionals.len()
            )));
        }
        if !settlement.is_finite() || settlement < 0.0 {
            return Err(InstrumentError::invalid_schedule(format!(
                "settlement time {} must be finite and non-negative",
                settlement
            )));
        }
        let mut previous = settlement;
        for (i, &t) in payment_times.iter().enumerate() {
            if !t.is_finite() || t <= previous {
                return Err(InstrumentError::invalid_schedule(format!(
                    "payment time {} at index {} is not after {}",
                    t, i, previous
                )));
            }
            previous = t;
        }
        if let Some(&delta) = accrual_factors
            .iter()
            .find(|d| !d.is_finite() || **d <= 0.0)
        {
            return Err(InstrumentError::invalid_schedule(format!(
                "accrual factor {} must be positive",
                delta
            )));
        }
        if let Some(&notional) = notionals.iter().find(|n| !n.is_finite() || **n < 0.0) {
            return Err(InstrumentError::InvalidNotional { notional });
        }

        Ok(Self {
            settlement,
            payment_times,
            accrual_factors,
            notionals,
        })
    }

    /// Bullet leg with `frequency` payments per year.
    ///
    /// # Arguments
    ///
    /// * `settlement` - Swap start time
    /// * `tenor_years` - Swap length, rounded to whole periods
    /// * `frequency` - Payments per year (1, 2, 4, 12)
    /// * `notional` - Constant notional
    pub fn regular(
        settlement: f64,
        tenor_years: f64,
        frequency: u32,
        notional: f64,
    ) -> Result<Self, InstrumentError> {
        let n = Self::period_count(tenor_years, frequency)?;
        Self::amortizing(settlement, frequency, vec![notional; n])
    }

    /// Regular leg with one notional per period.
    pub fn amortizing(
        settlement: f64,
        frequency: u32,
        notionals: Vec<f64>,
    ) -> Result<Self, InstrumentError> {
        if frequency == 0 {
            return Err(InstrumentError::invalid_schedule("payment frequency must be positive"));
        }
        let delta = 1.0 / frequency as f64;
        let n = notionals.len();
        let payment_times = (1..=n).map(|i| settlement + i as f64 * delta).collect();
        Self::new(settlement, payment_times, vec![delta; n], notionals)
    }

    fn period_count(tenor_years: f64, frequency: u32) -> Result<usize, InstrumentError> {
        if frequency == 0 {
            return Err(InstrumentError::invalid_schedule("payment frequency must be positive"));
        }
        let n = (tenor_years * frequency as f64).round();
        if !n.is_finite() || n < 1.0 {
            return Err(InstrumentError::invalid_schedule(format!(
                "tenor {} gives no whole period at frequency {}",
                tenor_years, frequency
            )));
        }
        Ok(n as usize)
    }

    /// Leg made of the first `periods` periods.
    pub fn truncated(&self, periods: usize) -> Result<Self, InstrumentError> {
        if periods == 0 || periods > self.len() {
            return Err(InstrumentError::invalid_schedule(format!(
                "cannot keep {} of {} periods",
                periods,
                self.len()
            )));
        }
        Self::new(
            self.settlement,
            self.payment_times[..periods].to_vec(),
            self.accrual_factors[..periods].to_vec(),
            self.notionals[..periods].to_vec(),
        )
    }

    /// Same schedule with a constant notional.
    pub fn with_flat_notional(&self, notional: f64) -> Result<Self, InstrumentError> {
        Self::new(
            self.settlement,
            self.payment_times.clone(),
            self.accrual_factors.clone(),
            vec![notional; self.len()],
        )
    }

    /// Swap start time.
    #[inline]
    pub fn settlement(&self) -> f64 {
        self.settlement
    }

    /// Last payment time.
    #[inline]
    pub fn maturity(&self) -> f64 {
        self.payment_times[self.payment_times.len() - 1]
    }

    /// Period end (payment) times.
    #[inline]
    pub fn payment_times(&self) -> &[f64] {
        &self.payment_times
    }

    /// Year fractions per period.
    #[inline]
    pub fn accrual_factors(&self) -> &[f64] {
        &self.accrual_factors
    }

    /// Notional per period.
    #[inline]
    pub fn notionals(&self) -> &[f64] {
        &self.notionals
    }

    /// Number of periods.
    #[inline]
    pub fn len(&self) -> usize {
        self.payment_times.len()
    }

    /// Always false for a constructed leg.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payment_times.is_empty()
    }

    /// Period start times: settlement, then every payment time but the last.
    pub fn period_starts(&self) -> impl Iterator<Item = f64> + '_ {
        std::iter::once(self.settlement)
            .chain(self.payment_times[..self.len() - 1].iter().copied())
    }

    /// `(start, end, accrual, notional)` per period.
    pub fn periods(&self) -> impl Iterator<Item = (f64, f64, f64, f64)> + '_ {
        self.period_starts()
            .zip(self.payment_times.iter())
            .zip(self.accrual_factors.iter().zip(self.notionals.iter()))
            .map(|((s, &e), (&d, &n))| (s, e, d, n))
    }
}

/// European physical-delivery swaption.
///
/// # Example
///
/// ```
/// use pricer_core::market_data::curves::CurveSet;
/// use pricer_models::instruments::rates::{FixedLeg, Position, Swaption, SwaptionType};
///
/// let leg = FixedLeg::amortizing(1.0, 1, vec![100.0, 75.0, 50.0]).unwrap();
/// let swaption = Swaption::new(1.0, leg, 0.02, SwaptionType::Receiver)
///     .unwrap()
///     .with_position(Position::Short);
///
/// assert_eq!(swaption.maturity(), 4.0);
/// assert!(!swaption.is_long());
///
/// let curves = CurveSet::with_flat_discount(0.02_f64);
/// assert!(swaption.annuity(&curves).unwrap() > 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Swaption {
    expiry: f64,
    leg: FixedLeg,
    strike: f64,
    swaption_type: SwaptionType,
    position: Position,
}

impl Swaption {
    /// Create a long swaption.
    ///
    /// # Errors
    ///
    /// - `InvalidExpiry` if the expiry is negative or after the swap start
    /// - `InvalidSchedule` for a non-finite strike
    pub fn new(
        expiry: f64,
        leg: FixedLeg,
        strike: f64,
        swaption_type: SwaptionType,
    ) -> Result<Self, InstrumentError> {
        if !expiry.is_finite() || expiry < 0.0 || expiry > leg.settlement() {
            return Err(InstrumentError::InvalidExpiry { expiry });
        }
        if !strike.is_finite() {
            return Err(InstrumentError::invalid_schedule(format!(
                "strike {} is not finite",
                strike
            )));
        }
        Ok(Self {
            expiry,
            leg,
            strike,
            swaption_type,
            position: Position::Long,
        })
    }

    /// Long swaption on a bullet swap starting at expiry.
    pub fn vanilla(
        expiry: f64,
        tenor_years: f64,
        frequency: u32,
        strike: f64,
        notional: f64,
        swaption_type: SwaptionType,
    ) -> Result<Self, InstrumentError> {
        let leg = FixedLeg::regular(expiry, tenor_years, frequency, notional)?;
        Self::new(expiry, leg, strike, swaption_type)
    }

    /// Same swaption with another strike.
    pub fn with_strike(mut self, strike: f64) -> Self {
        self.strike = strike;
        self
    }

    /// Same swaption with another position.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Same option on another leg.
    pub fn with_leg(&self, leg: FixedLeg) -> Result<Self, InstrumentError> {
        Ok(Self::new(self.expiry, leg, self.strike, self.swaption_type)?.with_position(self.position))
    }

    /// Option expiry time.
    #[inline]
    pub fn expiry(&self) -> f64 {
        self.expiry
    }

    /// Swap start time.
    #[inline]
    pub fn settlement(&self) -> f64 {
        self.leg.settlement()
    }

    /// Swap end time.
    #[inline]
    pub fn maturity(&self) -> f64 {
        self.leg.maturity()
    }

    /// Swap length from settlement.
    #[inline]
    pub fn tenor(&self) -> f64 {
        self.maturity() - self.settlement()
    }

    /// Fixed rate.
    #[inline]
    pub fn strike(&self) -> f64 {
        self.strike
    }

    /// Payer or receiver.
    #[inline]
    pub fn swaption_type(&self) -> SwaptionType {
        self.swaption_type
    }

    /// Long or short.
    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Returns true for a payer swaption.
    #[inline]
    pub fn is_payer(&self) -> bool {
        self.swaption_type == SwaptionType::Payer
    }

    /// Returns true when long the option.
    #[inline]
    pub fn is_long(&self) -> bool {
        self.position == Position::Long
    }

    /// Underlying fixed leg.
    #[inline]
    pub fn fixed_leg(&self) -> &FixedLeg {
        &self.leg
    }

    /// Notional of the first period.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.leg.notionals()[0]
    }

    /// Fixed leg value of one basis unit: `Σ N_i δ_i P(t_i)`.
    pub fn annuity(&self, curves: &CurveSet<f64>) -> Result<f64, PricingError> {
        let mut annuity = 0.0;
        for (_, end, delta, notional) in self.leg.periods() {
            annuity += notional * delta * curves.discount_factor(end)?;
        }
        Ok(annuity)
    }

    /// Ibor leg value: `Σ N_i (β_i P(s_i) - P(e_i))`.
    pub fn float_leg_value(&self, curves: &CurveSet<f64>) -> Result<f64, PricingError> {
        let mut value = 0.0;
        for (start, end, delta, notional) in self.leg.periods() {
            let beta = curves.basis_factor(start, end, delta)?;
            value += notional
                * (beta * curves.discount_factor(start)? - curves.discount_factor(end)?);
        }
        Ok(value)
    }

    /// Par rate of the underlying swap.
    pub fn forward_swap_rate(&self, curves: &CurveSet<f64>) -> Result<f64, PricingError> {
        let annuity = self.annuity(curves)?;
        if annuity <= 0.0 {
            return Err(PricingError::model_failure(format!(
                "non-positive annuity {} for swap ending at {}",
                annuity,
                self.maturity()
            )));
        }
        Ok(self.float_leg_value(curves)? / annuity)
    }

    /// Payer swap as signed amounts.
    ///
    /// Each period contributes `+N β` at its start and `-N (1 + δ K)` at its
    /// end; coinciding dates are merged. The representation does not depend
    /// on the swaption type.
    pub fn cash_flow_equivalents(
        &self,
        curves: &CurveSet<f64>,
    ) -> Result<CashFlowEquivalents, PricingError> {
        let mut cfe = CashFlowEquivalents::with_capacity(self.leg.len() + 1);
        for (start, end, delta, notional) in self.leg.periods() {
            let beta = curves.basis_factor(start, end, delta)?;
            cfe.add(start, notional * beta);
            cfe.add(end, -notional * (1.0 + delta * self.strike));
        }
        Ok(cfe)
    }
}
