//! Calibration baskets and instrument groups.
//!
//! A [`CalibrationBasket`] is the ordered list of buckets covering a target
//! instrument; each bucket holds the calibrating instruments sharing one
//! (expiry, maturity) node. Registering a basket with an engine pairs every
//! instrument with its target-price source, producing one
//! [`CalibrationInstrumentGroup`] per bucket.

use std::fmt;
use std::sync::Arc;

use pricer_core::market_data::curves::CurveSet;
use pricer_core::types::PricingError;
use pricer_models::instruments::rates::{Swaption, SwaptionType};
use pricer_models::pricing::TargetPriceProvider;

use super::error::CalibrationError;

/// Two node times closer than this are the same node.
pub const NODE_TOLERANCE: f64 = 1e-9;

/// Target provider shared between the members of a basket.
pub type SharedTargetProvider<I> = Arc<dyn TargetPriceProvider<I> + Send + Sync>;

/// Expiry/maturity node of a calibration bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationNode {
    /// Option expiry
    pub expiry: f64,
    /// Underlying maturity
    pub maturity: f64,
}

impl CalibrationNode {
    /// Create a node.
    pub fn new(expiry: f64, maturity: f64) -> Self {
        Self { expiry, maturity }
    }

    /// Underlying length seen from expiry.
    pub fn tenor(&self) -> f64 {
        self.maturity - self.expiry
    }

    /// Same node within [`NODE_TOLERANCE`].
    pub fn coincides_with(&self, other: &Self) -> bool {
        (self.expiry - other.expiry).abs() < NODE_TOLERANCE
            && (self.maturity - other.maturity).abs() < NODE_TOLERANCE
    }

    /// Strictly before `other` in (expiry, maturity) order.
    pub fn precedes(&self, other: &Self) -> bool {
        if (self.expiry - other.expiry).abs() < NODE_TOLERANCE {
            other.maturity - self.maturity >= NODE_TOLERANCE
        } else {
            self.expiry < other.expiry
        }
    }
}

impl fmt::Display for CalibrationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.expiry, self.tenor())
    }
}

/// Instruments that can serve in a calibration bucket.
pub trait CalibrationInstrument {
    /// The bucket node this instrument calibrates.
    fn calibration_node(&self) -> CalibrationNode;
}

impl CalibrationInstrument for Swaption {
    fn calibration_node(&self) -> CalibrationNode {
        CalibrationNode::new(self.expiry(), self.maturity())
    }
}

/// An instrument paired with its target-price source.
#[derive(Clone)]
pub struct CalibrationMember<I> {
    instrument: I,
    provider: SharedTargetProvider<I>,
}

impl<I> CalibrationMember<I> {
    /// Pair an instrument with an owned provider.
    pub fn new<P>(instrument: I, provider: P) -> Self
    where
        P: TargetPriceProvider<I> + Send + Sync + 'static,
    {
        Self::shared(instrument, Arc::new(provider))
    }

    /// Pair an instrument with a shared provider.
    pub fn shared(instrument: I, provider: SharedTargetProvider<I>) -> Self {
        Self {
            instrument,
            provider,
        }
    }

    /// The calibrating instrument.
    pub fn instrument(&self) -> &I {
        &self.instrument
    }

    /// Target price of the instrument.
    pub fn target_price(&self, curves: &CurveSet<f64>) -> Result<f64, PricingError> {
        self.provider.target_price(&self.instrument, curves)
    }
}

impl<I: fmt::Debug> fmt::Debug for CalibrationMember<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalibrationMember")
            .field("instrument", &self.instrument)
            .finish_non_exhaustive()
    }
}

/// The instruments of one bucket with their target sources.
///
/// Every member shares the group's node. Immutable once built.
#[derive(Debug, Clone)]
pub struct CalibrationInstrumentGroup<I> {
    node: CalibrationNode,
    members: Vec<CalibrationMember<I>>,
}

impl<I: CalibrationInstrument> CalibrationInstrumentGroup<I> {
    /// Group of several members.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when `members` is empty or the members do not
    /// share one node.
    pub fn new(members: Vec<CalibrationMember<I>>) -> Result<Self, CalibrationError> {
        let node = members
            .first()
            .map(|m| m.instrument.calibration_node())
            .ok_or_else(|| CalibrationError::invalid_parameter("calibration group has no member"))?;
        if let Some(other) = members
            .iter()
            .map(|m| m.instrument.calibration_node())
            .find(|n| !n.coincides_with(&node))
        {
            return Err(CalibrationError::invalid_parameter(format!(
                "group mixes nodes {} and {}",
                node, other
            )));
        }
        Ok(Self { node, members })
    }

    /// Group of one instrument.
    pub fn single(instrument: I, provider: SharedTargetProvider<I>) -> Self {
        Self {
            node: instrument.calibration_node(),
            members: vec![CalibrationMember::shared(instrument, provider)],
        }
    }

    /// All `instruments` priced by the same `provider`.
    pub fn with_provider(
        instruments: Vec<I>,
        provider: SharedTargetProvider<I>,
    ) -> Result<Self, CalibrationError> {
        Self::new(
            instruments
                .into_iter()
                .map(|i| CalibrationMember::shared(i, Arc::clone(&provider)))
                .collect(),
        )
    }
}

impl<I> CalibrationInstrumentGroup<I> {
    /// Node shared by the members.
    pub fn node(&self) -> CalibrationNode {
        self.node
    }

    /// Members in registration order.
    pub fn members(&self) -> &[CalibrationMember<I>] {
        &self.members
    }

    /// Instruments in registration order.
    pub fn instruments(&self) -> impl Iterator<Item = &I> + '_ {
        self.members.iter().map(|m| &m.instrument)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the group has no member.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Target price of every member.
    pub fn target_prices(&self, curves: &CurveSet<f64>) -> Result<Vec<f64>, PricingError> {
        self.members.iter().map(|m| m.target_price(curves)).collect()
    }
}

/// Check that `nodes` are strictly increasing.
///
/// The reported times are the expiries, or the maturities when the expiries
/// coincide.
pub fn check_node_ordering<'a>(
    nodes: impl IntoIterator<Item = &'a CalibrationNode>,
) -> Result<(), CalibrationError> {
    let mut previous: Option<&CalibrationNode> = None;
    for (bucket, node) in nodes.into_iter().enumerate() {
        if let Some(prev) = previous {
            if !prev.precedes(node) {
                let same_expiry = (prev.expiry - node.expiry).abs() < NODE_TOLERANCE;
                let (p, c) = if same_expiry {
                    (prev.maturity, node.maturity)
                } else {
                    (prev.expiry, node.expiry)
                };
                return Err(CalibrationError::invalid_bucket_ordering(bucket, p, c));
            }
        }
        previous = Some(node);
    }
    Ok(())
}

/// Ordered buckets of calibrating instruments.
///
/// # Examples
///
/// ```
/// use pricer_models::instruments::rates::{FixedLeg, Swaption, SwaptionType};
/// use pricer_optimiser::calibration::CalibrationBasket;
///
/// // 5Y amortizing payer swaption on a 4Y annual swap starting in 5Y
/// let leg = FixedLeg::amortizing(5.0, 1, vec![100.0, 75.0, 50.0, 25.0]).unwrap();
/// let parent = Swaption::new(5.0, leg, 0.03, SwaptionType::Payer).unwrap();
///
/// let basket = CalibrationBasket::amortized_swaption_ladder(&parent).unwrap();
/// assert_eq!(basket.len(), 4);
/// assert!(basket.validate_ordering().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationBasket<I> {
    buckets: Vec<Vec<I>>,
}

impl<I> Default for CalibrationBasket<I> {
    fn default() -> Self {
        Self {
            buckets: Vec::new(),
        }
    }
}

impl<I: CalibrationInstrument> CalibrationBasket<I> {
    /// Create an empty basket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bucket of instruments sharing one node.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for an empty bucket or mixed nodes.
    pub fn push_bucket(&mut self, instruments: Vec<I>) -> Result<(), CalibrationError> {
        let first = instruments
            .first()
            .map(|i| i.calibration_node())
            .ok_or_else(|| CalibrationError::invalid_parameter("empty calibration bucket"))?;
        if instruments
            .iter()
            .any(|i| !i.calibration_node().coincides_with(&first))
        {
            return Err(CalibrationError::invalid_parameter(format!(
                "bucket {} mixes calibration nodes",
                self.buckets.len()
            )));
        }
        self.buckets.push(instruments);
        Ok(())
    }

    /// Append a bucket holding one instrument.
    pub fn push_instrument(&mut self, instrument: I) {
        self.buckets.push(vec![instrument]);
    }

    /// Builder form of [`push_bucket`](Self::push_bucket).
    pub fn with_bucket(mut self, instruments: Vec<I>) -> Result<Self, CalibrationError> {
        self.push_bucket(instruments)?;
        Ok(self)
    }

    /// Buckets in calibration order.
    pub fn buckets(&self) -> &[Vec<I>] {
        &self.buckets
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns true if the basket has no bucket.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Node of every bucket.
    pub fn nodes(&self) -> Vec<CalibrationNode> {
        self.buckets
            .iter()
            .filter_map(|b| b.first().map(|i| i.calibration_node()))
            .collect()
    }

    /// Check the buckets are in strictly increasing node order.
    pub fn validate_ordering(&self) -> Result<(), CalibrationError> {
        check_node_ordering(&self.nodes())
    }

    /// Pair every instrument with `provider`.
    pub fn into_groups(
        self,
        provider: SharedTargetProvider<I>,
    ) -> Result<Vec<CalibrationInstrumentGroup<I>>, CalibrationError> {
        self.buckets
            .into_iter()
            .map(|bucket| CalibrationInstrumentGroup::with_provider(bucket, Arc::clone(&provider)))
            .collect()
    }
}

impl CalibrationBasket<Swaption> {
    /// Swaptions of one tenor at increasing expiries.
    ///
    /// # Arguments
    ///
    /// * `expiries` - Option expiries, one bucket each
    /// * `tenor_years` - Length of every underlying swap
    /// * `frequency` - Fixed payments per year
    /// * `strike` - Fixed rate
    /// * `notional` - Constant notional
    /// * `swaption_type` - Payer or receiver
    pub fn expiry_ladder(
        expiries: &[f64],
        tenor_years: f64,
        frequency: u32,
        strike: f64,
        notional: f64,
        swaption_type: SwaptionType,
    ) -> Result<Self, CalibrationError> {
        let mut basket = Self::new();
        for &expiry in expiries {
            let swaption =
                Swaption::vanilla(expiry, tenor_years, frequency, strike, notional, swaption_type)
                    .map_err(PricingError::from)?;
            basket.push_instrument(swaption);
        }
        Ok(basket)
    }

    /// Co-terminal swaptions: increasing expiries, all ending at `maturity`.
    pub fn coterminal_ladder(
        expiries: &[f64],
        maturity: f64,
        frequency: u32,
        strike: f64,
        notional: f64,
        swaption_type: SwaptionType,
    ) -> Result<Self, CalibrationError> {
        let mut basket = Self::new();
        for &expiry in expiries {
            let swaption = Swaption::vanilla(
                expiry,
                maturity - expiry,
                frequency,
                strike,
                notional,
                swaption_type,
            )
            .map_err(PricingError::from)?;
            basket.push_instrument(swaption);
        }
        Ok(basket)
    }

    /// Vanilla swaptions replicating an amortizing parent.
    ///
    /// Bucket `k` holds the parent truncated to its first `k + 1` fixed
    /// periods, with the parent's expiry, strike and type and a flat
    /// notional equal to the parent's first-period notional. Maturities
    /// increase with `k`.
    pub fn amortized_swaption_ladder(parent: &Swaption) -> Result<Self, CalibrationError> {
        let leg = parent.fixed_leg();
        let mut basket = Self::new();
        for periods in 1..=leg.len() {
            let truncated = leg
                .truncated(periods)
                .and_then(|l| l.with_flat_notional(parent.notional()))
                .and_then(|l| parent.with_leg(l))
                .map_err(PricingError::from)?;
            basket.push_instrument(truncated);
        }
        Ok(basket)
    }

    /// Replicate every bucket over relative strikes.
    ///
    /// Each instrument yields one copy per offset, struck at its own strike
    /// plus the offset; used for least-squares buckets.
    pub fn with_strike_offsets(self, offsets: &[f64]) -> Result<Self, CalibrationError> {
        if offsets.is_empty() {
            return Err(CalibrationError::invalid_parameter("no strike offset given"));
        }
        let mut basket = Self::new();
        for bucket in self.buckets {
            let replicated = bucket
                .iter()
                .flat_map(|s| {
                    offsets
                        .iter()
                        .map(move |dk| s.clone().with_strike(s.strike() + dk))
                })
                .collect();
            basket.push_bucket(replicated)?;
        }
        Ok(basket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pricer_models::instruments::rates::FixedLeg;

    struct FixedTarget(f64);

    impl TargetPriceProvider<Swaption> for FixedTarget {
        fn target_price(&self, _: &Swaption, _: &CurveSet<f64>) -> Result<f64, PricingError> {
            Ok(self.0)
        }
    }

    fn amortizing_parent() -> Swaption {
        let leg = FixedLeg::amortizing(2.0, 2, vec![100.0, 80.0, 60.0, 40.0, 20.0]).unwrap();
        Swaption::new(2.0, leg, 0.031, SwaptionType::Receiver).unwrap()
    }

    // ========================================
    // Nodes and ordering
    // ========================================

    #[test]
    fn test_node_order_is_lexicographic() {
        let a = CalibrationNode::new(1.0, 6.0);
        let b = CalibrationNode::new(2.0, 3.0);
        let c = CalibrationNode::new(2.0, 4.0);
        assert!(a.precedes(&b));
        assert!(b.precedes(&c));
        assert!(!c.precedes(&b));
        assert!(!b.precedes(&b));
        assert_relative_eq!(c.tenor(), 2.0);
    }

    #[test]
    fn test_out_of_order_basket_rejected() {
        let basket =
            CalibrationBasket::expiry_ladder(&[1.0, 3.0, 2.0], 5.0, 1, 0.03, 1.0, SwaptionType::Payer)
                .unwrap();
        assert_eq!(
            basket.validate_ordering(),
            Err(CalibrationError::invalid_bucket_ordering(2, 3.0, 2.0))
        );
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let basket =
            CalibrationBasket::expiry_ladder(&[1.0, 1.0], 5.0, 1, 0.03, 1.0, SwaptionType::Payer)
                .unwrap();
        assert!(basket.validate_ordering().unwrap_err().is_ordering());
    }

    // ========================================
    // Generators
    // ========================================

    #[test]
    fn test_expiry_ladder() {
        let basket = CalibrationBasket::expiry_ladder(
            &[1.0, 2.0, 3.0, 4.0, 5.0],
            5.0,
            1,
            0.03,
            1.0e6,
            SwaptionType::Payer,
        )
        .unwrap();
        assert_eq!(basket.len(), 5);
        assert!(basket.validate_ordering().is_ok());
        for (k, node) in basket.nodes().iter().enumerate() {
            assert_relative_eq!(node.expiry, (k + 1) as f64);
            assert_relative_eq!(node.tenor(), 5.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_coterminal_ladder() {
        let basket =
            CalibrationBasket::coterminal_ladder(&[1.0, 2.0, 3.0], 6.0, 1, 0.03, 1.0, SwaptionType::Payer)
                .unwrap();
        for node in basket.nodes() {
            assert_relative_eq!(node.maturity, 6.0, epsilon = 1e-12);
        }
        assert!(basket.validate_ordering().is_ok());
    }

    #[test]
    fn test_amortized_ladder_truncates_parent() {
        let parent = amortizing_parent();
        let basket = CalibrationBasket::amortized_swaption_ladder(&parent).unwrap();
        assert_eq!(basket.len(), 5);
        assert!(basket.validate_ordering().is_ok());
        for (k, bucket) in basket.buckets().iter().enumerate() {
            let s = &bucket[0];
            assert_eq!(s.fixed_leg().len(), k + 1);
            assert_eq!(s.expiry(), parent.expiry());
            assert_eq!(s.strike(), parent.strike());
            assert_eq!(s.swaption_type(), parent.swaption_type());
            assert!(s.fixed_leg().notionals().iter().all(|&n| n == 100.0));
        }
        assert_relative_eq!(basket.nodes()[4].maturity, parent.maturity());
    }

    #[test]
    fn test_strike_offsets_replicate_each_bucket() {
        let basket = CalibrationBasket::amortized_swaption_ladder(&amortizing_parent())
            .unwrap()
            .with_strike_offsets(&[-0.01, 0.0, 0.01])
            .unwrap();
        assert_eq!(basket.len(), 5);
        for bucket in basket.buckets() {
            let strikes: Vec<f64> = bucket.iter().map(|s| s.strike()).collect();
            assert_eq!(strikes.len(), 3);
            assert_relative_eq!(strikes[0], 0.021, epsilon = 1e-15);
            assert_relative_eq!(strikes[2], 0.041, epsilon = 1e-15);
        }
        assert!(basket.validate_ordering().is_ok());
    }

    // ========================================
    // Groups
    // ========================================

    #[test]
    fn test_mixed_nodes_rejected() {
        let a = Swaption::vanilla(1.0, 5.0, 1, 0.03, 1.0, SwaptionType::Payer).unwrap();
        let b = Swaption::vanilla(2.0, 5.0, 1, 0.03, 1.0, SwaptionType::Payer).unwrap();
        let shared: SharedTargetProvider<Swaption> = Arc::new(FixedTarget(1.0));
        assert!(CalibrationInstrumentGroup::with_provider(vec![a.clone(), b.clone()], shared).is_err());

        let mut basket = CalibrationBasket::new();
        assert!(basket.push_bucket(vec![a, b]).is_err());
        assert!(basket.push_bucket(Vec::new()).is_err());
    }

    #[test]
    fn test_group_target_prices() {
        let s = Swaption::vanilla(1.0, 5.0, 1, 0.03, 1.0, SwaptionType::Payer).unwrap();
        let group = CalibrationInstrumentGroup::new(vec![
            CalibrationMember::new(s.clone(), FixedTarget(1.5)),
            CalibrationMember::new(s.with_strike(0.04), FixedTarget(0.5)),
        ])
        .unwrap();
        let curves = CurveSet::with_flat_discount(0.03_f64);
        assert_eq!(group.len(), 2);
        assert_eq!(group.target_prices(&curves).unwrap(), vec![1.5, 0.5]);
        assert!(CalibrationInstrumentGroup::<Swaption>::new(Vec::new()).is_err());
    }

    #[test]
    fn test_into_groups_shares_provider() {
        let basket =
            CalibrationBasket::expiry_ladder(&[1.0, 2.0], 3.0, 1, 0.03, 1.0, SwaptionType::Payer)
                .unwrap();
        let shared: SharedTargetProvider<Swaption> = Arc::new(FixedTarget(2.0));
        let groups = basket.into_groups(Arc::clone(&shared)).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(Arc::strong_count(&shared), 3);
    }
}
