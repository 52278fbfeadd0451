//! Integration tests for successive calibration.
//!
//! These tests run full calibrations through the public API: target prices
//! generated by a known model must be recovered, earlier buckets must not
//! depend on later targets, and SABR-priced baskets must be matched within
//! the present-value tolerance.

use std::sync::Arc;

use approx::assert_relative_eq;
use pricer_core::market_data::curves::CurveSet;
use pricer_models::instruments::rates::{FixedLeg, Swaption, SwaptionType};
use pricer_models::models::rates::{G2ppParameters, HullWhiteParameters, LmmDdParameters};
use pricer_models::models::sabr::{SabrParameterSurface, SabrParameters};
use pricer_models::pricing::{
    G2ppSwaptionPricer, HullWhiteSwaptionPricer, LmmDdSwaptionPricer, ModelPriceProvider, Pricer,
    SabrSwaptionTargetProvider, TargetPriceProvider,
};
use pricer_optimiser::calibration::{
    calibrate, CalibrationBasket, CalibrationConfig, CalibrationInstrumentGroup, CalibrationMethod,
    CalibrationObjective, EngineState, G2ppObjective, HullWhiteObjective, LmmDdObjective,
    SharedTargetProvider, SuccessiveCalibrationEngine,
};
use tracing_subscriber::EnvFilter;

/// Present-value acceptance tolerance, in currency units.
const TOLERANCE_PV: f64 = 1.0e-2;

const NOTIONAL: f64 = 1.0e4;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn curves() -> Arc<CurveSet<f64>> {
    Arc::new(CurveSet::with_flat_discount(0.03_f64))
}

fn sabr_provider(nu: f64, rho: f64) -> SabrSwaptionTargetProvider {
    let params = SabrParameters::new(0.035, 0.5, rho, nu).unwrap();
    SabrSwaptionTargetProvider::new(SabrParameterSurface::flat(params))
}

fn lmm_seed() -> LmmDdParameters {
    LmmDdParameters::regular_two_factor(0.0, 20, 2, 0.1, 0.2, 0.01).unwrap()
}

// ============================================================================
// Round trips
// ============================================================================

/// Hull-White volatilities used to price the basket are recovered.
#[test]
fn test_hull_white_round_trip() {
    init_tracing();
    let truth = HullWhiteParameters::constant(0.05, 0.011)
        .unwrap()
        .with_appended_segment(1.0, 0.013)
        .unwrap()
        .with_appended_segment(2.0, 0.009)
        .unwrap()
        .with_appended_segment(3.0, 0.010)
        .unwrap();
    let provider = ModelPriceProvider::new(HullWhiteSwaptionPricer::new(), truth.clone());
    let basket = CalibrationBasket::expiry_ladder(
        &[1.0, 2.0, 3.0, 4.0],
        5.0,
        1,
        0.03,
        NOTIONAL,
        SwaptionType::Payer,
    )
    .unwrap();
    let objective = HullWhiteObjective::new(0.05, 0.008, curves()).unwrap();

    let model = calibrate(basket, objective, provider, CalibrationConfig::default()).unwrap();

    assert_eq!(model.parameters.segment_count(), 4);
    for (got, want) in model
        .parameters
        .volatilities()
        .iter()
        .zip(truth.volatilities())
    {
        assert_relative_eq!(*got, *want, max_relative = 1e-6);
    }
    assert_eq!(model.report.model_name, "Hull-White 1F");
    assert_eq!(model.report.buckets.len(), 4);
    assert!(model.report.buckets.iter().all(|b| b.converged));
    assert!(model.report.is_within(1e-6));
}

/// G2++ first-factor volatilities are recovered when the targets share the ratio.
#[test]
fn test_g2pp_round_trip() -> anyhow::Result<()> {
    init_tracing();
    let truth = G2ppParameters::constant([0.1, 0.4], [0.012, 0.006], -0.5)?;
    let provider = ModelPriceProvider::new(G2ppSwaptionPricer::default(), truth);
    let basket = CalibrationBasket::expiry_ladder(
        &[1.0, 2.0, 3.0],
        4.0,
        1,
        0.03,
        NOTIONAL,
        SwaptionType::Receiver,
    )?;
    let seed = G2ppParameters::constant([0.1, 0.4], [0.01, 0.005], -0.5)?;
    let objective = G2ppObjective::new(seed, curves())?;

    let model = calibrate(basket, objective, provider, CalibrationConfig::default())?;

    assert_eq!(model.parameters.segment_count(), 3);
    let (sigma1, sigma2) = (
        model.parameters.volatilities(0),
        model.parameters.volatilities(1),
    );
    for k in 0..3 {
        assert_relative_eq!(sigma1[k], 0.012, max_relative = 1e-6);
        assert_relative_eq!(sigma2[k], 0.006, max_relative = 1e-6);
    }
    assert!(model.report.is_within(1e-6));
    Ok(())
}

/// LMM-DD loading factors are recovered block by block.
#[test]
fn test_lmm_root_finding_round_trip() {
    init_tracing();
    let truth = LmmDdParameters::regular_two_factor(0.0, 20, 2, 0.1, 0.25, 0.01).unwrap();
    let provider = ModelPriceProvider::new(LmmDdSwaptionPricer, truth.clone());
    let basket = CalibrationBasket::expiry_ladder(
        &[1.0, 2.0, 3.0],
        2.0,
        2,
        0.03,
        NOTIONAL,
        SwaptionType::Payer,
    )
    .unwrap();
    let objective = LmmDdObjective::root_finding(lmm_seed(), curves());

    let model = calibrate(basket, objective, provider, CalibrationConfig::default()).unwrap();

    // Maturity 5Y on a semi-annual grid closes the last block at rate 10
    let vols = model.parameters.volatilities();
    for j in 0..10 {
        assert_relative_eq!(vols[j][0], truth.volatilities()[j][0], max_relative = 1e-6);
        assert_relative_eq!(vols[j][1], truth.volatilities()[j][1], max_relative = 1e-6);
    }
    assert_eq!(vols[10], lmm_seed().volatilities()[10]);
    assert!(model.report.is_within(1e-6));
}

// ============================================================================
// Successive structure
// ============================================================================

/// Changing bucket `k`'s target leaves buckets before `k` untouched.
#[test]
fn test_earlier_buckets_independent_of_later_targets() {
    init_tracing();
    let base: SharedTargetProvider<Swaption> = Arc::new(ModelPriceProvider::new(
        HullWhiteSwaptionPricer::new(),
        HullWhiteParameters::constant(0.05, 0.011).unwrap(),
    ));
    let bumped: SharedTargetProvider<Swaption> = Arc::new(ModelPriceProvider::new(
        HullWhiteSwaptionPricer::new(),
        HullWhiteParameters::constant(0.05, 0.016).unwrap(),
    ));

    let run = |changed: Option<usize>| {
        let mut engine = SuccessiveCalibrationEngine::with_defaults(
            HullWhiteObjective::new(0.05, 0.008, curves()).unwrap(),
        );
        for (k, expiry) in [1.0, 2.0, 3.0, 4.0].into_iter().enumerate() {
            let provider = if changed == Some(k) { &bumped } else { &base };
            let swaption =
                Swaption::vanilla(expiry, 5.0, 1, 0.03, NOTIONAL, SwaptionType::Payer).unwrap();
            engine.register_group(CalibrationInstrumentGroup::single(
                swaption,
                Arc::clone(provider),
            ));
        }
        engine.calibrate().unwrap();
        assert_eq!(engine.state(), EngineState::Done);
        engine.into_parameters()
    };

    let reference = run(None);
    let changed = run(Some(2));

    assert_eq!(
        &reference.volatilities()[..2],
        &changed.volatilities()[..2],
        "buckets before the changed one must be bit-identical"
    );
    assert!((reference.volatilities()[2] - changed.volatilities()[2]).abs() > 1e-4);
}

/// Out-of-order registration is rejected before any bucket is solved.
#[test]
fn test_out_of_order_basket_commits_nothing() {
    let provider = ModelPriceProvider::new(
        HullWhiteSwaptionPricer::new(),
        HullWhiteParameters::constant(0.05, 0.01).unwrap(),
    );
    let basket = CalibrationBasket::expiry_ladder(
        &[1.0, 3.0, 2.0],
        5.0,
        1,
        0.03,
        NOTIONAL,
        SwaptionType::Payer,
    )
    .unwrap();
    let objective = HullWhiteObjective::new(0.05, 0.008, curves()).unwrap();

    let failure = calibrate(basket, objective, provider, CalibrationConfig::default()).unwrap_err();

    assert!(failure.error.is_ordering());
    assert_eq!(failure.bucket, Some(2));
    assert_eq!(failure.committed_buckets, 0);
    assert_eq!(failure.committed.segment_count(), 1);
}

// ============================================================================
// SABR scenario
// ============================================================================

/// Five payer swaptions priced by SABR are matched by a calibrated Hull-White.
#[test]
fn test_hull_white_matches_sabr_basket() {
    init_tracing();
    let c = curves();
    let provider = sabr_provider(0.3, -0.2);
    let basket = CalibrationBasket::expiry_ladder(
        &[1.0, 2.0, 3.0, 4.0, 5.0],
        5.0,
        1,
        0.03,
        NOTIONAL,
        SwaptionType::Payer,
    )
    .unwrap();
    let instruments: Vec<Swaption> = basket.buckets().iter().flatten().cloned().collect();
    let targets: Vec<f64> = instruments
        .iter()
        .map(|s| provider.target_price(s, &c).unwrap())
        .collect();

    let uncalibrated = HullWhiteParameters::constant(0.05, 0.01).unwrap();
    let objective =
        HullWhiteObjective::from_parameters(uncalibrated.clone(), Arc::clone(&c)).unwrap();
    let model = calibrate(basket, objective, provider, CalibrationConfig::default()).unwrap();

    let pricer = HullWhiteSwaptionPricer::new();
    for (swaption, target) in instruments.iter().zip(&targets) {
        let calibrated = pricer
            .present_value(swaption, &model.parameters, &c)
            .unwrap();
        assert!(
            (calibrated - target).abs() < TOLERANCE_PV,
            "expiry {}: calibrated {} vs target {}",
            swaption.expiry(),
            calibrated,
            target
        );
    }
    assert!(model.report.is_within(TOLERANCE_PV));

    let misses = instruments
        .iter()
        .zip(&targets)
        .filter(|(s, target)| {
            let pv = pricer.present_value(s, &uncalibrated, &c).unwrap();
            (pv - *target).abs() >= TOLERANCE_PV
        })
        .count();
    assert_eq!(misses, instruments.len(), "seed parameters must not fit the basket");
}

// ============================================================================
// Least squares
// ============================================================================

/// Factor and displacement are both recovered from a three-strike bucket.
#[test]
fn test_lmm_least_squares_recovers_displacement() {
    init_tracing();
    let truth = LmmDdParameters::regular_two_factor(0.0, 20, 2, 0.05, 0.25, 0.01).unwrap();
    let provider = ModelPriceProvider::new(LmmDdSwaptionPricer, truth);
    let basket = CalibrationBasket::expiry_ladder(
        &[1.0, 2.0],
        2.0,
        2,
        0.03,
        NOTIONAL,
        SwaptionType::Payer,
    )
    .unwrap()
    .with_strike_offsets(&[-0.005, 0.0, 0.005])
    .unwrap();
    let objective = LmmDdObjective::least_squares(lmm_seed(), curves());
    assert_eq!(objective.method(), CalibrationMethod::LeastSquares);

    let model = calibrate(basket, objective, provider, CalibrationConfig::default()).unwrap();

    for bucket in &model.report.buckets {
        assert_eq!(bucket.residuals.len(), 3);
        assert_relative_eq!(bucket.values[0], 1.25, max_relative = 1e-4);
        assert_relative_eq!(bucket.values[1], 0.05, epsilon = 1e-4);
    }
    let displacements = model.parameters.displacements();
    assert!(displacements[..8].iter().all(|d| (d - 0.05).abs() < 1e-4));
    assert_eq!(displacements[8], 0.1);
    assert!(model.report.is_within(TOLERANCE_PV));
}

/// A smile the model cannot match still yields a best fit no worse than the seed.
#[test]
fn test_lmm_least_squares_best_fit_on_sabr_smile() {
    init_tracing();
    let c = curves();
    let provider = sabr_provider(0.8, -0.6);
    let basket = CalibrationBasket::expiry_ladder(
        &[1.0, 2.0],
        2.0,
        2,
        0.03,
        NOTIONAL,
        SwaptionType::Payer,
    )
    .unwrap()
    .with_strike_offsets(&[-0.01, 0.0, 0.01, 0.02])
    .unwrap();

    // Residual sum of squares of the first bucket at the seed
    let seed = lmm_seed();
    let seed_ss: f64 = basket.buckets()[0]
        .iter()
        .map(|s| {
            let target = provider.target_price(s, &c).unwrap();
            let model = LmmDdSwaptionPricer.present_value(s, &seed, &c).unwrap();
            (model - target).powi(2)
        })
        .sum();

    let objective = LmmDdObjective::least_squares(seed, Arc::clone(&c));
    let model = calibrate(basket, objective, provider, CalibrationConfig::default()).unwrap();

    assert_eq!(model.report.buckets.len(), 2);
    assert!(model.report.buckets[0].residual_ss() <= seed_ss);
    assert!(model
        .report
        .fits
        .iter()
        .all(|fit| fit.model_price.is_finite()));
}

/// Stagnation is a failure when the configuration asks for it.
#[test]
fn test_least_squares_stagnation_can_fail_the_run() {
    let provider = sabr_provider(0.8, -0.6);
    let basket = CalibrationBasket::expiry_ladder(
        &[1.0, 2.0],
        2.0,
        2,
        0.03,
        NOTIONAL,
        SwaptionType::Payer,
    )
    .unwrap()
    .with_strike_offsets(&[-0.01, 0.0, 0.01, 0.02])
    .unwrap();
    let config = CalibrationConfig::default().with_fail_on_least_squares_stagnation(true);
    let objective = LmmDdObjective::least_squares(lmm_seed(), curves());

    let failure = calibrate(basket, objective, provider, config).unwrap_err();

    assert_eq!(failure.bucket, Some(0));
    assert_eq!(failure.committed_buckets, 0);
    assert_eq!(failure.committed.displacements(), lmm_seed().displacements());
}

// ============================================================================
// Amortized swaptions
// ============================================================================

/// An amortizing swaption is repriced after calibrating to its vanilla ladder.
#[test]
fn test_amortized_ladder_reprices_parent() {
    init_tracing();
    let c = curves();
    let truth = LmmDdParameters::regular_two_factor(0.0, 20, 2, 0.1, 0.25, 0.01).unwrap();
    let leg = FixedLeg::amortizing(2.0, 2, vec![100.0, 80.0, 60.0, 40.0, 20.0]).unwrap();
    let parent = Swaption::new(2.0, leg, 0.031, SwaptionType::Receiver).unwrap();

    let basket = CalibrationBasket::amortized_swaption_ladder(&parent).unwrap();
    assert_eq!(basket.len(), 5);

    let provider = ModelPriceProvider::new(LmmDdSwaptionPricer, truth.clone());
    let objective = LmmDdObjective::root_finding(lmm_seed(), Arc::clone(&c));
    let model = calibrate(basket, objective, provider, CalibrationConfig::default()).unwrap();

    let expected = LmmDdSwaptionPricer.present_value(&parent, &truth, &c).unwrap();
    let repriced = LmmDdSwaptionPricer
        .present_value(&parent, &model.parameters, &c)
        .unwrap();
    assert_relative_eq!(repriced, expected, max_relative = 1e-6);
}
