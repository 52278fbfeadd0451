//! Criterion benchmarks for pricer_optimiser.
//!
//! Measures successive Hull-White calibration over baskets of increasing
//! length and a least-squares LMM-DD calibration over a strike grid.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pricer_core::market_data::curves::CurveSet;
use pricer_models::instruments::rates::SwaptionType;
use pricer_models::models::rates::{HullWhiteParameters, LmmDdParameters};
use pricer_models::pricing::{HullWhiteSwaptionPricer, LmmDdSwaptionPricer, ModelPriceProvider};
use pricer_optimiser::calibration::{
    calibrate, CalibrationBasket, CalibrationConfig, HullWhiteObjective, LmmDdObjective,
};

/// Benchmark Hull-White calibration for 5, 10 and 20 expiry buckets.
fn bench_hull_white_calibration(c: &mut Criterion) {
    let mut group = c.benchmark_group("hull_white_calibration");
    let curves = Arc::new(CurveSet::with_flat_discount(0.03_f64));
    let truth = HullWhiteParameters::constant(0.05, 0.011).unwrap();

    for buckets in [5_usize, 10, 20] {
        let expiries: Vec<f64> = (1..=buckets).map(|i| i as f64 * 0.5).collect();
        group.bench_with_input(
            BenchmarkId::new("buckets", buckets),
            &expiries,
            |b, expiries| {
                b.iter(|| {
                    let basket = CalibrationBasket::expiry_ladder(
                        expiries,
                        5.0,
                        1,
                        0.03,
                        1.0e4,
                        SwaptionType::Payer,
                    )
                    .unwrap();
                    let provider =
                        ModelPriceProvider::new(HullWhiteSwaptionPricer::new(), truth.clone());
                    let objective =
                        HullWhiteObjective::new(0.05, 0.008, Arc::clone(&curves)).unwrap();
                    calibrate(
                        black_box(basket),
                        objective,
                        provider,
                        CalibrationConfig::default(),
                    )
                    .unwrap()
                });
            },
        );
    }

    group.finish();
}

/// Benchmark a two-bucket LMM-DD least-squares fit over three strikes.
fn bench_lmm_least_squares(c: &mut Criterion) {
    let curves = Arc::new(CurveSet::with_flat_discount(0.03_f64));
    let seed = LmmDdParameters::regular_two_factor(0.0, 20, 2, 0.1, 0.2, 0.01).unwrap();
    let truth = LmmDdParameters::regular_two_factor(0.0, 20, 2, 0.05, 0.25, 0.01).unwrap();

    c.bench_function("lmm_least_squares", |b| {
        b.iter(|| {
            let basket = CalibrationBasket::expiry_ladder(
                &[1.0, 2.0],
                2.0,
                2,
                0.03,
                1.0e4,
                SwaptionType::Payer,
            )
            .unwrap()
            .with_strike_offsets(&[-0.005, 0.0, 0.005])
            .unwrap();
            let provider = ModelPriceProvider::new(LmmDdSwaptionPricer, truth.clone());
            let objective = LmmDdObjective::least_squares(seed.clone(), Arc::clone(&curves));
            calibrate(
                black_box(basket),
                objective,
                provider,
                CalibrationConfig::fast(),
            )
            .unwrap()
        });
    });
}

criterion_group!(benches, bench_hull_white_calibration, bench_lmm_least_squares);
criterion_main!(benches);
