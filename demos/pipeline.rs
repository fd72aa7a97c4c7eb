//! Forecast Band Pipeline Example
//!
//! Feeds a stream of noisy multi-step forecasts through the rolling band
//! aggregator, the sequential assembler and the masked metric engine.
//!
//! Run with: RUST_LOG=forecast_band=debug cargo run --example pipeline

use chrono::{Duration, TimeZone, Utc};
use forecast_band::prelude::*;
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

const HORIZON: usize = 6;
const BATCH: usize = 8;
const BLOCKS: usize = 10;

fn truth(t: usize) -> f64 {
    20.0 + 3.0 * (t as f64 * 0.2).sin()
}

fn main() -> forecast_band::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Forecast Band Pipeline Example ===\n");

    let mut rng = StdRng::seed_from_u64(2024);
    let mut band = RollingBandAggregator::new(BandConfig::new(HORIZON, 1).with_strict_order(true))?;
    let mut assembler = SequentialAssembler::new(AssemblerConfig::new(HORIZON, 1))?;
    let engine = MaskedMetricEngine::new(MetricConfig::default())?;
    let mut state = MetricState::new();

    println!("--- Rolling band (finalized rows) ---\n");
    println!("{:>5}  {:>8}  {:>8}  {:>8}  {:>8}", "t", "truth", "median", "lower", "upper");

    for i in 0..BLOCKS {
        let anchor = i * BATCH;
        // forecasts made further ahead are noisier
        let values = Array3::from_shape_fn((BATCH, HORIZON, 1), |(b, f, _)| {
            let spread = 0.1 * (f + 1) as f64;
            truth(anchor + b + f) + rng.gen_range(-spread..spread)
        });
        let block = ForecastBlock::new(values)?.with_anchor(anchor);

        let estimate = band.ingest(block.clone())?;
        let (lower, upper) = (estimate.lower(2.0), estimate.upper(2.0));
        for row in 0..estimate.finalized() {
            let t = estimate.start() + row;
            println!(
                "{:>5}  {:>8.3}  {:>8.3}  {:>8.3}  {:>8.3}",
                t,
                truth(t),
                estimate.median()[[row, 0]],
                lower[[row, 0]],
                upper[[row, 0]]
            );
        }

        let actual: Vec<f64> = (0..BATCH).map(|b| truth(anchor + b)).collect();
        let predicted = block.lag(0).column(0).to_vec();
        // pretend every fifth ground-truth value was imputed
        let mask: Vec<f64> = (0..BATCH)
            .map(|b| if (anchor + b) % 5 == 0 { 1.0 } else { 0.0 })
            .collect();
        engine.score(&mut state, &actual[..], &predicted[..], &mask[..])?;

        assembler.ingest(block)?;
    }

    println!("\n--- One-step-ahead accuracy ---\n");
    println!("{}", engine.report(&state, state.batches())?);

    println!("\n--- Assembled series (first rows) ---\n");
    let series = assembler.finalize();
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let times: Vec<_> = (0..series.len())
        .map(|i| base + Duration::hours(i as i64))
        .collect();
    for (time, value) in series.with_timestamps(&times, 0)?.into_iter().take(10) {
        println!("{}  {:>8.3}", time.format("%Y-%m-%d %H:%M"), value);
    }
    println!("... {} rows total", series.len());

    Ok(())
}
