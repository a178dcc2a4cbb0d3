//! Example: Forecasting pool concentration and price
//!
//! Builds synthetic pool block counts and prices, then runs the full
//! pipeline without touching the network.
//!
//! Run with: cargo run --example forecast

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use rust_hhi_forecast::{
    data::{DailyPoolRecord, PricePoint},
    models::GbmParams,
    pipeline::{Pipeline, PipelineConfig, PipelineInput},
};

const DAYS: i64 = 180;

fn synthetic_pools(start: NaiveDate) -> Vec<DailyPoolRecord> {
    (0..DAYS)
        .flat_map(|i| {
            let date = start + Duration::days(i);
            // Foundry slowly gains share from the long tail
            let drift = i as f64 * 0.05;
            vec![
                DailyPoolRecord::new(date, "Foundry USA", 40.0 + drift),
                DailyPoolRecord::new(date, "AntPool", 35.0 + (i % 7) as f64),
                DailyPoolRecord::new(date, "ViaBTC", 20.0),
                DailyPoolRecord::new(date, "SBI Crypto", 5.0),
                DailyPoolRecord::new(date, "Braiins Pool", (10.0 - drift).max(1.0)),
            ]
        })
        .collect()
}

fn synthetic_prices(start: NaiveDate) -> Vec<PricePoint> {
    (0..DAYS)
        .filter_map(|i| {
            let ts = (start + Duration::days(i)).and_hms_opt(0, 0, 0)?.and_utc();
            let value = 60_000.0 + 80.0 * i as f64 + 1_500.0 * (i as f64 / 9.0).sin();
            Some(PricePoint::new(ts.timestamp_millis(), value))
        })
        .collect()
}

fn main() -> Result<()> {
    println!("HHI and Price Forecast Example");
    println!("{}", "=".repeat(40));

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    let config = PipelineConfig {
        start_date: start,
        horizon_end: start + Duration::days(DAYS + 60),
        gbm: GbmParams {
            n_estimators: 150,
            ..GbmParams::default()
        },
        ..PipelineConfig::default()
    };

    let input = PipelineInput {
        pools: synthetic_pools(start),
        prices: synthetic_prices(start),
    };
    println!("\n📊 {} pool records, {} price points", input.pools.len(), input.prices.len());

    println!("\n🌲 Training and forecasting...");
    let output = Pipeline::new(config)?.run(&input)?;

    for result in [&output.hhi, &output.price] {
        let forecast = &result.forecast;
        println!("\n   {}", result.target.name().to_uppercase());
        println!("   History ends:  {}", forecast.history_end());
        println!("   Forecast days: {}", forecast.horizon_len());
        println!("   In-sample R²:  {:.4}", result.metrics.r2.unwrap_or(0.0));

        for point in forecast.points().iter().filter(|p| p.is_forecast).step_by(15) {
            println!("   {}  {:.6}", point.date, point.value);
        }
    }

    if let Some(shares) = &output.hhi.share_table {
        println!("\n   Buckets: {}", shares.buckets().join(", "));
    }

    Ok(())
}
