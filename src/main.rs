//! Command-line entry point
//!
//! Subcommands:
//! - `forecast`: train on pool block counts and prices, forecast HHI and price
//! - `revenue`: estimate expected miner revenue from a network metrics CSV
//! - `network`: fetch live difficulty, block height, mempool size and spot price
//!
//! Usage:
//! ```
//! cargo run -- forecast --pools data/pools.json --fetch-days 365 --horizon 2026-12-31
//! cargo run -- revenue --csv data/btc.csv --hashrate-th 200
//! cargo run -- network --out results/network.json
//! ```

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use rust_hhi_forecast::{
    data::{
        load_market_payload, load_network_metrics, load_pool_counts, load_price_points,
        save_forecast_csv, save_json, BlockchainClient, CoinGeckoClient, DailyPoolRecord,
        ForecastReport, NetworkSnapshot, PricePoint,
    },
    pipeline::{Pipeline, PipelineConfig, PipelineInput, TargetForecast},
    revenue::{estimate_revenue, save_revenue_csv, RevenueParams},
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Mining pool concentration and price forecasting")]
struct Cli {
    /// Log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Forecast HHI and price to a horizon date
    Forecast(ForecastArgs),
    /// Estimate expected miner revenue
    Revenue(RevenueArgs),
    /// Fetch live network metrics and spot price
    Network(NetworkArgs),
}

#[derive(Args, Debug)]
struct ForecastArgs {
    /// JSON file with `{"pools": ..., "prices": ...}`
    #[arg(long, conflicts_with_all = ["pools", "prices"])]
    market: Option<PathBuf>,

    /// JSON file mapping date -> pool -> block count
    #[arg(long)]
    pools: Option<PathBuf>,

    /// JSON file with a `prices` array of [timestamp_ms, value]
    #[arg(long, conflicts_with = "fetch_days")]
    prices: Option<PathBuf>,

    /// Fetch this many days of prices from CoinGecko instead of a file
    #[arg(long)]
    fetch_days: Option<u32>,

    /// CoinGecko coin id
    #[arg(long, default_value = "bitcoin")]
    coin: String,

    /// Quote currency
    #[arg(long, default_value = "usd")]
    vs_currency: String,

    /// Pipeline configuration JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Analysis start date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last forecast date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    horizon: Option<NaiveDate>,

    /// Comma-separated major pool labels
    #[arg(long, value_delimiter = ',')]
    majors: Option<Vec<String>>,

    /// Output directory
    #[arg(short, long, default_value = "results")]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct RevenueArgs {
    /// Network metrics CSV (CoinMetrics export)
    #[arg(long)]
    csv: PathBuf,

    /// Miner hashrate in TH/s
    #[arg(long, default_value = "100")]
    hashrate_th: f64,

    #[arg(long, default_value = "144")]
    blocks_per_day: f64,

    /// Block subsidy in BTC
    #[arg(long, default_value = "3.125")]
    subsidy_btc: f64,

    /// Output CSV file
    #[arg(short, long, default_value = "results/revenue_estimate.csv")]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct NetworkArgs {
    /// CoinGecko coin id
    #[arg(long, default_value = "bitcoin")]
    coin: String,

    /// Quote currency
    #[arg(long, default_value = "usd")]
    vs_currency: String,

    /// Also write the snapshot as JSON
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct NetworkReport {
    #[serde(flatten)]
    network: NetworkSnapshot,
    spot_price: f64,
    vs_currency: String,
}

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match cli.command {
        Command::Forecast(args) => run_forecast(args).await,
        Command::Revenue(args) => run_revenue(args),
        Command::Network(args) => run_network(args).await,
    }
}

fn build_config(args: &ForecastArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(start) = args.start {
        config.start_date = start;
    }
    if let Some(horizon) = args.horizon {
        config.horizon_end = horizon;
    }
    if let Some(majors) = &args.majors {
        config.major_pools = majors.iter().map(|m| m.trim().to_string()).collect();
    }

    Ok(config)
}

async fn load_inputs(args: &ForecastArgs) -> Result<(Vec<DailyPoolRecord>, Vec<PricePoint>)> {
    if let Some(path) = &args.market {
        return load_market_payload(path)
            .with_context(|| format!("Failed to load market payload {}", path.display()));
    }

    let Some(pools_path) = &args.pools else {
        bail!("either --market or --pools is required");
    };
    let pools = load_pool_counts(pools_path)
        .with_context(|| format!("Failed to load pool counts {}", pools_path.display()))?;

    let prices = match (&args.prices, args.fetch_days) {
        (Some(path), _) => load_price_points(path)
            .with_context(|| format!("Failed to load prices {}", path.display()))?,
        (None, Some(days)) => {
            let client = CoinGeckoClient::new()?;
            client
                .price_history(&args.coin, &args.vs_currency, days)
                .await
                .context("Failed to fetch prices from CoinGecko")?
        }
        (None, None) => bail!("either --prices or --fetch-days is required"),
    };

    Ok((pools, prices))
}

fn save_target(out: &Path, result: &TargetForecast) -> Result<()> {
    let name = result.target.name();

    let report = ForecastReport::new(name, &result.forecast);
    save_json(&out.join(format!("{}_forecast.json", name)), &report)?;
    save_forecast_csv(&out.join(format!("{}_forecast.csv", name)), &result.forecast)?;
    fs::write(out.join(format!("{}_model.json", name)), result.model.to_json()?)?;

    if let Some(shares) = &result.share_table {
        save_json(&out.join("pool_shares.json"), shares)?;
    }

    Ok(())
}

fn print_summary(result: &TargetForecast) {
    let forecast = &result.forecast;

    println!("\n  {}", result.target.name().to_uppercase());
    println!("  {}", "-".repeat(40));
    println!("  History: {} days through {}", forecast.history().len(), forecast.history_end());
    println!("  Forecast: {} days", forecast.horizon_len());
    println!("  In-sample RMSE: {:.6}", result.metrics.rmse.unwrap_or(0.0));
    println!("  In-sample R²: {:.4}", result.metrics.r2.unwrap_or(0.0));

    if let (Some(date), Some(value)) = (forecast.series().last_date(), forecast.series().last_value()) {
        println!("  Value on {}: {:.6}", date, value);
    }

    println!("  Top features:");
    let mut importance = result.model.feature_importance();
    importance.sort_by(|a, b| b.1.total_cmp(&a.1));
    for (name, score) in importance.iter().take(3) {
        println!("  - {:<12} {:.3}", name, score);
    }
}

async fn run_forecast(args: ForecastArgs) -> Result<()> {
    let config = build_config(&args)?;
    let (pools, prices) = load_inputs(&args).await?;

    println!("\n{}", "=".repeat(60));
    println!("  Mining Pool Concentration & Price Forecast");
    println!("  {} -> {}", config.start_date, config.horizon_end);
    println!("{}", "=".repeat(60));

    let pipeline = Pipeline::new(config)?;
    let output = pipeline.run(&PipelineInput { pools, prices })?;

    fs::create_dir_all(&args.out)
        .with_context(|| format!("Failed to create {}", args.out.display()))?;

    for result in [&output.hhi, &output.price] {
        save_target(&args.out, result)?;
        print_summary(result);
    }

    info!("Results written to {}", args.out.display());
    Ok(())
}

fn run_revenue(args: RevenueArgs) -> Result<()> {
    let params = RevenueParams {
        miner_hashrate_th: args.hashrate_th,
        blocks_per_day: args.blocks_per_day,
        block_subsidy_btc: args.subsidy_btc,
    };

    let metrics = load_network_metrics(&args.csv)
        .with_context(|| format!("Failed to load metrics {}", args.csv.display()))?;
    let estimates = estimate_revenue(&metrics, &params)?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    save_revenue_csv(&args.out, &estimates)?;
    println!("Revenue table saved -> {}", args.out.display());

    match estimates.last() {
        Some(latest) => {
            let label = match latest.date {
                Some(date) => date.to_string(),
                None => format!("row {}", latest.position),
            };
            println!(
                "Latest ({}, miner {} TH/s): USD/day ≈ {:.2}",
                label, params.miner_hashrate_th, latest.expected_usd_per_day
            );
        }
        None => println!("No day had complete metrics"),
    }

    Ok(())
}

async fn run_network(args: NetworkArgs) -> Result<()> {
    let network = BlockchainClient::new()?
        .snapshot()
        .await
        .context("Failed to query Blockchain.com")?;
    let spot_price = CoinGeckoClient::new()?
        .spot_price(&args.coin, &args.vs_currency)
        .await
        .context("Failed to fetch spot price from CoinGecko")?;

    println!("Difficulty:    {}", network.difficulty);
    println!("Block height:  {}", network.height);
    println!("Unconfirmed:   {}", network.unconfirmed);
    println!("Spot price:    {:.2} {}", spot_price, args.vs_currency.to_uppercase());

    if let Some(path) = &args.out {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let report = NetworkReport {
            network,
            spot_price,
            vs_currency: args.vs_currency.clone(),
        };
        save_json(path, &report)?;
        info!("Snapshot written to {}", path.display());
    }

    Ok(())
}
