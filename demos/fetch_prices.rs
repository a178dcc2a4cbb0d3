//! Example: Fetching prices and network metrics
//!
//! Run with: cargo run --example fetch_prices

use anyhow::Result;
use rust_hhi_forecast::data::{BlockchainClient, CoinGeckoClient};

#[tokio::main]
async fn main() -> Result<()> {
    println!("Price and Network Data Example");
    println!("{}", "=".repeat(40));

    let coingecko = CoinGeckoClient::new()?;

    // Daily history for the last 90 days
    println!("\n📥 Fetching BTC/USD history from CoinGecko...");
    let points = coingecko.price_history("bitcoin", "usd", 90).await?;
    println!("   Fetched {} price points", points.len());

    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        let change = (last.value / first.value - 1.0) * 100.0;
        println!("   First: ${:.2}", first.value);
        println!("   Last:  ${:.2} ({:+.2}%)", last.value, change);
    }

    for vs in ["usd", "eur"] {
        let spot = coingecko.spot_price("bitcoin", vs).await?;
        println!("   Spot {}: {:.2}", vs.to_uppercase(), spot);
    }

    println!("\n⛓  Querying Blockchain.com...");
    let snapshot = BlockchainClient::new()?.snapshot().await?;
    println!("   Difficulty:   {}", snapshot.difficulty);
    println!("   Block height: {}", snapshot.height);
    println!("   Unconfirmed:  {}", snapshot.unconfirmed);

    Ok(())
}
