use chrono::Utc;
use common::{MarketDataSource, Symbol, Timeframe};
use data_ingestion::connectors::mexc::{MexcClient, MexcConfig};
use tracing::{error, info};
use tracing_subscriber::fmt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting MEXC futures connectivity probe...");

    // Note: This probe hits the real public MEXC endpoints
    // Run with: cargo run --bin mexc_probe -- [SYMBOL]
    let client = MexcClient::new(&MexcConfig::default());

    let symbols = client.list_tradable_symbols().await?;
    info!("✅ {} tradable USDT perpetuals", symbols.len());

    let symbol = match std::env::args().nth(1) {
        Some(arg) => Symbol::new(arg),
        None => match symbols.first() {
            Some(first) => first.clone(),
            None => {
                error!("Exchange listed no contracts");
                return Ok(());
            }
        },
    };

    match client.get_liquidity(&symbol).await {
        Ok(liquidity) => info!(
            "{} 24h volume: {:.0}, open interest: {:.0}",
            symbol, liquidity.volume_24h_usd, liquidity.open_interest_usd
        ),
        Err(e) => error!("Liquidity lookup failed for {}: {:#}", symbol, e),
    }

    let end = Utc::now();
    for timeframe in [Timeframe::Min60, Timeframe::Min15] {
        let start = timeframe.lookback_start(end, 200);
        match client.get_candles(&symbol, timeframe, start, end).await {
            Ok(series) => {
                info!("{} {}: {} candles", symbol, timeframe, series.len());
                if let Some(last) = series.last() {
                    info!(
                        "  → last {} O={} H={} L={} C={} V={}",
                        last.timestamp, last.open, last.high, last.low, last.close, last.volume
                    );
                }
            }
            Err(e) => error!("Kline fetch failed for {} {}: {:#}", symbol, timeframe, e),
        }
    }

    client.close().await?;
    info!("Probe complete.");
    Ok(())
}
