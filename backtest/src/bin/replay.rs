use anyhow::{Context, Result};
use backtest::{ReplayConfig, Replayer};
use chrono::{NaiveDate, TimeZone, Utc};
use clap::Parser;
use common::{MarketDataSource, Symbol, Timeframe};
use data_ingestion::{MexcClient, MexcConfig};
use signal_generation::{ShortSignalGenerator, SignalConfig};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "replay", about = "Replay the short-setup generator over MEXC history")]
struct Args {
    #[arg(long, default_value = "DBR_USDT")]
    symbol: String,

    /// First day, YYYY-MM-DD (UTC)
    #[arg(long)]
    start: NaiveDate,

    /// Last day, exclusive, YYYY-MM-DD (UTC)
    #[arg(long)]
    end: NaiveDate,

    #[arg(long, default_value = "Min5")]
    interval: Timeframe,

    #[arg(long, default_value_t = 60)]
    window_bars: usize,

    #[arg(long, default_value_t = 20)]
    max_hold_bars: usize,

    #[arg(long, default_value = "replay_results.json")]
    output: PathBuf,
}

fn midnight(day: NaiveDate) -> Result<chrono::DateTime<Utc>> {
    let naive = day.and_hms_opt(0, 0, 0).context("Invalid date")?;
    Ok(Utc.from_utc_datetime(&naive))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = ReplayConfig {
        window_bars: args.window_bars,
        max_hold_bars: args.max_hold_bars,
    };
    let signal_config = SignalConfig::default();
    signal_config.validate()?;
    let replayer = Replayer::new(ShortSignalGenerator::new(signal_config), config)?;

    info!(
        "Replaying {} {} from {} to {}",
        args.symbol, args.interval, args.start, args.end
    );

    let client = MexcClient::new(&MexcConfig::default());
    let symbol = Symbol::new(args.symbol);
    let fetched = client
        .get_candles(&symbol, args.interval, midnight(args.start)?, midnight(args.end)?)
        .await;
    client.close().await?;
    let series = fetched.with_context(|| format!("Failed to fetch candles for {}", symbol))?;

    if series.is_empty() {
        warn!("⚠️  No candle data for {}", symbol);
        return Ok(());
    }

    let report = replayer.run(&series);

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize replay")?;
    std::fs::write(&args.output, json)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(
        "✅ Replay complete, {} trades written to {}",
        report.trades.len(),
        args.output.display()
    );
    Ok(())
}
