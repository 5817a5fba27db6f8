//! Offline walk through the external-factor and advisory stages
//!
//! Scores canned headlines, annotates two priced setups and lets the
//! heuristic selector rank them. No network access.
//!
//! Run with: cargo run -p research-agents --example demo

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use common::{Article, Candle, IndicatorSnapshot, NewsLookup, Series, Signal, Symbol, Timeframe};
use research_agents::{
    resolve_ranking, AdvisorySelector, ExternalFactorConfig, ExternalFactorEvaluator,
    HeuristicSelector, LexiconScorer,
};
use std::sync::Arc;
use tracing::{info, Level};

/// Headlines keyed by base asset
struct CannedNews;

#[async_trait]
impl NewsLookup for CannedNews {
    async fn fetch_articles(&self, query: &str, _language: &str, _page_size: usize) -> Vec<Article> {
        let headline = |title: &str| Article {
            title: Some(title.to_string()),
            description: None,
        };
        match query {
            "ARPA" => vec![
                headline("ARPA em queda após hack"),
                headline("Investidores temem perdas"),
            ],
            "DBR" => vec![headline("DBR rally continues")],
            _ => Vec::new(),
        }
    }
}

fn entry_series(symbol: &str, spike: f64) -> Series {
    let candles = (0..25)
        .map(|i| {
            let close = 10.0 - 0.05 * i as f64;
            Candle {
                timestamp: Utc.timestamp_opt(1_700_000_000 + i * 900, 0).unwrap(),
                open: close,
                high: close + 0.05,
                low: close - 0.05,
                close,
                volume: if i == 24 { spike } else { 1000.0 + (i % 3) as f64 * 50.0 },
            }
        })
        .collect();
    Series::new(Symbol::from(symbol), Timeframe::Min15, candles)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let evaluator = ExternalFactorEvaluator::new(
        ExternalFactorConfig::default(),
        Arc::new(CannedNews),
        Arc::new(LexiconScorer::default()),
    );

    let mut enriched = Vec::new();
    for (symbol, spike, stop) in [("ARPA_USDT", 5000.0, 9.2), ("DBR_USDT", 1050.0, 9.0)] {
        let series = entry_series(symbol, spike);
        let signal = Signal::new(
            Symbol::from(symbol),
            8.8,
            stop,
            8.2,
            IndicatorSnapshot::default(),
        )?;
        let annotated = evaluator.enrich(signal, &series).await;
        info!(
            "{}: sentiment={} ({} news), volume z={:.2}, anomalous={}",
            symbol,
            annotated.factors.sentiment,
            annotated.factors.news_count,
            annotated.factors.anomalous_volume_z,
            annotated.factors.anomalous_volume
        );
        enriched.push(annotated);
    }

    let selector = HeuristicSelector;
    let picks = selector.select_best(&enriched, 1).await?;
    let decision = resolve_ranking(&enriched, &picks, 1);
    for ranked in &decision.ranked {
        info!("🤖 #{} {}", ranked.rank, ranked.signal.symbol());
    }
    Ok(())
}
