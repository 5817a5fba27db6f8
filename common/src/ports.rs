// Collaborator ports
// Transport details live in the implementations (see data-ingestion)

use crate::market::{LiquidityMetrics, Series, Symbol, Timeframe};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source of symbols, candles and liquidity figures
///
/// Every call may fail; callers decide whether a failure excludes a symbol
/// or aborts the run.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn list_tradable_symbols(&self) -> Result<Vec<Symbol>>;

    async fn get_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Series>;

    async fn get_liquidity(&self, symbol: &Symbol) -> Result<LiquidityMetrics>;

    /// Release transport handles held for the current run
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// News article as consumed by sentiment scoring
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// News search. Implementations return an empty list on any failure.
#[async_trait]
pub trait NewsLookup: Send + Sync {
    async fn fetch_articles(&self, query: &str, language: &str, page_size: usize) -> Vec<Article>;
}
