//! Shared kernel for the short-signal screener.
//!
//! This crate holds everything the pipeline stages agree on:
//! - Market data model (symbols, candles, series, liquidity)
//! - Signal model (priced short setups, external factors, ranking)
//! - Ports for the market data and news collaborators
//! - The error taxonomy surfaced to callers

pub mod error;
pub mod market;
pub mod ports;
pub mod signal;

pub use error::ScreenerError;
pub use market::{Candle, LiquidityMetrics, Series, Symbol, Timeframe, Universe};
pub use ports::{Article, MarketDataSource, NewsLookup};
pub use signal::{
    EnrichedSignal, ExternalFactors, IndicatorSnapshot, RankedSignal, RankingDecision,
    RecentActivity, SentimentLabel, Signal, SignalError, TrendDirection,
};

// Re-exported so downstream crates agree on one timestamp type
pub use chrono::{DateTime, Utc};
