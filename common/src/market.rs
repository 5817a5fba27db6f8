// Market data model
// Symbols, candles and the ordered series the indicators consume

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Opaque tradable-instrument identifier (e.g. `BTC_USDT`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Base asset used as a news query (`BTC_USDT` -> `BTC`)
    pub fn base_asset(&self) -> &str {
        self.0
            .split(['_', '-', '/'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Set of symbols considered in a run; duplicates are dropped, first occurrence wins
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    symbols: Vec<Symbol>,
}

impl Universe {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        let mut seen = HashSet::new();
        let symbols = symbols
            .into_iter()
            .map(Into::into)
            .filter(|s: &Symbol| !s.as_str().is_empty() && seen.insert(s.clone()))
            .collect();
        Self { symbols }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn into_vec(self) -> Vec<Symbol> {
        self.symbols
    }
}

/// Candle interval, named after the exchange interval codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    Min1,
    Min5,
    Min15,
    Min30,
    Min60,
    Hour4,
    Day1,
}

impl Timeframe {
    pub fn seconds(&self) -> i64 {
        match self {
            Self::Min1 => 60,
            Self::Min5 => 5 * 60,
            Self::Min15 => 15 * 60,
            Self::Min30 => 30 * 60,
            Self::Min60 => 60 * 60,
            Self::Hour4 => 4 * 60 * 60,
            Self::Day1 => 24 * 60 * 60,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Min1 => "Min1",
            Self::Min5 => "Min5",
            Self::Min15 => "Min15",
            Self::Min30 => "Min30",
            Self::Min60 => "Min60",
            Self::Hour4 => "Hour4",
            Self::Day1 => "Day1",
        }
    }

    /// Start of a window of `bars` candles ending at `end`
    pub fn lookback_start(&self, end: DateTime<Utc>, bars: usize) -> DateTime<Utc> {
        end - chrono::Duration::seconds(self.seconds() * bars as i64)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Min1" => Ok(Self::Min1),
            "Min5" => Ok(Self::Min5),
            "Min15" => Ok(Self::Min15),
            "Min30" => Ok(Self::Min30),
            "Min60" => Ok(Self::Min60),
            "Hour4" => Ok(Self::Hour4),
            "Day1" => Ok(Self::Day1),
            other => Err(format!("unknown timeframe: {}", other)),
        }
    }
}

/// OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Ordered, gap-tolerant candles for one symbol and timeframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    candles: Vec<Candle>,
}

impl Series {
    /// Builds a series, sorting candles ascending by timestamp
    pub fn new(symbol: Symbol, timeframe: Timeframe, mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        Self {
            symbol,
            timeframe,
            candles,
        }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }

    /// Sub-series over `range`, keeping symbol and timeframe
    pub fn slice(&self, range: std::ops::Range<usize>) -> Series {
        Series {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe,
            candles: self.candles[range].to_vec(),
        }
    }
}

/// Liquidity snapshot for one symbol at evaluation time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityMetrics {
    pub volume_24h_usd: f64,
    pub open_interest_usd: f64,
}

impl LiquidityMetrics {
    pub fn new(volume_24h_usd: f64, open_interest_usd: f64) -> Self {
        Self {
            volume_24h_usd,
            open_interest_usd,
        }
    }

    /// Both metrics meet or exceed their thresholds
    pub fn meets(&self, min_volume_24h_usd: f64, min_open_interest_usd: f64) -> bool {
        self.volume_24h_usd >= min_volume_24h_usd && self.open_interest_usd >= min_open_interest_usd
    }
}
