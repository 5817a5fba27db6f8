// Signal model
// A priced short setup, the external factors attached to it, and the ranked subset

use crate::market::Symbol;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every indicator value that took part in a trigger decision
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub resistance_raw: f64,
    pub resistance_buffered: f64,
    pub volume: f64,
    pub volume_ma: f64,
    pub ema_short: f64,
    pub ema_long: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("short ordering violated: stop {stop_loss} > entry {entry_price} > target {take_profit} required")]
    Ordering {
        entry_price: f64,
        stop_loss: f64,
        take_profit: f64,
    },

    #[error("non-finite price in signal for {0}")]
    NonFinite(Symbol),
}

/// Priced short setup. Immutable once created.
///
/// Invariant: `stop_loss > entry_price > take_profit`, so `risk() > 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    symbol: Symbol,
    entry_price: f64,
    stop_loss: f64,
    take_profit: f64,
    indicators: IndicatorSnapshot,
}

impl Signal {
    pub fn new(
        symbol: Symbol,
        entry_price: f64,
        stop_loss: f64,
        take_profit: f64,
        indicators: IndicatorSnapshot,
    ) -> Result<Self, SignalError> {
        if !(entry_price.is_finite() && stop_loss.is_finite() && take_profit.is_finite()) {
            return Err(SignalError::NonFinite(symbol));
        }
        if !(stop_loss > entry_price && entry_price > take_profit) {
            return Err(SignalError::Ordering {
                entry_price,
                stop_loss,
                take_profit,
            });
        }
        Ok(Self {
            symbol,
            entry_price,
            stop_loss,
            take_profit,
            indicators,
        })
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub fn stop_loss(&self) -> f64 {
        self.stop_loss
    }

    pub fn take_profit(&self) -> f64 {
        self.take_profit
    }

    pub fn indicators(&self) -> &IndicatorSnapshot {
        &self.indicators
    }

    /// Distance from entry to stop
    pub fn risk(&self) -> f64 {
        self.stop_loss - self.entry_price
    }

    /// Distance from entry to target
    pub fn reward(&self) -> f64 {
        self.entry_price - self.take_profit
    }

    pub fn reward_risk(&self) -> f64 {
        self.reward() / self.risk()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

/// Sentiment and volume-anomaly annotation for one symbol
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExternalFactors {
    pub sentiment: SentimentLabel,
    pub news_count: usize,
    pub anomalous_volume: bool,
    pub anomalous_volume_z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
}

/// Short-horizon activity on the entry timeframe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecentActivity {
    pub avg_volume: f64,
    pub direction: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedSignal {
    pub signal: Signal,
    pub factors: ExternalFactors,
    pub recent: RecentActivity,
}

impl EnrichedSignal {
    pub fn symbol(&self) -> &Symbol {
        self.signal.symbol()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSignal {
    /// 1 = preferred
    pub rank: usize,
    pub signal: EnrichedSignal,
}

/// Ordered subset chosen by the advisory step
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankingDecision {
    pub ranked: Vec<RankedSignal>,
}

impl RankingDecision {
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn symbols(&self) -> Vec<&Symbol> {
        self.ranked.iter().map(|r| r.signal.symbol()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_enforces_short_ordering() {
        let sym = Symbol::from("ARPA_USDT");
        assert!(Signal::new(sym.clone(), 1.0, 1.1, 0.85, IndicatorSnapshot::default()).is_ok());
        assert!(matches!(
            Signal::new(sym.clone(), 1.23, 1.15, 1.30, IndicatorSnapshot::default()),
            Err(SignalError::Ordering { .. })
        ));
        assert!(Signal::new(sym.clone(), 1.0, 1.0, 0.9, IndicatorSnapshot::default()).is_err());
        assert!(matches!(
            Signal::new(sym, f64::NAN, 1.0, 0.9, IndicatorSnapshot::default()),
            Err(SignalError::NonFinite(_))
        ));
    }

    #[test]
    fn test_risk_and_reward() {
        let signal =
            Signal::new(Symbol::from("X"), 100.0, 102.0, 97.0, IndicatorSnapshot::default()).unwrap();
        assert!((signal.risk() - 2.0).abs() < 1e-12);
        assert!((signal.reward() - 3.0).abs() < 1e-12);
        assert!((signal.reward_risk() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_sentiment_label_serializes_lowercase() {
        let json = serde_json::to_string(&SentimentLabel::Negative).unwrap();
        assert_eq!(json, "\"negative\"");
    }
}
