//! Replay
//!
//! Slides a fixed window over one historical series and runs context,
//! resistance and trigger on each window, using the window both as trend and
//! entry series. Every signal is walked forward over the bars that follow the
//! window: the stop is checked before the target on each bar.

use chrono::{DateTime, Utc};
use common::{ScreenerError, Series, Symbol};
use serde::{Deserialize, Serialize};
use signal_generation::{RejectionKind, ShortSignalGenerator};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Bars handed to the generator per step
    pub window_bars: usize,
    /// Bars walked forward after a signal before it counts as open
    pub max_hold_bars: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            window_bars: 60,
            max_hold_bars: 20,
        }
    }
}

impl ReplayConfig {
    pub fn validate(&self) -> Result<(), ScreenerError> {
        if self.window_bars == 0 || self.max_hold_bars == 0 {
            return Err(ScreenerError::config(
                "replay window_bars and max_hold_bars must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeOutcome {
    /// Low reached the take profit
    Win,
    /// High reached the stop
    Loss,
    /// Neither level touched within the hold limit
    Open,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayTrade {
    pub symbol: Symbol,
    /// Open time of the first bar after the window
    pub entry_time: DateTime<Utc>,
    pub entry: f64,
    pub stop: f64,
    pub take_profit: f64,
    pub outcome: TradeOutcome,
    pub bars_held: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub signals: usize,
    pub wins: usize,
    pub losses: usize,
    pub open: usize,
    /// Wins over closed trades, 0 when nothing closed
    pub win_rate: f64,
}

impl ReplaySummary {
    fn from_trades(trades: &[ReplayTrade]) -> Self {
        let count = |outcome| trades.iter().filter(|t| t.outcome == outcome).count();
        let wins = count(TradeOutcome::Win);
        let losses = count(TradeOutcome::Loss);
        let closed = wins + losses;

        Self {
            signals: trades.len(),
            wins,
            losses,
            open: count(TradeOutcome::Open),
            win_rate: if closed == 0 { 0.0 } else { wins as f64 / closed as f64 },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub symbol: Symbol,
    pub bars: usize,
    pub windows: usize,
    pub rejections: BTreeMap<RejectionKind, usize>,
    pub trades: Vec<ReplayTrade>,
    pub summary: ReplaySummary,
}

pub struct Replayer {
    generator: ShortSignalGenerator,
    config: ReplayConfig,
}

impl Replayer {
    pub fn new(generator: ShortSignalGenerator, config: ReplayConfig) -> Result<Self, ScreenerError> {
        config.validate()?;
        Ok(Self { generator, config })
    }

    pub fn run(&self, series: &Series) -> ReplayReport {
        let window = self.config.window_bars;
        let hold = self.config.max_hold_bars;
        let mut rejections = BTreeMap::new();
        let mut trades = Vec::new();
        let mut windows = 0;

        // The walk starts on bar `end` itself, so `end + hold <= len` is the
        // last window with a full hold period behind it. Walking from
        // `end + 1` would need the exclusive bound `len - hold` instead.
        let last_end = series.len().saturating_sub(hold);
        for end in window..=last_end {
            windows += 1;
            let slice = series.slice(end - window..end);

            let signal = self
                .generator
                .check_context(&slice)
                .and_then(|_| self.generator.calculate_resistance(&slice))
                .and_then(|resistance| self.generator.check_trigger(&slice, resistance));

            let signal = match signal {
                Ok(signal) => signal,
                Err(rejection) => {
                    *rejections.entry(rejection.kind()).or_insert(0) += 1;
                    continue;
                }
            };

            let (outcome, bars_held) = walk_forward(series, end, hold, signal.stop_loss(), signal.take_profit());
            let entry_time = series.candles()[end].timestamp;
            debug!(
                "{} signal at {}: entry={:.4} stop={:.4} target={:.4} -> {:?} after {} bars",
                series.symbol,
                entry_time,
                signal.entry_price(),
                signal.stop_loss(),
                signal.take_profit(),
                outcome,
                bars_held
            );

            trades.push(ReplayTrade {
                symbol: series.symbol.clone(),
                entry_time,
                entry: signal.entry_price(),
                stop: signal.stop_loss(),
                take_profit: signal.take_profit(),
                outcome,
                bars_held,
            });
        }

        let summary = ReplaySummary::from_trades(&trades);
        info!(
            "📊 {} replay: {} windows, {} signals, {} wins, {} losses, {} open, win rate {:.1}%",
            series.symbol,
            windows,
            summary.signals,
            summary.wins,
            summary.losses,
            summary.open,
            summary.win_rate * 100.0
        );

        ReplayReport {
            symbol: series.symbol.clone(),
            bars: series.len(),
            windows,
            rejections,
            trades,
            summary,
        }
    }
}

/// Bars from `start` on, at most `hold` of them
fn walk_forward(series: &Series, start: usize, hold: usize, stop: f64, take_profit: f64) -> (TradeOutcome, usize) {
    let candles = series.candles();
    let end = (start + hold).min(candles.len());

    for (offset, candle) in candles[start..end].iter().enumerate() {
        if candle.high >= stop {
            return (TradeOutcome::Loss, offset + 1);
        }
        if candle.low <= take_profit {
            return (TradeOutcome::Win, offset + 1);
        }
    }
    (TradeOutcome::Open, end - start)
}
