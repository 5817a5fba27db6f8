// Short Signal Generator
// Trend-timeframe context, rolling-high resistance and entry-timeframe trigger

use super::config::SignalConfig;
use super::filters::{self, Rejection};
use super::indicators;
use common::{IndicatorSnapshot, Series, Signal};
use tracing::debug;

/// Bearish-bias reading on a series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextReading {
    pub ema_short: f64,
    pub ema_long: f64,
    pub rsi: f64,
}

impl ContextReading {
    pub fn is_bearish(&self, rsi_ceiling: f64) -> bool {
        self.ema_short < self.ema_long && self.rsi < rsi_ceiling
    }
}

/// Per-symbol decision function for short setups
#[derive(Debug, Clone)]
pub struct ShortSignalGenerator {
    config: SignalConfig,
}

impl ShortSignalGenerator {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Reads EMA(short), EMA(long) and RSI on the close series
    pub fn read_context(&self, series: &Series) -> Result<ContextReading, Rejection> {
        require_bars(series, self.config.min_context_bars())?;
        let closes = series.closes();

        let ema_short = indicators::ema(&closes, self.config.ema_short_period);
        let ema_long = indicators::ema(&closes, self.config.ema_long_period);
        let rsi = indicators::rsi(&closes, self.config.rsi_period);

        match (ema_short.last(), ema_long.last(), indicators::last_defined(&rsi)) {
            (Some(&ema_short), Some(&ema_long), Some(rsi)) => Ok(ContextReading {
                ema_short,
                ema_long,
                rsi,
            }),
            _ => Err(Rejection::InsufficientData {
                required: self.config.min_context_bars().max(2),
                available: series.len(),
            }),
        }
    }

    /// Context passes only with EMA(short) < EMA(long) and RSI below the ceiling
    pub fn check_context(&self, series: &Series) -> Result<ContextReading, Rejection> {
        let reading = self.read_context(series)?;
        debug!(
            "{} context: EMA_SHORT={:.4}, EMA_LONG={:.4}, RSI={:.2}",
            series.symbol, reading.ema_short, reading.ema_long, reading.rsi
        );

        if !reading.is_bearish(self.config.rsi_ceiling) {
            return Err(Rejection::ContextNotBearish {
                ema_short: reading.ema_short,
                ema_long: reading.ema_long,
                rsi: reading.rsi,
            });
        }
        Ok(reading)
    }

    /// Maximum high over the most recent full window
    pub fn calculate_resistance(&self, series: &Series) -> Result<f64, Rejection> {
        let window = self.config.resistance_window;
        require_bars(series, window)?;

        let candles = series.candles();
        let resistance = candles[candles.len() - window..]
            .iter()
            .map(|c| c.high)
            .fold(f64::NEG_INFINITY, f64::max);
        Ok(resistance)
    }

    /// Entry-timeframe confirmation producing a priced short setup
    pub fn check_trigger(&self, series: &Series, resistance: f64) -> Result<Signal, Rejection> {
        require_bars(series, self.config.min_trigger_bars())?;

        let context = self.check_context(series).map_err(|rejection| {
            debug!("{} rejected on entry context: {}", series.symbol, rejection);
            rejection
        })?;

        let snapshot = self.snapshot(series, resistance, context)?;

        if let Err(rejection) = filters::apply_all(&snapshot, &self.config) {
            debug!("{} rejected: {}", series.symbol, rejection);
            return Err(rejection);
        }

        let entry_price = snapshot.close * (1.0 - self.config.entry_buffer);
        let stop_loss = resistance * (1.0 + self.config.stop_buffer);
        let risk = stop_loss - entry_price;
        let take_profit = entry_price - risk * self.config.reward_risk_target;

        let signal = Signal::new(series.symbol.clone(), entry_price, stop_loss, take_profit, snapshot)?;
        debug!(
            "{} short setup: entry={:.4} stop={:.4} target={:.4}",
            series.symbol, entry_price, stop_loss, take_profit
        );
        Ok(signal)
    }

    fn snapshot(
        &self,
        series: &Series,
        resistance: f64,
        context: ContextReading,
    ) -> Result<IndicatorSnapshot, Rejection> {
        let insufficient = || Rejection::InsufficientData {
            required: self.config.min_trigger_bars(),
            available: series.len(),
        };

        let last = series.last().ok_or_else(insufficient)?;
        let closes = series.closes();
        let volumes = series.volumes();

        let volume_ma = indicators::last_defined(&indicators::volume_ma(
            &volumes,
            self.config.volume_ma_period,
        ))
        .ok_or_else(insufficient)?;

        let (macd, macd_signal, macd_histogram) = indicators::macd(
            &closes,
            self.config.macd_fast_period,
            self.config.macd_slow_period,
            self.config.macd_signal_period,
        )
        .last()
        .ok_or_else(insufficient)?;

        Ok(IndicatorSnapshot {
            close: last.close,
            resistance_raw: resistance,
            resistance_buffered: resistance * self.config.resistance_buffer,
            volume: last.volume,
            volume_ma,
            ema_short: context.ema_short,
            ema_long: context.ema_long,
            rsi: context.rsi,
            macd,
            macd_signal,
            macd_histogram,
        })
    }
}

fn require_bars(series: &Series, required: usize) -> Result<(), Rejection> {
    if series.len() < required {
        return Err(Rejection::InsufficientData {
            required,
            available: series.len(),
        });
    }
    Ok(())
}
