//! Signal generator configuration

use common::ScreenerError;
use serde::{Deserialize, Serialize};

/// Periods, buffers and risk parameters for short setups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub ema_short_period: usize,
    pub ema_long_period: usize,
    pub rsi_period: usize,
    pub macd_fast_period: usize,
    pub macd_slow_period: usize,
    pub macd_signal_period: usize,
    pub volume_ma_period: usize,

    /// Bars in the rolling-high window on the trend timeframe
    pub resistance_window: usize,
    /// Resistance is considered slightly below its raw value (0.995 = 0.5% below)
    pub resistance_buffer: f64,
    /// Last volume must reach this fraction of its moving average
    pub volume_threshold_multiplier: f64,
    /// RSI must stay strictly below this for a bearish reading
    pub rsi_ceiling: f64,

    /// Entry placed this fraction below the last close
    pub entry_buffer: f64,
    /// Stop placed this fraction above resistance
    pub stop_buffer: f64,
    /// Target distance as a multiple of risk
    pub reward_risk_target: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            ema_short_period: 9,
            ema_long_period: 21,
            rsi_period: 14,
            macd_fast_period: 12,
            macd_slow_period: 26,
            macd_signal_period: 9,
            volume_ma_period: 20,
            resistance_window: 8,
            resistance_buffer: 0.995,
            volume_threshold_multiplier: 0.8,
            rsi_ceiling: 50.0,
            entry_buffer: 0.001,
            stop_buffer: 0.002,
            reward_risk_target: 1.5,
        }
    }
}

impl SignalConfig {
    /// Bars needed for the context check
    pub fn min_context_bars(&self) -> usize {
        self.ema_short_period
            .max(self.ema_long_period)
            .max(self.rsi_period)
    }

    /// Bars needed on the entry series for every trigger indicator
    pub fn min_trigger_bars(&self) -> usize {
        let macd_bars = self.macd_fast_period.max(self.macd_slow_period) + self.macd_signal_period;
        self.min_context_bars()
            .max(macd_bars)
            .max(self.volume_ma_period)
    }

    pub fn validate(&self) -> Result<(), ScreenerError> {
        let periods = [
            ("ema_short_period", self.ema_short_period),
            ("ema_long_period", self.ema_long_period),
            ("rsi_period", self.rsi_period),
            ("macd_fast_period", self.macd_fast_period),
            ("macd_slow_period", self.macd_slow_period),
            ("macd_signal_period", self.macd_signal_period),
            ("volume_ma_period", self.volume_ma_period),
            ("resistance_window", self.resistance_window),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(ScreenerError::config(format!("{} must be positive", name)));
            }
        }

        if self.ema_short_period >= self.ema_long_period {
            return Err(ScreenerError::config(format!(
                "ema_short_period ({}) must be below ema_long_period ({})",
                self.ema_short_period, self.ema_long_period
            )));
        }
        if self.macd_fast_period >= self.macd_slow_period {
            return Err(ScreenerError::config(format!(
                "macd_fast_period ({}) must be below macd_slow_period ({})",
                self.macd_fast_period, self.macd_slow_period
            )));
        }
        if !(self.resistance_buffer > 0.0 && self.resistance_buffer <= 1.0) {
            return Err(ScreenerError::config("resistance_buffer must be in (0, 1]"));
        }
        if !(0.0..1.0).contains(&self.entry_buffer) {
            return Err(ScreenerError::config("entry_buffer must be in [0, 1)"));
        }
        if !(self.stop_buffer >= 0.0 && self.stop_buffer.is_finite()) {
            return Err(ScreenerError::config("stop_buffer must be non-negative"));
        }
        if !(self.reward_risk_target > 0.0 && self.reward_risk_target.is_finite()) {
            return Err(ScreenerError::config("reward_risk_target must be positive"));
        }
        if !(self.volume_threshold_multiplier >= 0.0 && self.volume_threshold_multiplier.is_finite()) {
            return Err(ScreenerError::config("volume_threshold_multiplier must be non-negative"));
        }
        if !(self.rsi_ceiling > 0.0 && self.rsi_ceiling <= 100.0) {
            return Err(ScreenerError::config("rsi_ceiling must be in (0, 100]"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SignalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_context_bars(), 21);
        assert_eq!(config.min_trigger_bars(), 35);
    }

    #[test]
    fn test_rejects_zero_period() {
        let config = SignalConfig {
            rsi_period: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ScreenerError::ConfigurationInvalid(msg)) if msg.contains("rsi_period")
        ));
    }

    #[test]
    fn test_rejects_inverted_ema_periods() {
        let config = SignalConfig {
            ema_short_period: 21,
            ema_long_period: 9,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialization_keeps_defaults() {
        let config: SignalConfig = serde_json::from_str(r#"{"rsi_period": 7}"#).unwrap();
        assert_eq!(config.rsi_period, 7);
        assert_eq!(config.resistance_window, 8);
        assert_eq!(config.reward_risk_target, 1.5);
    }
}
