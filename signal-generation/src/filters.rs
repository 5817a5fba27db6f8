// Trigger filters
// Rejecting checks applied to the entry timeframe, in a fixed order; the first
// failing filter decides the rejection.

use super::config::SignalConfig;
use common::{IndicatorSnapshot, SignalError};
use serde::Serialize;
use thiserror::Error;

/// Why a symbol produced no signal
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("insufficient data: need {required} bars, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("context not bearish: ema_short={ema_short:.4} ema_long={ema_long:.4} rsi={rsi:.2}")]
    ContextNotBearish { ema_short: f64, ema_long: f64, rsi: f64 },

    #[error("close {close:.4} above buffered resistance {threshold:.4}")]
    PriceAboveResistance { close: f64, threshold: f64 },

    #[error("volume {volume:.2} below required {required:.2}")]
    VolumeTooLow { volume: f64, required: f64 },

    #[error("rsi {rsi:.2} not below {ceiling:.2}")]
    MomentumNotBearish { rsi: f64, ceiling: f64 },

    #[error("macd {macd:.4} not below signal {signal:.4}")]
    MacdNotBelowSignal { macd: f64, signal: f64 },

    #[error("invalid setup: {0}")]
    InvalidSetup(#[from] SignalError),
}

/// Diagnostic bucket for a rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    InsufficientData,
    Context,
    PriceProximity,
    Volume,
    Momentum,
    TrendConfirmation,
    InvalidSetup,
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Self::InsufficientData { .. } => RejectionKind::InsufficientData,
            Self::ContextNotBearish { .. } => RejectionKind::Context,
            Self::PriceAboveResistance { .. } => RejectionKind::PriceProximity,
            Self::VolumeTooLow { .. } => RejectionKind::Volume,
            Self::MomentumNotBearish { .. } => RejectionKind::Momentum,
            Self::MacdNotBelowSignal { .. } => RejectionKind::TrendConfirmation,
            Self::InvalidSetup(_) => RejectionKind::InvalidSetup,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerFilter {
    PriceProximity,
    Volume,
    Momentum,
    TrendConfirmation,
}

impl TriggerFilter {
    /// Evaluation order
    pub const ORDER: [TriggerFilter; 4] = [
        TriggerFilter::PriceProximity,
        TriggerFilter::Volume,
        TriggerFilter::Momentum,
        TriggerFilter::TrendConfirmation,
    ];

    pub fn check(&self, snapshot: &IndicatorSnapshot, config: &SignalConfig) -> Result<(), Rejection> {
        match self {
            Self::PriceProximity => {
                if snapshot.close > snapshot.resistance_buffered {
                    return Err(Rejection::PriceAboveResistance {
                        close: snapshot.close,
                        threshold: snapshot.resistance_buffered,
                    });
                }
            }
            Self::Volume => {
                let required = snapshot.volume_ma * config.volume_threshold_multiplier;
                if snapshot.volume < required {
                    return Err(Rejection::VolumeTooLow {
                        volume: snapshot.volume,
                        required,
                    });
                }
            }
            Self::Momentum => {
                if snapshot.rsi >= config.rsi_ceiling {
                    return Err(Rejection::MomentumNotBearish {
                        rsi: snapshot.rsi,
                        ceiling: config.rsi_ceiling,
                    });
                }
            }
            Self::TrendConfirmation => {
                if snapshot.macd >= snapshot.macd_signal {
                    return Err(Rejection::MacdNotBelowSignal {
                        macd: snapshot.macd,
                        signal: snapshot.macd_signal,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Applies every filter in order, stopping at the first rejection
pub fn apply_all(snapshot: &IndicatorSnapshot, config: &SignalConfig) -> Result<(), Rejection> {
    for filter in TriggerFilter::ORDER {
        filter.check(snapshot, config)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing_snapshot() -> IndicatorSnapshot {
        IndicatorSnapshot {
            close: 9.0,
            resistance_raw: 10.0,
            resistance_buffered: 9.95,
            volume: 1000.0,
            volume_ma: 1000.0,
            ema_short: 9.1,
            ema_long: 9.5,
            rsi: 40.0,
            macd: -0.2,
            macd_signal: -0.1,
            macd_histogram: -0.1,
        }
    }

    #[test]
    fn test_passing_snapshot() {
        assert!(apply_all(&passing_snapshot(), &SignalConfig::default()).is_ok());
    }

    #[test]
    fn test_first_failing_filter_wins() {
        // volume, rsi and macd all fail; proximity passes -> volume reported
        let snapshot = IndicatorSnapshot {
            volume: 100.0,
            rsi: 70.0,
            macd: 0.5,
            ..passing_snapshot()
        };
        let err = apply_all(&snapshot, &SignalConfig::default()).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::Volume);

        let snapshot = IndicatorSnapshot {
            close: 9.96,
            ..snapshot
        };
        let err = apply_all(&snapshot, &SignalConfig::default()).unwrap_err();
        assert_eq!(err.kind(), RejectionKind::PriceProximity);
    }

    #[test]
    fn test_boundaries() {
        let config = SignalConfig::default();

        // close equal to buffered resistance passes
        let at_resistance = IndicatorSnapshot {
            close: 9.95,
            ..passing_snapshot()
        };
        assert!(TriggerFilter::PriceProximity.check(&at_resistance, &config).is_ok());

        // volume exactly at 80% of its average passes
        let at_volume = IndicatorSnapshot {
            volume: 800.0,
            ..passing_snapshot()
        };
        assert!(TriggerFilter::Volume.check(&at_volume, &config).is_ok());

        // rsi of exactly 50 is not bearish
        let at_rsi = IndicatorSnapshot {
            rsi: 50.0,
            ..passing_snapshot()
        };
        assert_eq!(
            TriggerFilter::Momentum.check(&at_rsi, &config).unwrap_err().kind(),
            RejectionKind::Momentum
        );

        // macd equal to signal is rejected
        let flat_macd = IndicatorSnapshot {
            macd: -0.1,
            macd_signal: -0.1,
            ..passing_snapshot()
        };
        assert_eq!(
            TriggerFilter::TrendConfirmation.check(&flat_macd, &config).unwrap_err().kind(),
            RejectionKind::TrendConfirmation
        );
    }
}
