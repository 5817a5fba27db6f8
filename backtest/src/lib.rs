// Backtest
// Single-window replay of the short-setup generator over historical candles

pub mod replay;

pub use replay::{ReplayConfig, ReplayReport, ReplaySummary, ReplayTrade, Replayer, TradeOutcome};
