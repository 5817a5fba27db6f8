//! Short-signal screener
//!
//! Wires the pipeline stages together:
//! - Liquidity pre-filter on a bounded worker pool
//! - Orchestrator driving context, trigger and external-factor evaluation
//! - Scheduler that never overlaps runs
//! - Telegram/log notification sinks and HTML message formatting
//! - Layered settings (TOML file + `SCREENER__` environment)

pub mod formatter;
pub mod liquidity;
pub mod notifier;
pub mod orchestrator;
pub mod scheduler;
pub mod settings;

pub use liquidity::{LiquidityConfig, LiquidityFilter, LiquidityReport};
pub use notifier::{build_sink, Channel, LogSink, NotificationSink, TelegramConfig, TelegramSink};
pub use orchestrator::{Collaborators, RunPhase, RunReport, RunStatus, Screener};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerState};
pub use settings::{RunConfig, ScreenerSettings, DEFAULT_CONFIG_FILE};
