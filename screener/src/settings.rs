//! Screener settings
//!
//! One TOML document (default `screener.toml`) layered under `SCREENER__`
//! environment variables, e.g. `SCREENER__TELEGRAM__BOT_TOKEN` or
//! `SCREENER__LIQUIDITY__MAX_CONCURRENT=3`. Every section falls back to its
//! defaults, and the whole tree is validated before any I/O happens.

use crate::liquidity::LiquidityConfig;
use crate::notifier::TelegramConfig;
use crate::scheduler::SchedulerConfig;
use anyhow::{Context, Result};
use common::{ScreenerError, Timeframe};
use data_ingestion::{MexcConfig, NewsConfig};
use research_agents::{AdvisoryConfig, ExternalFactorConfig};
use serde::{Deserialize, Serialize};
use signal_generation::SignalConfig;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "screener.toml";
const ENV_PREFIX: &str = "SCREENER";
const REDACTED: &str = "********";

/// Per-run parameters of the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub trend_timeframe: Timeframe,
    pub entry_timeframe: Timeframe,
    /// Bars requested per series
    pub candle_limit: usize,
    /// Symbols evaluated at once after the liquidity stage
    pub symbol_concurrency: usize,
    pub timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            trend_timeframe: Timeframe::Min60,
            entry_timeframe: Timeframe::Min15,
            candle_limit: 200,
            symbol_concurrency: 1,
            timeout_secs: 600,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ScreenerError> {
        if self.candle_limit == 0 {
            return Err(ScreenerError::config("run.candle_limit must be positive"));
        }
        if self.symbol_concurrency == 0 {
            return Err(ScreenerError::config("run.symbol_concurrency must be positive"));
        }
        if self.timeout_secs == 0 {
            return Err(ScreenerError::config("run.timeout_secs must be positive"));
        }
        if self.trend_timeframe.seconds() < self.entry_timeframe.seconds() {
            return Err(ScreenerError::config(format!(
                "run.trend_timeframe ({}) must not be shorter than run.entry_timeframe ({})",
                self.trend_timeframe, self.entry_timeframe
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerSettings {
    pub log_level: String,
    pub run: RunConfig,
    pub liquidity: LiquidityConfig,
    pub signal: SignalConfig,
    pub external: ExternalFactorConfig,
    pub advisory: AdvisoryConfig,
    pub mexc: MexcConfig,
    pub news: NewsConfig,
    pub telegram: TelegramConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for ScreenerSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            run: RunConfig::default(),
            liquidity: LiquidityConfig::default(),
            signal: SignalConfig::default(),
            external: ExternalFactorConfig::default(),
            advisory: AdvisoryConfig::default(),
            mexc: MexcConfig::default(),
            news: NewsConfig::default(),
            telegram: TelegramConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl ScreenerSettings {
    /// Load from `path` (required when given) or from `screener.toml` in the
    /// working directory when present, then apply the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: ScreenerSettings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read screener configuration")?
            .try_deserialize()
            .context("Failed to parse screener configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: ScreenerSettings =
            toml::from_str(content).context("Failed to parse screener configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ScreenerError> {
        if self.log_level.trim().is_empty() {
            return Err(ScreenerError::config("log_level must not be empty"));
        }
        self.run.validate()?;
        self.liquidity.validate()?;
        self.signal.validate()?;
        self.external.validate()?;
        self.advisory.validate()?;
        self.mexc.validate()?;
        self.news.validate()?;
        self.telegram.validate()?;
        self.scheduler.validate()?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize screener configuration")
    }

    /// TOML rendering with API keys and the bot token masked
    pub fn to_toml_redacted(&self) -> Result<String> {
        let mut shown = self.clone();
        let mask = |secret: &mut Option<String>| {
            if secret.is_some() {
                *secret = Some(REDACTED.to_string());
            }
        };
        mask(&mut shown.advisory.api_key);
        mask(&mut shown.news.api_key);
        mask(&mut shown.telegram.bot_token);
        shown.to_toml()
    }
}
