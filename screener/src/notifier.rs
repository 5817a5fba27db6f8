//! Notification sinks
//!
//! Fire-and-forget from the pipeline's point of view: sinks log their own
//! failures and never hand them back.

use anyhow::{Context, Result};
use async_trait::async_trait;
use common::ScreenerError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Destination of a published message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Every generated signal, run failures and summaries
    Raw,
    /// Ranked subset chosen by the advisory step
    Advisory,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Advisory => write!(f, "advisory"),
        }
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, channel: Channel, message: &str);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub raw_chat_id: Option<i64>,
    /// Falls back to the raw chat when unset
    pub advisory_chat_id: Option<i64>,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            raw_chat_id: None,
            advisory_chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 10,
        }
    }
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        self.bot_token.as_deref().is_some_and(|t| !t.trim().is_empty()) && self.raw_chat_id.is_some()
    }

    pub fn validate(&self) -> Result<(), ScreenerError> {
        if self.timeout_secs == 0 {
            return Err(ScreenerError::config("telegram.timeout_secs must be positive"));
        }
        if self.advisory_chat_id.is_some() && self.raw_chat_id.is_none() {
            return Err(ScreenerError::config(
                "telegram.advisory_chat_id requires telegram.raw_chat_id",
            ));
        }
        Ok(())
    }
}

/// Telegram Bot API `sendMessage`, HTML parse mode
pub struct TelegramSink {
    client: reqwest::Client,
    endpoint: String,
    raw_chat_id: i64,
    advisory_chat_id: i64,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramSink {
    pub fn new(bot_token: &str, raw_chat_id: i64, advisory_chat_id: Option<i64>, config: &TelegramConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build Telegram HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                bot_token
            ),
            raw_chat_id,
            advisory_chat_id: advisory_chat_id.unwrap_or(raw_chat_id),
        })
    }

    fn chat_for(&self, channel: Channel) -> i64 {
        match channel {
            Channel::Raw => self.raw_chat_id,
            Channel::Advisory => self.advisory_chat_id,
        }
    }

    async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
        let body = SendMessage {
            chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response: SendResponse = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .context("Telegram request failed")?
            .json()
            .await
            .context("Unexpected Telegram response")?;

        if !response.ok {
            anyhow::bail!(
                "Telegram rejected message: {}",
                response.description.unwrap_or_default()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn publish(&self, channel: Channel, message: &str) {
        if let Err(e) = self.send(self.chat_for(channel), message).await {
            debug!("Failed to send {} message: {:#}\n{:?}", channel, e, message);
        }
    }
}

/// Writes messages through `tracing`; used when Telegram is not configured
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn publish(&self, channel: Channel, message: &str) {
        info!("[{}] {}", channel, message);
    }
}

pub fn build_sink(config: &TelegramConfig) -> Result<Arc<dyn NotificationSink>> {
    match (config.bot_token.as_deref(), config.raw_chat_id) {
        (Some(token), Some(raw_chat_id)) if config.is_configured() => Ok(Arc::new(TelegramSink::new(
            token,
            raw_chat_id,
            config.advisory_chat_id,
            config,
        )?)),
        _ => {
            warn!("⚠️  Telegram bot token or chat id not configured, messages go to the log");
            Ok(Arc::new(LogSink))
        }
    }
}
