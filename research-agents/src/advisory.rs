//! Advisory selection
//!
//! Picks a bounded, ranked subset of enriched signals for amplified
//! notification. One `AdvisorySelector` implementation per backend, chosen
//! once at startup by `build_selector`; callers only see the trait.
//!
//! Reply handling is deterministic whatever the backend returns: identifiers
//! are trimmed, duplicates keep their first occurrence, identifiers that are
//! not among the candidates are dropped, and the rest is truncated to the
//! requested count. Ranks follow reply order starting at 1.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use common::{EnrichedSignal, RankedSignal, RankingDecision, ScreenerError, SentimentLabel, Symbol};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

lazy_static! {
    static ref SYMBOL_TOKEN: Regex = Regex::new(r"[A-Za-z0-9]+(?:[_\-/][A-Za-z0-9]+)*").unwrap();
}

#[async_trait]
pub trait AdvisorySelector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Preferred symbols first, at most `max_count`. Must accept zero candidates.
    async fn select_best(&self, candidates: &[EnrichedSignal], max_count: usize) -> Result<Vec<Symbol>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryProvider {
    OpenAi,
    Gemini,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    pub provider: AdvisoryProvider,
    pub api_key: Option<String>,
    /// Defaults per provider when unset
    pub model: Option<String>,
    /// Overrides the provider endpoint (used by tests)
    pub base_url: Option<String>,
    pub max_selections: usize,
    pub temperature: f64,
    pub timeout_secs: u64,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            provider: AdvisoryProvider::Heuristic,
            api_key: None,
            model: None,
            base_url: None,
            max_selections: 1,
            temperature: 0.7,
            timeout_secs: 30,
        }
    }
}

impl AdvisoryConfig {
    pub fn validate(&self) -> Result<(), ScreenerError> {
        if self.max_selections == 0 {
            return Err(ScreenerError::config("advisory.max_selections must be positive"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ScreenerError::config("advisory.temperature must be in [0, 2]"));
        }
        if self.timeout_secs == 0 {
            return Err(ScreenerError::config("advisory.timeout_secs must be positive"));
        }
        Ok(())
    }
}

/// Instantiate the configured backend. Remote providers without an API key
/// fall back to the heuristic ranking.
pub fn build_selector(config: &AdvisoryConfig) -> Result<Arc<dyn AdvisorySelector>> {
    let api_key = config.api_key.clone().filter(|k| !k.trim().is_empty());
    let timeout = Duration::from_secs(config.timeout_secs);

    let selector: Arc<dyn AdvisorySelector> = match (config.provider, api_key) {
        (AdvisoryProvider::OpenAi, Some(key)) => Arc::new(OpenAiSelector::new(
            key,
            config.model.clone().unwrap_or_else(|| OpenAiSelector::DEFAULT_MODEL.to_string()),
            config.base_url.clone(),
            config.temperature,
            timeout,
        )?),
        (AdvisoryProvider::Gemini, Some(key)) => Arc::new(GeminiSelector::new(
            key,
            config.model.clone().unwrap_or_else(|| GeminiSelector::DEFAULT_MODEL.to_string()),
            config.base_url.clone(),
            config.temperature,
            timeout,
        )?),
        (AdvisoryProvider::Heuristic, _) => Arc::new(HeuristicSelector),
        (provider, None) => {
            warn!("⚠️  No API key for advisory provider {:?}, using heuristic ranking", provider);
            Arc::new(HeuristicSelector)
        }
    };

    info!("Advisory selector: {}", selector.name());
    Ok(selector)
}

/// Map selector output back onto the candidates
pub fn resolve_ranking(
    candidates: &[EnrichedSignal],
    picks: &[Symbol],
    max_count: usize,
) -> RankingDecision {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut ranked = Vec::new();

    for pick in picks {
        if ranked.len() >= max_count {
            break;
        }
        let id = pick.as_str().trim();
        if id.is_empty() || !seen.insert(id) {
            continue;
        }
        match candidates.iter().find(|c| c.symbol().as_str() == id) {
            Some(candidate) => ranked.push(RankedSignal {
                rank: ranked.len() + 1,
                signal: candidate.clone(),
            }),
            None => debug!("Advisory pick {} is not a candidate, dropped", id),
        }
    }

    RankingDecision { ranked }
}

/// Symbol-shaped tokens in reply order
pub fn extract_symbols(reply: &str) -> Vec<Symbol> {
    SYMBOL_TOKEN
        .find_iter(reply)
        .map(|m| Symbol::new(m.as_str()))
        .collect()
}

/// Prompt listing every candidate with its levels and external factors
pub fn build_prompt(candidates: &[EnrichedSignal], max_count: usize) -> String {
    let details: Vec<String> = candidates
        .iter()
        .map(|c| {
            let s = &c.signal;
            format!(
                "{}: entry {:.4}, stop {:.4}, target {:.4}, anomalous volume: {}, sentiment: {}",
                s.symbol(),
                s.entry_price(),
                s.stop_loss(),
                s.take_profit(),
                c.factors.anomalous_volume,
                c.factors.sentiment
            )
        })
        .collect();

    format!(
        "You are an experienced, objective technical analyst.\n\
         These short setups were produced by an automated screener:\n\
         {}\n\
         Compare them on reward/risk (distance between entry, stop and target), stop proximity, \
         downside potential and external factors. Anomalous volume together with negative \
         sentiment strengthens a short.\n\
         Choose at most {} symbol(s) with the best short potential right now, best first. \
         Reply ONLY with the symbol(s) exactly as written above, separated by spaces, with no \
         explanation.",
        details.join("\n"),
        max_count
    )
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build advisory HTTP client")
}

/// OpenAI chat completions
pub struct OpenAiSelector {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f64,
}

impl OpenAiSelector {
    pub const DEFAULT_MODEL: &'static str = "gpt-3.5-turbo";
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com";

    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        temperature: f64,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
            temperature,
        })
    }
}

#[async_trait]
impl AdvisorySelector for OpenAiSelector {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn select_best(&self, candidates: &[EnrichedSignal], max_count: usize) -> Result<Vec<Symbol>> {
        if candidates.is_empty() || max_count == 0 {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "Help choose the best asset to short, objectively and technically. Only return the final symbol(s)."
                },
                { "role": "user", "content": build_prompt(candidates, max_count) }
            ],
            "temperature": self.temperature,
            "max_tokens": 10 * max_count,
        });

        let response: Value = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("OpenAI request failed")?
            .error_for_status()
            .context("OpenAI returned an error status")?
            .json()
            .await
            .context("OpenAI response was not JSON")?;

        let reply = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("OpenAI response has no message content"))?;
        debug!("OpenAI reply: {}", reply);
        Ok(extract_symbols(reply))
    }
}

/// Google Gemini generateContent
pub struct GeminiSelector {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f64,
}

impl GeminiSelector {
    pub const DEFAULT_MODEL: &'static str = "gemini-1.5-flash";
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";

    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        temperature: f64,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
            temperature,
        })
    }
}

#[async_trait]
impl AdvisorySelector for GeminiSelector {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn select_best(&self, candidates: &[EnrichedSignal], max_count: usize) -> Result<Vec<Symbol>> {
        if candidates.is_empty() || max_count == 0 {
            return Ok(Vec::new());
        }

        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(candidates, max_count) }] }],
            "generationConfig": { "temperature": self.temperature },
        });

        let response: Value = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url.trim_end_matches('/'),
                self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?
            .error_for_status()
            .context("Gemini returned an error status")?
            .json()
            .await
            .context("Gemini response was not JSON")?;

        let reply = response["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| anyhow!("Gemini response has no text part"))?;
        debug!("Gemini reply: {}", reply);
        Ok(extract_symbols(reply))
    }
}

/// Local ranking: reward/risk, plus a bonus for anomalous volume and for
/// negative sentiment. Ties broken by symbol.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSelector;

impl HeuristicSelector {
    pub fn score(candidate: &EnrichedSignal) -> f64 {
        let mut score = candidate.signal.reward_risk();
        if candidate.factors.anomalous_volume {
            score += 0.5;
        }
        if candidate.factors.sentiment == SentimentLabel::Negative {
            score += 0.5;
        }
        score
    }
}

#[async_trait]
impl AdvisorySelector for HeuristicSelector {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn select_best(&self, candidates: &[EnrichedSignal], max_count: usize) -> Result<Vec<Symbol>> {
        let mut scored: Vec<(f64, &Symbol)> = candidates
            .iter()
            .map(|c| (Self::score(c), c.symbol()))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.as_str().cmp(b.1.as_str())));

        Ok(scored
            .into_iter()
            .take(max_count)
            .map(|(_, symbol)| symbol.clone())
            .collect())
    }
}
