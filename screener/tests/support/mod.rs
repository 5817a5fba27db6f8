// Hand-written collaborators shared by the integration tests

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use common::{
    Article, Candle, EnrichedSignal, LiquidityMetrics, MarketDataSource, NewsLookup, Series, Symbol,
    Timeframe,
};
use research_agents::{AdvisorySelector, LexiconScorer};
use screener::{Channel, Collaborators, NotificationSink, ScreenerSettings};
use signal_generation::SignalConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn candles(closes: &[f64], volumes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| Candle {
            timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 900, 0).unwrap(),
            open: close,
            high: close + 0.1,
            low: close,
            close,
            volume,
        })
        .collect()
}

/// Eight bars of clean downtrend with rising volume
pub fn downtrend() -> Vec<Candle> {
    let closes = [10.0, 9.8, 9.6, 9.4, 9.2, 9.0, 8.8, 8.6];
    let volumes: Vec<f64> = (0..8).map(|i| 1000.0 + 100.0 * i as f64).collect();
    candles(&closes, &volumes)
}

pub fn uptrend() -> Vec<Candle> {
    let closes = [8.6, 8.8, 9.0, 9.2, 9.4, 9.6, 9.8, 10.0];
    candles(&closes, &[1000.0; 8])
}

/// Small indicator periods so eight bars cover every lookback
pub fn settings() -> ScreenerSettings {
    let mut settings = ScreenerSettings::default();
    settings.signal = SignalConfig {
        ema_short_period: 3,
        ema_long_period: 5,
        rsi_period: 3,
        macd_fast_period: 2,
        macd_slow_period: 4,
        macd_signal_period: 2,
        volume_ma_period: 3,
        ..Default::default()
    };
    settings.advisory.max_selections = 2;
    settings.run.timeout_secs = 30;
    settings
}

pub struct FakeMarket {
    pub symbols: Option<Vec<String>>,
    pub liquidity: HashMap<String, LiquidityMetrics>,
    pub candles: HashMap<String, Vec<Candle>>,
    pub universe_delay: Duration,
    pub candle_delay: Duration,
    pub closed: AtomicBool,
    pub candle_calls: AtomicUsize,
    pub universe_in_flight: AtomicUsize,
    pub universe_peak: AtomicUsize,
}

impl FakeMarket {
    pub fn new() -> Self {
        Self {
            symbols: Some(Vec::new()),
            liquidity: HashMap::new(),
            candles: HashMap::new(),
            universe_delay: Duration::ZERO,
            candle_delay: Duration::ZERO,
            closed: AtomicBool::new(false),
            candle_calls: AtomicUsize::new(0),
            universe_in_flight: AtomicUsize::new(0),
            universe_peak: AtomicUsize::new(0),
        }
    }

    /// Universe fetch fails
    pub fn unreachable() -> Self {
        Self {
            symbols: None,
            ..Self::new()
        }
    }

    pub fn with_symbol(mut self, symbol: &str, volume: f64, open_interest: f64, bars: Vec<Candle>) -> Self {
        self.symbols.get_or_insert_with(Vec::new).push(symbol.to_string());
        self.liquidity
            .insert(symbol.to_string(), LiquidityMetrics::new(volume, open_interest));
        self.candles.insert(symbol.to_string(), bars);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for FakeMarket {
    async fn list_tradable_symbols(&self) -> Result<Vec<Symbol>> {
        let now = self.universe_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.universe_peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.universe_delay).await;
        self.universe_in_flight.fetch_sub(1, Ordering::SeqCst);

        self.symbols
            .as_ref()
            .map(|symbols| symbols.iter().map(|s| Symbol::from(s.as_str())).collect())
            .ok_or_else(|| anyhow!("contract detail endpoint unreachable"))
    }

    async fn get_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Series> {
        self.candle_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.candle_delay).await;
        let bars = self
            .candles
            .get(symbol.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("no klines for {}", symbol))?;
        Ok(Series::new(symbol.clone(), timeframe, bars))
    }

    async fn get_liquidity(&self, symbol: &Symbol) -> Result<LiquidityMetrics> {
        self.liquidity
            .get(symbol.as_str())
            .copied()
            .ok_or_else(|| anyhow!("ticker unavailable for {}", symbol))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct NoNews;

#[async_trait]
impl NewsLookup for NoNews {
    async fn fetch_articles(&self, _query: &str, _language: &str, _page_size: usize) -> Vec<Article> {
        Vec::new()
    }
}

/// Replies with a fixed list of identifiers, or fails when `None`
pub struct FixedAdvisor {
    pub reply: Option<Vec<&'static str>>,
    pub calls: AtomicUsize,
}

impl FixedAdvisor {
    pub fn replying(reply: Vec<&'static str>) -> Self {
        Self {
            reply: Some(reply),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdvisorySelector for FixedAdvisor {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn select_best(&self, _candidates: &[EnrichedSignal], _max_count: usize) -> Result<Vec<Symbol>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .as_ref()
            .map(|reply| reply.iter().map(|s| Symbol::from(*s)).collect())
            .ok_or_else(|| anyhow!("advisory backend returned 503"))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<(Channel, String)>>,
    delay: Duration,
}

impl RecordingSink {
    /// Sleeps `delay` before recording each message
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn on(&self, channel: Channel) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn publish(&self, channel: Channel, message: &str) {
        tokio::time::sleep(self.delay).await;
        self.messages.lock().unwrap().push((channel, message.to_string()));
    }
}

pub fn collaborators(
    market: Arc<FakeMarket>,
    advisor: Arc<FixedAdvisor>,
    sink: Arc<RecordingSink>,
) -> Collaborators {
    Collaborators {
        source: market,
        news: Arc::new(NoNews),
        scorer: Arc::new(LexiconScorer::default()),
        advisor,
        notifier: sink,
    }
}
