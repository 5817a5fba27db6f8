use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

use common::{
    Candle, LiquidityMetrics, MarketDataSource, ScreenerError, Series, Symbol, Timeframe,
};

const CONTRACT_DETAIL: &str = "/api/v1/contract/detail";
const CONTRACT_KLINE: &str = "/api/v1/contract/kline";
const CONTRACT_TICKER: &str = "/api/v1/contract/ticker";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MexcConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for MexcConfig {
    fn default() -> Self {
        Self {
            base_url: "https://contract.mexc.com".to_string(),
            timeout_secs: 15,
        }
    }
}

impl MexcConfig {
    pub fn validate(&self) -> Result<(), ScreenerError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ScreenerError::config(format!(
                "mexc.base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ScreenerError::config("mexc.timeout_secs must be positive"));
        }
        Ok(())
    }
}

/// MEXC futures public REST client
///
/// The HTTP client (and its connection pool) is created on first use and
/// dropped by `close()`, so every run starts and ends without open sockets.
pub struct MexcClient {
    base_url: String,
    timeout: Duration,
    http: Mutex<Option<Client>>,
}

/// Envelope shared by every contract endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    code: i64,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractDetail {
    symbol: String,
    #[serde(default)]
    quote_coin: String,
    #[serde(default)]
    future_type: i64,
}

/// Columnar kline payload
#[derive(Debug, Default, Deserialize)]
struct KlineColumns {
    #[serde(default)]
    time: Vec<i64>,
    #[serde(default)]
    open: Vec<f64>,
    #[serde(default)]
    high: Vec<f64>,
    #[serde(default)]
    low: Vec<f64>,
    #[serde(default)]
    close: Vec<f64>,
    #[serde(default)]
    vol: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker {
    volume24: Option<f64>,
    amount24: Option<f64>,
    hold_vol: Option<f64>,
}

impl MexcClient {
    pub fn new(config: &MexcConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            http: Mutex::new(None),
        }
    }

    fn http(&self) -> Result<Client> {
        let mut guard = self
            .http
            .lock()
            .map_err(|_| anyhow!("MEXC client state poisoned"))?;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .context("Failed to build MEXC HTTP client")?;
        *guard = Some(client.clone());
        Ok(client)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .http()?
            .get(&url)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .with_context(|| format!("MEXC request to {} failed", endpoint))?;

        if !response.status().is_success() {
            return Err(anyhow!("MEXC API error on {}: {}", endpoint, response.status()));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .with_context(|| format!("Unexpected MEXC payload from {}", endpoint))?;

        if !envelope.success {
            return Err(anyhow!("MEXC {} returned code {}", endpoint, envelope.code));
        }
        envelope
            .data
            .ok_or_else(|| anyhow!("MEXC {} returned no data", endpoint))
    }

    /// Whether a pooled HTTP client is currently held
    pub fn is_open(&self) -> bool {
        self.http.lock().map(|g| g.is_some()).unwrap_or(false)
    }
}

fn columns_to_candles(columns: KlineColumns) -> Result<Vec<Candle>> {
    let n = columns.time.len();
    let lengths = [
        columns.open.len(),
        columns.high.len(),
        columns.low.len(),
        columns.close.len(),
        columns.vol.len(),
    ];
    if lengths.iter().any(|&len| len != n) {
        return Err(anyhow!(
            "Kline columns have mismatched lengths: time={} open/high/low/close/vol={:?}",
            n,
            lengths
        ));
    }

    (0..n)
        .map(|i| {
            let timestamp: DateTime<Utc> = Utc
                .timestamp_opt(columns.time[i], 0)
                .single()
                .ok_or_else(|| anyhow!("Invalid kline timestamp {}", columns.time[i]))?;
            Ok(Candle {
                timestamp,
                open: columns.open[i],
                high: columns.high[i],
                low: columns.low[i],
                close: columns.close[i],
                volume: columns.vol[i],
            })
        })
        .collect()
}

#[async_trait]
impl MarketDataSource for MexcClient {
    async fn list_tradable_symbols(&self) -> Result<Vec<Symbol>> {
        let contracts: Vec<ContractDetail> = self.get(CONTRACT_DETAIL, &[]).await?;
        let symbols: Vec<Symbol> = contracts
            .into_iter()
            .filter(|c| c.quote_coin.eq_ignore_ascii_case("USDT") && c.future_type == 1)
            .map(|c| Symbol::new(c.symbol))
            .collect();

        info!("{} active USDT perpetual contracts", symbols.len());
        Ok(symbols)
    }

    async fn get_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Series> {
        let endpoint = format!("{}/{}", CONTRACT_KLINE, symbol);
        let query = [
            ("interval", timeframe.code().to_string()),
            ("start", start.timestamp().to_string()),
            ("end", end.timestamp().to_string()),
        ];
        let columns: KlineColumns = self.get(&endpoint, &query).await?;
        let candles = columns_to_candles(columns)
            .with_context(|| format!("Malformed klines for {}", symbol))?;

        debug!("{} {}: {} candles", symbol, timeframe, candles.len());
        Ok(Series::new(symbol.clone(), timeframe, candles))
    }

    async fn get_liquidity(&self, symbol: &Symbol) -> Result<LiquidityMetrics> {
        let ticker: Ticker = self
            .get(CONTRACT_TICKER, &[("symbol", symbol.to_string())])
            .await?;
        let volume = ticker.volume24.or(ticker.amount24).unwrap_or(0.0);
        let open_interest = ticker.hold_vol.unwrap_or(0.0);
        Ok(LiquidityMetrics::new(volume, open_interest))
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self
            .http
            .lock()
            .map_err(|_| anyhow!("MEXC client state poisoned"))?;
        if guard.take().is_some() {
            debug!("MEXC HTTP client released");
        }
        Ok(())
    }
}
