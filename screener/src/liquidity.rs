//! Liquidity Filter
//!
//! Prunes the universe by 24h volume and open interest. Lookups run on a
//! bounded pool: the filter owns a semaphore sized by `max_concurrent`, and
//! every lookup holds a permit while it talks to the market data source.
//! A failed lookup excludes that symbol only.

use common::{MarketDataSource, ScreenerError, Symbol, Universe};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityConfig {
    pub min_volume_24h_usd: f64,
    pub min_open_interest_usd: f64,
    /// Lookups in flight at once
    pub max_concurrent: usize,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            min_volume_24h_usd: 1000.0,
            min_open_interest_usd: 1000.0,
            max_concurrent: 5,
        }
    }
}

impl LiquidityConfig {
    pub fn validate(&self) -> Result<(), ScreenerError> {
        if !(self.min_volume_24h_usd >= 0.0 && self.min_volume_24h_usd.is_finite()) {
            return Err(ScreenerError::config("liquidity.min_volume_24h_usd must be non-negative"));
        }
        if !(self.min_open_interest_usd >= 0.0 && self.min_open_interest_usd.is_finite()) {
            return Err(ScreenerError::config(
                "liquidity.min_open_interest_usd must be non-negative",
            ));
        }
        if self.max_concurrent == 0 {
            return Err(ScreenerError::config("liquidity.max_concurrent must be positive"));
        }
        Ok(())
    }
}

/// Outcome of one filter pass, each list in universe order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiquidityReport {
    pub passed: Vec<Symbol>,
    /// Below at least one threshold
    pub excluded: Vec<Symbol>,
    /// Lookup failed
    pub failed: Vec<Symbol>,
}

enum Verdict {
    Passed,
    Excluded,
    Failed,
}

pub struct LiquidityFilter {
    config: LiquidityConfig,
    permits: Arc<Semaphore>,
}

impl LiquidityFilter {
    pub fn new(config: LiquidityConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent));
        Self { config, permits }
    }

    pub fn config(&self) -> &LiquidityConfig {
        &self.config
    }

    /// Symbols meeting or exceeding both thresholds
    ///
    /// Dropping the returned future aborts every outstanding lookup.
    pub async fn filter(&self, source: Arc<dyn MarketDataSource>, universe: &Universe) -> LiquidityReport {
        let mut tasks = JoinSet::new();

        for (index, symbol) in universe.symbols().iter().cloned().enumerate() {
            let permits = self.permits.clone();
            let source = source.clone();
            let min_volume = self.config.min_volume_24h_usd;
            let min_oi = self.config.min_open_interest_usd;

            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (index, Verdict::Failed);
                };

                let verdict = match source.get_liquidity(&symbol).await {
                    Ok(metrics) => {
                        debug!(
                            "{} - Vol: {:.0}, OI: {:.0}",
                            symbol, metrics.volume_24h_usd, metrics.open_interest_usd
                        );
                        if metrics.meets(min_volume, min_oi) {
                            Verdict::Passed
                        } else {
                            Verdict::Excluded
                        }
                    }
                    Err(e) => {
                        debug!("Liquidity lookup failed for {}: {:#}", symbol, e);
                        Verdict::Failed
                    }
                };
                (index, verdict)
            });
        }

        let mut verdicts: Vec<Option<Verdict>> = universe.symbols().iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, verdict)) => verdicts[index] = Some(verdict),
                Err(e) => warn!("⚠️  Liquidity lookup task ended abnormally: {}", e),
            }
        }

        // a task that panicked never reported, count its symbol as failed
        let mut report = LiquidityReport::default();
        for (symbol, verdict) in universe.symbols().iter().cloned().zip(verdicts) {
            match verdict.unwrap_or(Verdict::Failed) {
                Verdict::Passed => report.passed.push(symbol),
                Verdict::Excluded => report.excluded.push(symbol),
                Verdict::Failed => report.failed.push(symbol),
            }
        }

        info!("{} symbols passed the liquidity filter", report.passed.len());
        if !report.excluded.is_empty() || !report.failed.is_empty() {
            debug!(
                "Excluded for low liquidity: {:?}; lookup failures: {:?}",
                report.excluded, report.failed
            );
        }
        report
    }
}
