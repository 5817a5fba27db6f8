//! Screener Orchestrator
//!
//! One run walks `Init → FetchUniverse → FilterLiquidity → EvaluateSymbols →
//! Rank → Publish → Close`. Per-symbol failures are counted and skipped; only
//! a universe fetch failure, a timeout or a stop signal ends the run `Failed`.
//! The timeout and the stop signal bound the stages up to `Rank`; publishing
//! starts only once those have finished and is never cut short, so a run
//! either delivers all of its messages or none. The market data source is
//! closed at the end of every run, whatever the outcome. Signals collected by
//! a run that did not complete are discarded.

use crate::formatter::{format_advisory, format_no_opportunities, format_run_failure, format_trade_signal};
use crate::liquidity::LiquidityFilter;
use crate::notifier::{Channel, NotificationSink};
use crate::settings::{RunConfig, ScreenerSettings};
use chrono::{DateTime, Utc};
use common::{
    EnrichedSignal, MarketDataSource, NewsLookup, RankingDecision, ScreenerError, Series, Symbol,
    Timeframe, Universe,
};
use futures::stream::{self, StreamExt};
use research_agents::{resolve_ranking, AdvisorySelector, ExternalFactorEvaluator, SentimentScorer};
use serde::Serialize;
use signal_generation::{RejectionKind, ShortSignalGenerator};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// External collaborators wired into a screener
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn MarketDataSource>,
    pub news: Arc<dyn NewsLookup>,
    pub scorer: Arc<dyn SentimentScorer>,
    pub advisor: Arc<dyn AdvisorySelector>,
    pub notifier: Arc<dyn NotificationSink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Init,
    FetchUniverse,
    FilterLiquidity,
    EvaluateSymbols,
    Rank,
    Publish,
    Close,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::FetchUniverse => "fetch_universe",
            Self::FilterLiquidity => "filter_liquidity",
            Self::EvaluateSymbols => "evaluate_symbols",
            Self::Rank => "rank",
            Self::Publish => "publish",
            Self::Close => "close",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    /// Also reported when the run found zero signals
    Completed,
    Failed { phase: RunPhase, reason: String },
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Last phase entered
    pub phase: RunPhase,
    pub status: RunStatus,
    pub universe_size: usize,
    pub liquidity_passed: usize,
    pub liquidity_excluded: usize,
    pub liquidity_failed: usize,
    /// Nothing passed liquidity, so the whole universe was evaluated
    pub liquidity_fallback: bool,
    pub evaluated: usize,
    pub rejections: BTreeMap<RejectionKind, usize>,
    /// Candle fetches that failed, one per skipped symbol
    pub fetch_failures: usize,
    pub signals: Vec<EnrichedSignal>,
    pub decision: RankingDecision,
}

impl RunReport {
    fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            phase: RunPhase::Init,
            status: RunStatus::Completed,
            universe_size: 0,
            liquidity_passed: 0,
            liquidity_excluded: 0,
            liquidity_failed: 0,
            liquidity_fallback: false,
            evaluated: 0,
            rejections: BTreeMap::new(),
            fetch_failures: 0,
            signals: Vec::new(),
            decision: RankingDecision::default(),
        }
    }

    fn enter(&mut self, phase: RunPhase) {
        debug!("Run {} entering {}", self.run_id, phase);
        self.phase = phase;
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn rejected(&self, kind: RejectionKind) -> usize {
        self.rejections.get(&kind).copied().unwrap_or(0)
    }
}

enum SymbolOutcome {
    Signal(Box<EnrichedSignal>),
    Rejected(RejectionKind),
    FetchFailed,
}

/// Resolves once `true` is observed on the channel; pends forever when the
/// sender is gone.
pub(crate) async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub struct Screener {
    run: RunConfig,
    max_selections: usize,
    liquidity: LiquidityFilter,
    generator: ShortSignalGenerator,
    evaluator: ExternalFactorEvaluator,
    source: Arc<dyn MarketDataSource>,
    advisor: Arc<dyn AdvisorySelector>,
    notifier: Arc<dyn NotificationSink>,
}

impl Screener {
    pub fn new(settings: &ScreenerSettings, collaborators: Collaborators) -> Result<Self, ScreenerError> {
        settings.validate()?;

        Ok(Self {
            run: settings.run.clone(),
            max_selections: settings.advisory.max_selections,
            liquidity: LiquidityFilter::new(settings.liquidity.clone()),
            generator: ShortSignalGenerator::new(settings.signal.clone()),
            evaluator: ExternalFactorEvaluator::new(
                settings.external.clone(),
                collaborators.news,
                collaborators.scorer,
            ),
            source: collaborators.source,
            advisor: collaborators.advisor,
            notifier: collaborators.notifier,
        })
    }

    pub fn run_config(&self) -> &RunConfig {
        &self.run
    }

    /// Single run bounded only by the configured timeout
    pub async fn run_once(&self) -> RunReport {
        let (_stop, mut shutdown) = watch::channel(false);
        self.run_with_shutdown(&mut shutdown).await
    }

    /// Single run that aborts when `true` is sent on `shutdown`
    pub async fn run_with_shutdown(&self, shutdown: &mut watch::Receiver<bool>) -> RunReport {
        let mut report = RunReport::start();
        let timeout = Duration::from_secs(self.run.timeout_secs);
        info!("🚀 Screener run {} started", report.run_id);

        let outcome = {
            let pipeline = self.pipeline(&mut report);
            tokio::select! {
                result = tokio::time::timeout(timeout, pipeline) => {
                    result.unwrap_or(Err(ScreenerError::TimedOut(timeout)))
                }
                _ = stop_requested(shutdown) => Err(ScreenerError::Cancelled),
            }
        };

        let failed_in = report.phase;
        if outcome.is_ok() {
            report.enter(RunPhase::Publish);
            self.publish(&report).await;
        }

        report.enter(RunPhase::Close);
        if let Err(e) = self.source.close().await {
            warn!("⚠️  Failed to close market data source: {:#}", e);
        }

        if let Err(e) = outcome {
            report.signals.clear();
            report.decision = RankingDecision::default();
            report.status = RunStatus::Failed {
                phase: failed_in,
                reason: e.to_string(),
            };

            match e {
                ScreenerError::Cancelled | ScreenerError::TimedOut(_) => {
                    warn!("⚠️  Run {} aborted during {}: {}", report.run_id, failed_in, e);
                }
                _ => {
                    error!("❌ Run {} failed during {}: {}", report.run_id, failed_in, e);
                    self.notifier
                        .publish(Channel::Raw, &format_run_failure(&e.to_string()))
                        .await;
                }
            }
        } else {
            info!(
                "✅ Run {} complete: {} signals, {} ranked",
                report.run_id,
                report.signals.len(),
                report.decision.len()
            );
        }

        report.finished_at = Some(Utc::now());
        report
    }

    async fn pipeline(&self, report: &mut RunReport) -> Result<(), ScreenerError> {
        report.enter(RunPhase::FetchUniverse);
        let symbols = self
            .source
            .list_tradable_symbols()
            .await
            .map_err(|e| ScreenerError::RunLevel(format!("universe fetch failed: {:#}", e)))?;
        let universe = Universe::new(symbols);
        report.universe_size = universe.len();
        info!("🔍 {} tradable symbols found", universe.len());

        report.enter(RunPhase::FilterLiquidity);
        let liquidity = self.liquidity.filter(self.source.clone(), &universe).await;
        report.liquidity_passed = liquidity.passed.len();
        report.liquidity_excluded = liquidity.excluded.len();
        report.liquidity_failed = liquidity.failed.len();

        let candidates = if liquidity.passed.is_empty() && !universe.is_empty() {
            warn!(
                "⚠️  No symbols passed the liquidity filter, evaluating all {} symbols",
                universe.len()
            );
            report.liquidity_fallback = true;
            universe.into_vec()
        } else {
            liquidity.passed
        };

        report.enter(RunPhase::EvaluateSymbols);
        let end = Utc::now();
        let outcomes: Vec<SymbolOutcome> = stream::iter(candidates)
            .map(|symbol| self.evaluate_symbol(symbol, end))
            .buffered(self.run.symbol_concurrency)
            .collect()
            .await;

        report.evaluated = outcomes.len();
        for outcome in outcomes {
            match outcome {
                SymbolOutcome::Signal(enriched) => report.signals.push(*enriched),
                SymbolOutcome::Rejected(kind) => *report.rejections.entry(kind).or_insert(0) += 1,
                SymbolOutcome::FetchFailed => report.fetch_failures += 1,
            }
        }
        info!(
            "📈 {} signals from {} evaluated symbols",
            report.signals.len(),
            report.evaluated
        );

        report.enter(RunPhase::Rank);
        report.decision = self.rank(&report.signals).await;
        Ok(())
    }

    async fn fetch_series(&self, symbol: &Symbol, timeframe: Timeframe, end: DateTime<Utc>) -> Option<Series> {
        let start = timeframe.lookback_start(end, self.run.candle_limit);
        match self.source.get_candles(symbol, timeframe, start, end).await {
            Ok(series) => Some(series),
            Err(e) => {
                debug!("{} {} candles unavailable: {:#}", symbol, timeframe, e);
                None
            }
        }
    }

    async fn evaluate_symbol(&self, symbol: Symbol, end: DateTime<Utc>) -> SymbolOutcome {
        let Some(trend) = self.fetch_series(&symbol, self.run.trend_timeframe, end).await else {
            return SymbolOutcome::FetchFailed;
        };

        let resistance = match self
            .generator
            .check_context(&trend)
            .and_then(|_| self.generator.calculate_resistance(&trend))
        {
            Ok(resistance) => resistance,
            Err(rejection) => {
                debug!("{} skipped on trend timeframe: {}", symbol, rejection);
                return SymbolOutcome::Rejected(rejection.kind());
            }
        };

        let Some(entry) = self.fetch_series(&symbol, self.run.entry_timeframe, end).await else {
            return SymbolOutcome::FetchFailed;
        };

        match self.generator.check_trigger(&entry, resistance) {
            Ok(signal) => {
                let enriched = self.evaluator.enrich(signal, &entry).await;
                info!("✅ Short signal for {}", symbol);
                SymbolOutcome::Signal(Box::new(enriched))
            }
            Err(rejection) => SymbolOutcome::Rejected(rejection.kind()),
        }
    }

    async fn rank(&self, signals: &[EnrichedSignal]) -> RankingDecision {
        if signals.is_empty() {
            return RankingDecision::default();
        }

        match self.advisor.select_best(signals, self.max_selections).await {
            Ok(picks) => {
                let decision = resolve_ranking(signals, &picks, self.max_selections);
                info!(
                    "🤖 {} selected {:?}",
                    self.advisor.name(),
                    decision.symbols()
                );
                decision
            }
            Err(e) => {
                let e = ScreenerError::unavailable(self.advisor.name(), format!("{:#}", e));
                warn!("⚠️  Advisory ranking skipped: {}", e);
                RankingDecision::default()
            }
        }
    }

    async fn publish(&self, report: &RunReport) {
        for signal in &report.signals {
            self.notifier
                .publish(Channel::Raw, &format_trade_signal(signal))
                .await;
        }
        for ranked in &report.decision.ranked {
            self.notifier
                .publish(Channel::Advisory, &format_advisory(ranked))
                .await;
        }
        if report.signals.is_empty() {
            self.notifier
                .publish(Channel::Raw, &format_no_opportunities())
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stop_requested_sees_current_value() {
        let (_tx, mut rx) = watch::channel(true);
        tokio::time::timeout(Duration::from_millis(100), stop_requested(&mut rx))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_requested_pends_without_sender() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        let waited = tokio::time::timeout(Duration::from_millis(50), stop_requested(&mut rx)).await;
        assert!(waited.is_err());
    }

    #[test]
    fn test_status_serialization() {
        let failed = RunStatus::Failed {
            phase: RunPhase::FetchUniverse,
            reason: "run failed: universe fetch failed".to_string(),
        };
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["state"], "failed");
        assert_eq!(value["phase"], "fetch_universe");

        let report = RunReport::start();
        assert!(report.is_completed());
        assert_eq!(report.rejected(RejectionKind::Volume), 0);
        assert_eq!(serde_json::to_value(&report).unwrap()["status"]["state"], "completed");
    }
}
