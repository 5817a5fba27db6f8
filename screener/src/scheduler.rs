//! Screener scheduler
//!
//! Runs the screener immediately and then on a fixed cadence. At most one
//! run is in flight: a trigger arriving while a run is executing is skipped,
//! never queued behind it.

use crate::orchestrator::{stop_requested, RunReport, Screener};
use common::ScreenerError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub interval_minutes: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { interval_minutes: 5 }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }

    pub fn validate(&self) -> Result<(), ScreenerError> {
        if self.interval_minutes == 0 {
            return Err(ScreenerError::config("scheduler.interval_minutes must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

pub struct Scheduler {
    screener: Arc<Screener>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
    in_flight: Mutex<()>,
    state: RwLock<SchedulerState>,
    completed_runs: AtomicU64,
    skipped_triggers: AtomicU64,
}

impl Scheduler {
    pub fn new(screener: Arc<Screener>, interval: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            screener,
            interval,
            shutdown,
            in_flight: Mutex::new(()),
            state: RwLock::new(SchedulerState::Idle),
            completed_runs: AtomicU64::new(0),
            skipped_triggers: AtomicU64::new(0),
        }
    }

    pub async fn state(&self) -> SchedulerState {
        *self.state.read().await
    }

    /// Runs that reached a terminal state, whether completed or failed
    pub fn completed_runs(&self) -> u64 {
        self.completed_runs.load(Ordering::SeqCst)
    }

    pub fn skipped_triggers(&self) -> u64 {
        self.skipped_triggers.load(Ordering::SeqCst)
    }

    /// Start a run now, or return `None` when one is already in progress
    pub async fn trigger(&self) -> Option<RunReport> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            self.skipped_triggers.fetch_add(1, Ordering::SeqCst);
            warn!("⏭️  A screener run is already in progress, trigger skipped");
            return None;
        };

        *self.state.write().await = SchedulerState::Running;
        let mut shutdown = self.shutdown.clone();
        let report = self.screener.run_with_shutdown(&mut shutdown).await;
        self.completed_runs.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.write().await;
        if *state == SchedulerState::Running {
            *state = SchedulerState::Idle;
        }
        Some(report)
    }

    /// Tick loop; the first tick fires immediately. Returns once `true` is
    /// sent on the shutdown channel.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown = self.shutdown.clone();

        info!("⏰ Scheduler started, running every {:?}", self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(report) = self.trigger().await {
                        info!(
                            "Run {} finished: {:?}, {} signals",
                            report.run_id,
                            report.status,
                            report.signals.len()
                        );
                    }
                }
                _ = stop_requested(&mut shutdown) => break,
            }
        }

        *self.state.write().await = SchedulerState::Stopped;
        info!("🛑 Scheduler stopped after {} runs", self.completed_runs());
    }
}
