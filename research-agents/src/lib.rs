//! Research Agents
//!
//! External inputs layered on top of the technical signal:
//! - Volume anomaly detection on the entry timeframe
//! - News sentiment scoring behind the `SentimentScorer` trait
//! - External factor evaluation producing enriched signals
//! - Advisory selection backends picking the ranked subset

pub mod advisory;
pub mod anomaly;
pub mod config;
pub mod evaluator;
pub mod sentiment;

pub use advisory::{
    build_selector, resolve_ranking, AdvisoryConfig, AdvisoryProvider, AdvisorySelector,
    GeminiSelector, HeuristicSelector, OpenAiSelector,
};
pub use anomaly::{volume_anomaly, VolumeAnomaly};
pub use config::ExternalFactorConfig;
pub use evaluator::{recent_activity, ExternalFactorEvaluator};
pub use sentiment::{average_polarity, LexiconScorer, SentimentScorer};
