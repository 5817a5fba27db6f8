//! External factor thresholds
//!
//! Passed into the evaluator at construction so every threshold can be
//! overridden per run and exercised in tests.

use common::{ScreenerError, SentimentLabel};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalFactorConfig {
    /// Number of most recent volumes in the z-score window
    pub anomaly_window: usize,
    /// |z| strictly above this marks the volume as anomalous
    pub anomaly_z_threshold: f64,
    /// Average polarity strictly above this is positive
    pub positive_threshold: f64,
    /// Average polarity strictly below this is negative
    pub negative_threshold: f64,
    pub news_language: String,
    pub news_page_size: usize,
    /// Bars used for the recent activity annotation
    pub recent_bars: usize,
}

impl Default for ExternalFactorConfig {
    fn default() -> Self {
        Self {
            anomaly_window: 20,
            anomaly_z_threshold: 2.0,
            positive_threshold: 0.1,
            negative_threshold: -0.1,
            news_language: "pt".to_string(),
            news_page_size: 5,
            recent_bars: 5,
        }
    }
}

impl ExternalFactorConfig {
    pub fn classify(&self, average_polarity: f64) -> SentimentLabel {
        if average_polarity > self.positive_threshold {
            SentimentLabel::Positive
        } else if average_polarity < self.negative_threshold {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn validate(&self) -> Result<(), ScreenerError> {
        if self.anomaly_window < 2 {
            return Err(ScreenerError::config("anomaly_window must be at least 2"));
        }
        if !(self.anomaly_z_threshold > 0.0 && self.anomaly_z_threshold.is_finite()) {
            return Err(ScreenerError::config("anomaly_z_threshold must be positive"));
        }
        if !(self.negative_threshold <= self.positive_threshold) {
            return Err(ScreenerError::config(format!(
                "negative_threshold ({}) must not exceed positive_threshold ({})",
                self.negative_threshold, self.positive_threshold
            )));
        }
        if self.news_language.trim().is_empty() {
            return Err(ScreenerError::config("news_language must not be empty"));
        }
        if self.news_page_size == 0 || self.news_page_size > 100 {
            return Err(ScreenerError::config("news_page_size must be in 1..=100"));
        }
        if self.recent_bars == 0 {
            return Err(ScreenerError::config("recent_bars must be positive"));
        }
        Ok(())
    }
}
