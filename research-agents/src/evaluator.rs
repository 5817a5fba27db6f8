//! External Factor Evaluator
//!
//! Annotates a priced signal with news sentiment, volume anomaly and recent
//! activity. Never rejects a symbol: every degraded input falls back to a
//! neutral value.

use super::anomaly::volume_anomaly;
use super::config::ExternalFactorConfig;
use super::sentiment::{average_polarity, SentimentScorer};
use common::{
    EnrichedSignal, ExternalFactors, NewsLookup, RecentActivity, Series, Signal, Symbol,
    TrendDirection,
};
use std::sync::Arc;
use tracing::debug;

pub struct ExternalFactorEvaluator {
    config: ExternalFactorConfig,
    news: Arc<dyn NewsLookup>,
    scorer: Arc<dyn SentimentScorer>,
}

impl ExternalFactorEvaluator {
    pub fn new(
        config: ExternalFactorConfig,
        news: Arc<dyn NewsLookup>,
        scorer: Arc<dyn SentimentScorer>,
    ) -> Self {
        Self { config, news, scorer }
    }

    pub fn config(&self) -> &ExternalFactorConfig {
        &self.config
    }

    /// Sentiment and volume anomaly for one symbol
    pub async fn evaluate(&self, symbol: &Symbol, entry: &Series) -> ExternalFactors {
        let articles = self
            .news
            .fetch_articles(
                symbol.base_asset(),
                &self.config.news_language,
                self.config.news_page_size,
            )
            .await;
        let polarity = average_polarity(&articles, self.scorer.as_ref());
        let sentiment = self.config.classify(polarity);

        let anomaly = volume_anomaly(
            &entry.volumes(),
            self.config.anomaly_window,
            self.config.anomaly_z_threshold,
        );

        debug!(
            "{} factors: sentiment={} ({:.3}, {} articles), volume z={:.2}",
            symbol,
            sentiment,
            polarity,
            articles.len(),
            anomaly.z_score
        );

        ExternalFactors {
            sentiment,
            news_count: articles.len(),
            anomalous_volume: anomaly.anomalous,
            anomalous_volume_z: anomaly.z_score,
        }
    }

    /// Merge factors and recent activity into the signal
    pub async fn enrich(&self, signal: Signal, entry: &Series) -> EnrichedSignal {
        let factors = self.evaluate(signal.symbol(), entry).await;
        let recent = recent_activity(entry, self.config.recent_bars);
        EnrichedSignal {
            signal,
            factors,
            recent,
        }
    }
}

/// Mean volume and close direction over the last `bars` candles
pub fn recent_activity(series: &Series, bars: usize) -> RecentActivity {
    let candles = series.candles();
    let recent = &candles[candles.len().saturating_sub(bars)..];

    let avg_volume = if recent.is_empty() {
        0.0
    } else {
        recent.iter().map(|c| c.volume).sum::<f64>() / recent.len() as f64
    };

    let direction = match (recent.first(), recent.last()) {
        (Some(first), Some(last)) if last.close > first.close => TrendDirection::Up,
        _ => TrendDirection::Down,
    };

    RecentActivity {
        avg_volume,
        direction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::LexiconScorer;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use common::{Article, Candle, IndicatorSnapshot, SentimentLabel, Timeframe};
    use std::sync::Mutex;

    struct FakeNews {
        articles: Vec<Article>,
        queries: Mutex<Vec<(String, String, usize)>>,
    }

    impl FakeNews {
        fn new(articles: Vec<Article>) -> Self {
            Self {
                articles,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl NewsLookup for FakeNews {
        async fn fetch_articles(&self, query: &str, language: &str, page_size: usize) -> Vec<Article> {
            self.queries
                .lock()
                .unwrap()
                .push((query.to_string(), language.to_string(), page_size));
            self.articles.clone()
        }
    }

    fn series(closes: &[f64], volumes: &[f64]) -> Series {
        let candles = closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&close, &volume))| Candle {
                timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 900, 0).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume,
            })
            .collect();
        Series::new(Symbol::from("SOL_USDT"), Timeframe::Min15, candles)
    }

    fn headline(title: &str) -> Article {
        Article {
            title: Some(title.to_string()),
            description: None,
        }
    }

    fn evaluator(news: Arc<FakeNews>) -> ExternalFactorEvaluator {
        ExternalFactorEvaluator::new(
            ExternalFactorConfig::default(),
            news,
            Arc::new(LexiconScorer::default()),
        )
    }

    #[tokio::test]
    async fn test_negative_news_and_volume_spike() {
        let news = Arc::new(FakeNews::new(vec![
            headline("Solana crash deepens"),
            headline("Exchange hacked"),
        ]));
        let mut volumes = vec![10.0; 19];
        volumes.push(100.0);
        let entry = series(&[1.0; 20], &volumes);

        let factors = evaluator(news.clone())
            .evaluate(&Symbol::from("SOL_USDT"), &entry)
            .await;

        assert_eq!(factors.sentiment, SentimentLabel::Negative);
        assert_eq!(factors.news_count, 2);
        assert!(factors.anomalous_volume);
        assert!(factors.anomalous_volume_z > 2.0);

        let queries = news.queries.lock().unwrap();
        assert_eq!(queries.as_slice(), &[("SOL".to_string(), "pt".to_string(), 5)]);
    }

    #[tokio::test]
    async fn test_no_news_is_neutral() {
        let news = Arc::new(FakeNews::new(Vec::new()));
        let entry = series(&[1.0; 20], &[50.0; 20]);
        let factors = evaluator(news)
            .evaluate(&Symbol::from("SOL_USDT"), &entry)
            .await;
        assert_eq!(factors, ExternalFactors::default());
    }

    #[tokio::test]
    async fn test_enrich_keeps_signal() {
        let news = Arc::new(FakeNews::new(Vec::new()));
        let entry = series(&[5.0, 4.0, 3.0, 2.0, 1.0, 0.9], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let signal = Signal::new(
            Symbol::from("SOL_USDT"),
            0.9,
            1.2,
            0.5,
            IndicatorSnapshot::default(),
        )
        .unwrap();

        let enriched = evaluator(news).enrich(signal.clone(), &entry).await;
        assert_eq!(enriched.signal, signal);
        assert_eq!(enriched.recent.direction, TrendDirection::Down);
        assert!((enriched.recent.avg_volume - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_recent_activity_direction() {
        let rising = series(&[1.0, 2.0, 3.0], &[1.0, 1.0, 1.0]);
        assert_eq!(recent_activity(&rising, 5).direction, TrendDirection::Up);

        let flat = series(&[2.0, 2.0], &[1.0, 3.0]);
        let activity = recent_activity(&flat, 5);
        assert_eq!(activity.direction, TrendDirection::Down);
        assert_eq!(activity.avg_volume, 2.0);
    }
}
