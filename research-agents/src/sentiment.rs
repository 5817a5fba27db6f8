//! Sentiment scoring for news articles
//!
//! A `SentimentScorer` maps free text to a polarity in [-1, 1]. The default
//! `LexiconScorer` is a keyword lexicon (English and Portuguese, matching the
//! default news language); a heavier NLP model can be dropped in behind the
//! same trait.

use common::Article;
use std::collections::HashSet;

pub trait SentimentScorer: Send + Sync {
    /// Polarity in [-1, 1]; 0 for text with no opinion words
    fn score_text(&self, text: &str) -> f64;
}

/// Keyword lexicon scorer
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    positive: HashSet<String>,
    negative: HashSet<String>,
}

const POSITIVE_WORDS: &[&str] = &[
    "growth", "rise", "rises", "rising", "rally", "surge", "surges", "increase", "gain", "gains",
    "profit", "success", "good", "positive", "best", "upward", "bullish", "buy", "recovery",
    "boom", "breakthrough", "win", "record", "adoption", "partnership", "approval", "approved",
    "alta", "sobe", "subiu", "ganho", "ganhos", "lucro", "sucesso", "positivo", "recorde",
    "valorização", "recuperação", "otimismo", "parceria", "aprovação",
];

const NEGATIVE_WORDS: &[&str] = &[
    "crisis", "crash", "drop", "drops", "fall", "falls", "decline", "decrease", "loss", "losses",
    "fail", "bad", "negative", "worst", "downward", "bearish", "sell", "dump", "collapse", "risk",
    "danger", "threat", "attack", "hack", "hacked", "fraud", "lawsuit", "ban", "recession",
    "queda", "cai", "caiu", "perda", "perdas", "prejuízo", "crise", "negativo", "risco", "fraude",
    "golpe", "ataque", "colapso", "desvalorização", "pessimismo", "proibição",
];

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new(POSITIVE_WORDS.iter().copied(), NEGATIVE_WORDS.iter().copied())
    }
}

impl LexiconScorer {
    pub fn new<'a>(
        positive: impl IntoIterator<Item = &'a str>,
        negative: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            positive: positive.into_iter().map(str::to_lowercase).collect(),
            negative: negative.into_iter().map(str::to_lowercase).collect(),
        }
    }
}

impl SentimentScorer for LexiconScorer {
    fn score_text(&self, text: &str) -> f64 {
        let mut positive = 0u32;
        let mut negative = 0u32;

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            if self.positive.contains(&token) {
                positive += 1;
            } else if self.negative.contains(&token) {
                negative += 1;
            }
        }

        let matched = positive + negative;
        if matched == 0 {
            return 0.0;
        }
        ((positive as f64 - negative as f64) / matched as f64).clamp(-1.0, 1.0)
    }
}

/// Sum of title and description polarity per article, averaged over the article count
pub fn average_polarity(articles: &[Article], scorer: &dyn SentimentScorer) -> f64 {
    if articles.is_empty() {
        return 0.0;
    }

    let total: f64 = articles
        .iter()
        .flat_map(|a| [a.title.as_deref(), a.description.as_deref()])
        .flatten()
        .filter(|text| !text.trim().is_empty())
        .map(|text| scorer.score_text(text))
        .sum();

    total / articles.len() as f64
}
