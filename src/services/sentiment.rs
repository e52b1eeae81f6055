//! Placeholder sentiment scores per assistant.
//!
//! Scores are random; only the response shape is meaningful to the dashboard.

use rand::Rng;

use crate::models::{SentimentReport, SentimentScore};

/// Label for a score.
pub fn label(score: f64) -> &'static str {
    if score > 0.75 {
        "positive"
    } else if score > 0.5 {
        "neutral"
    } else {
        "negative"
    }
}

/// Random score in `[0.6, 0.95)` for each assistant.
pub fn mock_sentiment<'a>(assistants: impl IntoIterator<Item = &'a str>) -> SentimentReport {
    let mut rng = rand::thread_rng();
    assistants
        .into_iter()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            let score = rng.gen_range(0.6..0.95);
            let sentiment = label(score).to_string();
            (name.to_string(), SentimentScore { score, sentiment })
        })
        .collect()
}
