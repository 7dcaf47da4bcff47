//! Artifact-free fallback variant: counts polarity-lexicon hits over the
//! normalized text. Meant for local development and tests, not accuracy.

use std::collections::HashSet;

use async_trait::async_trait;
use lazy_static::lazy_static;

use nw_core::{Result, Sentiment};

use super::SentimentModel;
use crate::text;

const POSITIVE: &[&str] = &[
    "good", "great", "excellent", "love", "amazing", "wonderful", "happy", "fantastic", "awesome",
    "best", "win", "gain", "surge", "rally", "boom", "growth", "strong",
];

const NEGATIVE: &[&str] = &[
    "bad", "terrible", "awful", "hate", "horrible", "worst", "sad", "angry", "disappointed",
    "poor", "loss", "crash", "slump", "fear", "weak", "fall", "decline",
];

lazy_static! {
    static ref POSITIVE_SET: HashSet<String> =
        POSITIVE.iter().map(|w| text::normalize(w)).collect();
    static ref NEGATIVE_SET: HashSet<String> =
        NEGATIVE.iter().map(|w| text::normalize(w)).collect();
}

#[derive(Debug, Default)]
pub struct LexiconModel;

impl LexiconModel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SentimentModel for LexiconModel {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn classify(&self, text: &str) -> Result<Sentiment> {
        let processed = text::normalize(text);
        let tokens: Vec<&str> = processed.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(Sentiment {
                pos: 0.0,
                neg: 0.0,
                neu: 1.0,
            });
        }

        let total = tokens.len() as f32;
        let pos_hits = tokens.iter().filter(|t| POSITIVE_SET.contains(**t)).count() as f32;
        let neg_hits = tokens.iter().filter(|t| NEGATIVE_SET.contains(**t)).count() as f32;

        let pos = pos_hits / total;
        let neg = neg_hits / total;
        Ok(Sentiment {
            pos,
            neg,
            neu: (1.0 - pos - neg).max(0.0),
        }
        .renormalized())
    }
}
