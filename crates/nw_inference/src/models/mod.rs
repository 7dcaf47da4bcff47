use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use nw_core::{Error, Result, Sentiment};

pub mod attention;
pub mod bayes;
pub mod lexicon;

/// Uniform classification contract. Every backend variant normalizes its
/// input and returns a renormalized three-way distribution.
#[async_trait]
pub trait SentimentModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Three-way probability distribution over the text's sentiment.
    async fn classify(&self, text: &str) -> Result<Sentiment>;
}

/// Which backend variant to load and where its artifacts live. Resolved
/// once at registry construction time, never by runtime type inspection.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Variant name: `bayes`, `attention` or `lexicon`.
    pub variant: String,
    pub model_dir: PathBuf,
    pub model_file: String,
    pub tokenizer_file: String,
}

impl ModelConfig {
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_file)
    }

    pub fn tokenizer_path(&self) -> PathBuf {
        self.model_dir.join(&self.tokenizer_file)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            variant: "bayes".to_string(),
            model_dir: PathBuf::from("./models"),
            model_file: "sentiment-bayes.json".to_string(),
            tokenizer_file: "tokenizer.json".to_string(),
        }
    }
}

/// Load the configured variant's artifacts from disk.
pub fn create_model(config: &ModelConfig) -> Result<Arc<dyn SentimentModel>> {
    match config.variant.as_str() {
        "bayes" => Ok(Arc::new(bayes::BayesModel::load(&config.model_path())?)),
        "attention" => Ok(Arc::new(attention::AttentionModel::load(
            &config.model_path(),
            &config.tokenizer_path(),
        )?)),
        "lexicon" => Ok(Arc::new(lexicon::LexiconModel::new())),
        other => Err(Error::ModelUnavailable(format!(
            "unknown model variant: {other}"
        ))),
    }
}
