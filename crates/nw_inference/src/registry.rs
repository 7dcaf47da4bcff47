//! Lazy, process-wide model cache. The artifact is loaded on the first
//! inference call, not at startup, so a deployment that never classifies
//! never pays for (or fails on) the artifact.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{error, info};

use nw_core::{Error, Result};

use crate::models::{create_model, ModelConfig, SentimentModel};

type LoadOutcome = std::result::Result<Arc<dyn SentimentModel>, String>;

/// Single-initialization barrier around the configured backend variant.
/// Concurrent first callers collapse to one load; the outcome — success or
/// failure — is cached for the life of the process.
#[derive(Debug)]
pub struct ModelRegistry {
    config: ModelConfig,
    slot: OnceCell<LoadOutcome>,
}

impl ModelRegistry {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            slot: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Get the loaded model, loading it on first use. A failed load stays
    /// failed until the process restarts.
    pub async fn get(&self) -> Result<Arc<dyn SentimentModel>> {
        let outcome = self
            .slot
            .get_or_init(|| {
                let config = self.config.clone();
                async move {
                    // Artifacts can run to hundreds of megabytes; keep the
                    // read off the async workers.
                    match tokio::task::spawn_blocking(move || create_model(&config)).await {
                        Ok(Ok(model)) => {
                            info!("🧠 Loaded sentiment model '{}'", model.name());
                            Ok(model)
                        }
                        Ok(Err(e)) => {
                            error!("Sentiment model load failed: {e}");
                            Err(e.to_string())
                        }
                        Err(e) => Err(format!("model load task failed: {e}")),
                    }
                }
            })
            .await;

        match outcome {
            Ok(model) => Ok(model.clone()),
            Err(message) => Err(Error::ModelUnavailable(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn lexicon_config() -> ModelConfig {
        ModelConfig {
            variant: "lexicon".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn concurrent_first_use_collapses_to_one_instance() {
        let registry = Arc::new(ModelRegistry::new(lexicon_config()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.get().await.unwrap() })
            })
            .collect();

        let models = futures::future::join_all(handles).await;
        let first = models[0].as_ref().unwrap().clone();
        for model in models {
            assert!(Arc::ptr_eq(&first, &model.unwrap()));
        }
    }

    #[tokio::test]
    async fn load_failure_is_sticky() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelConfig {
            variant: "bayes".to_string(),
            model_dir: PathBuf::from(dir.path()),
            model_file: "sentiment-bayes.json".to_string(),
            tokenizer_file: "tokenizer.json".to_string(),
        };
        let registry = ModelRegistry::new(config.clone());

        match registry.get().await {
            Err(Error::ModelUnavailable(_)) => {}
            other => panic!("expected ModelUnavailable, got {other:?}"),
        }

        // Even if the artifact shows up later, the failed load is cached.
        std::fs::write(
            config.model_path(),
            r#"{"classes":[0,1,2],"vocabulary":{},"idf":[],"class_log_prior":[0.0,0.0,0.0],"feature_log_prob":[[],[],[]]}"#,
        )
        .unwrap();
        match registry.get().await {
            Err(Error::ModelUnavailable(_)) => {}
            other => panic!("expected sticky ModelUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn registry_is_lazy() {
        // Constructing a registry over a missing artifact is not an error;
        // only the first get() surfaces it.
        let registry = ModelRegistry::new(ModelConfig {
            variant: "bayes".to_string(),
            model_dir: PathBuf::from("/nonexistent"),
            ..Default::default()
        });
        assert!(registry.get().await.is_err());
    }
}
