//! Variant A: multinomial naive-bayes classifier over tf-idf features,
//! loaded from a JSON artifact. Class labels `[0, 1, 2]` map to
//! `[neg, neu, pos]`.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use nw_core::{Error, Result, Sentiment};

use super::SentimentModel;
use crate::text;

#[derive(Debug, Deserialize)]
struct BayesArtifact {
    /// Expected to be exactly `[0, 1, 2]`.
    classes: Vec<u32>,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    class_log_prior: Vec<f32>,
    /// Per-class log probabilities, one row per class.
    feature_log_prob: Vec<Vec<f32>>,
}

pub struct BayesModel {
    artifact: BayesArtifact,
}

impl fmt::Debug for BayesModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BayesModel")
            .field("vocabulary_size", &self.artifact.vocabulary.len())
            .field("classes", &self.artifact.classes)
            .finish()
    }
}

impl BayesModel {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ModelUnavailable(format!(
                "model artifact not found: {}",
                path.display()
            )));
        }
        let file = File::open(path)
            .map_err(|e| Error::ModelUnavailable(format!("failed to open model artifact: {e}")))?;
        let artifact: BayesArtifact = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::ModelUnavailable(format!("malformed model artifact: {e}")))?;

        // The loaded pipeline must actually expose the 3-class probability
        // surface we map onto pos/neg/neu.
        if artifact.classes != vec![0, 1, 2] {
            return Err(Error::BackendContract(format!(
                "expected class labels [0, 1, 2], got {:?}",
                artifact.classes
            )));
        }
        let n = artifact.vocabulary.len();
        if artifact.idf.len() != n {
            return Err(Error::BackendContract(
                "idf table does not match vocabulary size".to_string(),
            ));
        }
        if artifact.class_log_prior.len() != 3
            || artifact.feature_log_prob.len() != 3
            || artifact.feature_log_prob.iter().any(|row| row.len() != n)
        {
            return Err(Error::BackendContract(
                "probability tables do not match class/vocabulary shape".to_string(),
            ));
        }
        if artifact.vocabulary.values().any(|&idx| idx >= n) {
            return Err(Error::BackendContract(
                "vocabulary index out of range".to_string(),
            ));
        }

        Ok(Self { artifact })
    }

    /// Probability vector in class order `[neg, neu, pos]`.
    fn predict_proba(&self, processed: &str) -> [f32; 3] {
        let tokens: Vec<&str> = processed.split_whitespace().collect();
        let mut tf: HashMap<usize, f32> = HashMap::new();
        for token in &tokens {
            if let Some(&idx) = self.artifact.vocabulary.get(*token) {
                *tf.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        if !tokens.is_empty() {
            for weight in tf.values_mut() {
                *weight /= tokens.len() as f32;
            }
        }

        let mut joint = [0f32; 3];
        for (class, slot) in joint.iter_mut().enumerate() {
            let mut acc = self.artifact.class_log_prior[class];
            for (&idx, &weight) in &tf {
                acc += weight * self.artifact.idf[idx] * self.artifact.feature_log_prob[class][idx];
            }
            *slot = acc;
        }
        softmax3(joint)
    }
}

fn softmax3(logits: [f32; 3]) -> [f32; 3] {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    [exp[0] / sum, exp[1] / sum, exp[2] / sum]
}

#[async_trait]
impl SentimentModel for BayesModel {
    fn name(&self) -> &str {
        "bayes"
    }

    async fn classify(&self, text: &str) -> Result<Sentiment> {
        let processed = text::normalize(text);
        let proba = self.predict_proba(&processed);
        Ok(Sentiment {
            pos: proba[2],
            neg: proba[0],
            neu: proba[1],
        }
        .renormalized())
    }
}
