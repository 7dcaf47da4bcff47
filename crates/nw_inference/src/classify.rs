use std::sync::Arc;

use nw_core::{ClassificationItem, NewsInput, Result};

use crate::registry::ModelRegistry;

/// Batches articles through the configured model and assembles typed
/// results. A single backend failure aborts the whole batch — no partial
/// results.
pub struct ClassificationService {
    registry: Arc<ModelRegistry>,
}

impl ClassificationService {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub async fn classify_many(&self, items: &[NewsInput]) -> Result<Vec<ClassificationItem>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.registry.get().await?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let composite = format!("{} {}", item.title, item.description);
            let scores = model.classify(composite.trim()).await?;
            out.push(ClassificationItem {
                title: item.title.clone(),
                description: item.description.clone(),
                publish_date: item.publish_date,
                pos: scores.pos,
                neg: scores.neg,
                neu: scores.neu,
            });
        }
        Ok(out)
    }
}
