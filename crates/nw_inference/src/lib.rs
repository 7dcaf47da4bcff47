pub mod classify;
pub mod models;
pub mod registry;
pub mod text;

pub use classify::ClassificationService;
pub use models::{create_model, ModelConfig, SentimentModel};
pub use registry::ModelRegistry;

pub mod prelude {
    pub use super::models::{create_model, ModelConfig, SentimentModel};
    pub use super::registry::ModelRegistry;
    pub use nw_core::{Error, Result, Sentiment};
}
