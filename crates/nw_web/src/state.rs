use std::sync::Arc;

use nw_core::NewsStore;
use nw_inference::ModelRegistry;

pub struct AppState {
    pub store: Arc<dyn NewsStore>,
    pub registry: Arc<ModelRegistry>,
}
