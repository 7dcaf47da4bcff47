use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use nw_core::Result;

pub mod handlers;
pub mod state;

pub use state::AppState;

/// Bind and serve the API until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = create_app(state).await;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("📰 Listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/news", get(handlers::list_news))
        .route("/api/news/sections", get(handlers::sections_nav))
        .route("/api/news/:id/seen", post(handlers::increment_views))
        .route("/api/news/*slug", get(handlers::news_detail))
        .route("/api/classify", post(handlers::classify_news))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub mod prelude {
    pub use crate::AppState;
    pub use nw_core::{Error, NewsStore, Result};
}
