use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use nw_core::{
    query::{QueryRequest, QuerySpec},
    section, slug_of, ChildSection, ClassificationItem, Error, NewsInput, PageResult, Projection,
    SectionItem,
};
use nw_inference::ClassificationService;

use crate::AppState;

/// Wrapper mapping core errors onto HTTP statuses. Validation problems
/// never reach this: they degrade inside the query builder.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::ModelUnavailable(_) | Error::BackendContract(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

fn attach_slug(item: &mut Projection) {
    let slug = item
        .get("url")
        .and_then(Value::as_str)
        .and_then(slug_of)
        .map(Value::String)
        .unwrap_or(Value::Null);
    item.insert("slug".to_string(), slug);
}

pub async fn list_news(
    State(state): State<Arc<AppState>>,
    Query(req): Query<QueryRequest>,
) -> Result<Json<PageResult>, ApiError> {
    let spec = QuerySpec::build(&req);
    let mut page = state.store.query(&spec).await?;
    for item in &mut page.items {
        attach_slug(item);
    }
    Ok(Json(page))
}

/// Navigation tree derived from the section labels of the most recent
/// items: two levels deep, slugified hrefs, children deduplicated by path,
/// parents without a valid child dropped.
pub fn build_sections_nav<I>(labels: I) -> Vec<SectionItem>
where
    I: IntoIterator<Item = String>,
{
    let mut order: Vec<String> = Vec::new();
    let mut parents: HashMap<String, SectionItem> = HashMap::new();

    for label in labels {
        let parts: Vec<&str> = label
            .split('/')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let Some(&parent_label) = parts.first() else {
            continue;
        };
        let parent_slug = section::slugify(parent_label);
        if parent_slug.is_empty() {
            continue;
        }

        let entry = parents
            .entry(parent_label.to_string())
            .or_insert_with(|| {
                order.push(parent_label.to_string());
                SectionItem {
                    label: parent_label.to_string(),
                    href: format!("/{parent_slug}"),
                    children: Vec::new(),
                }
            });

        // Only the second level is surfaced.
        if let Some(&child_label) = parts.get(1) {
            let child_slug = section::slugify(child_label);
            if child_slug.is_empty() {
                continue;
            }
            let href = format!("/{parent_slug}/{child_slug}");
            if !entry.children.iter().any(|c| c.href == href) {
                entry.children.push(ChildSection {
                    label: child_label.to_string(),
                    href,
                });
            }
        }
    }

    order
        .into_iter()
        .filter_map(|label| parents.remove(&label))
        .filter(|parent| !parent.children.is_empty())
        .collect()
}

pub async fn sections_nav(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SectionItem>>, ApiError> {
    let req = QueryRequest {
        fields: Some("section".to_string()),
        limit: Some("500".to_string()),
        ..Default::default()
    };
    let page = state.store.query(&QuerySpec::build(&req)).await?;
    let labels = page
        .items
        .into_iter()
        .filter_map(|item| item.get("section").and_then(Value::as_str).map(String::from));
    Ok(Json(build_sections_nav(labels)))
}

pub async fn increment_views(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let view_count = state.store.increment_views(&id).await?;
    Ok(Json(json!({ "id": id, "view_count": view_count })))
}

/// Strip scheme and host when a full URL was pasted, then trim separators.
fn clean_slug(raw: &str) -> String {
    let mut s = raw.trim_matches('/');
    if let Some((_, rest)) = s.split_once("://") {
        s = rest.split_once('/').map(|(_, tail)| tail).unwrap_or(rest);
    }
    s.trim_matches('/').to_string()
}

pub async fn news_detail(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let cleaned = clean_slug(&slug);
    if cleaned.is_empty() {
        return Err(Error::NotFound("empty slug".to_string()).into());
    }
    let item = state
        .store
        .get_by_slug(&cleaned)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no news item matching '{cleaned}'")))?;

    let mut body = serde_json::to_value(&item).map_err(Error::from)?;
    if let Some(map) = body.as_object_mut() {
        map.insert(
            "slug".to_string(),
            item.slug().map(Value::String).unwrap_or(Value::Null),
        );
    }
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub news: Vec<NewsInput>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub news: Vec<ClassificationItem>,
}

pub async fn classify_news(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let service = ClassificationService::new(state.registry.clone());
    let news = service.classify_many(&req.news).await?;
    Ok(Json(ClassifyResponse { news }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_app;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use nw_core::NewsItem;
    use nw_inference::{ModelConfig, ModelRegistry};
    use nw_storage::MemoryStore;
    use tower::ServiceExt;

    fn item(id: &str, title: &str, sec: &str, day: u32) -> NewsItem {
        NewsItem {
            id: id.to_string(),
            title: title.to_string(),
            url: format!("https://news.example.com/{}/{id}", section::slugify(sec)),
            description: format!("About {title}"),
            article: Some("Full text".to_string()),
            section: sec.to_string(),
            thumbnail: None,
            published_time: Utc.with_ymd_and_hms(2025, 1, day, 8, 0, 0).unwrap(),
            view_count: 4,
        }
    }

    async fn app() -> axum::Router {
        let store = MemoryStore::with_items(vec![
            item("n-1", "AI chips", "Technology / AI", 1),
            item("n-2", "New phone", "Technology / Gadgets", 2),
            item("n-3", "Robots", "Technology / AI", 3),
            item("n-4", "Market crash", "Business", 4),
            item("n-5", "Cup final", "Sports / Football", 5),
        ])
        .await;
        let registry = Arc::new(ModelRegistry::new(ModelConfig {
            variant: "lexicon".to_string(),
            ..Default::default()
        }));
        create_app(AppState {
            store: Arc::new(store),
            registry,
        })
        .await
    }

    async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn list_news_pages_filters_and_echoes_meta() {
        let (status, body) = get_json(app().await, "/api/news?sections=technology&limit=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 2);
        assert_eq!(body["page"]["total"], 3);
        assert_eq!(body["meta"]["order_by"], "published_time");
        assert_eq!(body["meta"]["order_dir"], "DESC");
        // Derived slug rides along with the projection.
        assert_eq!(body["items"][0]["slug"], "n-3");
    }

    #[tokio::test]
    async fn malformed_query_params_degrade_instead_of_erroring() {
        let (status, body) = get_json(
            app().await,
            "/api/news?limit=huge&offset=-2&order_by=evil&order_dir=up&fields=secret",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["page"]["limit"], 20);
        assert_eq!(body["page"]["offset"], 0);
        assert_eq!(body["meta"]["order_by"], "published_time");
        assert_eq!(body["meta"]["order_dir"], "DESC");
    }

    #[tokio::test]
    async fn sections_nav_keeps_only_parents_with_children() {
        let (status, body) = get_json(app().await, "/api/news/sections").await;
        assert_eq!(status, StatusCode::OK);
        let nav = body.as_array().unwrap();
        // "Business" has no second level, so it is dropped.
        let labels: Vec<&str> = nav.iter().map(|p| p["label"].as_str().unwrap()).collect();
        assert!(labels.contains(&"Technology"));
        assert!(labels.contains(&"Sports"));
        assert!(!labels.contains(&"Business"));

        let tech = nav.iter().find(|p| p["label"] == "Technology").unwrap();
        assert_eq!(tech["href"], "/technology");
        let hrefs: Vec<&str> = tech["childSection"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["href"].as_str().unwrap())
            .collect();
        // Two "Technology / AI" items dedupe to one child.
        assert_eq!(hrefs, vec!["/technology/ai", "/technology/gadgets"]);
    }

    #[tokio::test]
    async fn seen_endpoint_increments_and_404s() {
        let app_instance = app().await;
        let (status, body) =
            post_json(app_instance.clone(), "/api/news/n-1/seen", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["view_count"], 5);

        let (status, _) = post_json(app_instance, "/api/news/ghost/seen", json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn detail_resolves_slug_and_pasted_urls() {
        let (status, body) = get_json(app().await, "/api/news/n-4").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "n-4");
        assert_eq!(body["slug"], "n-4");

        let (status, body) = get_json(
            app().await,
            "/api/news/https://news.example.com/business/n-4",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "n-4");

        let (status, _) = get_json(app().await, "/api/news/nothing-here").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn classify_echoes_items_with_scores() {
        let (status, body) = post_json(
            app().await,
            "/api/classify",
            json!({
                "news": [{
                    "title": "Stocks surge",
                    "description": "Market rallies on news",
                    "publish_date": "2025-01-01T00:00:00Z"
                }]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let item = &body["news"][0];
        assert_eq!(item["title"], "Stocks surge");
        assert_eq!(item["description"], "Market rallies on news");
        let sum = item["pos"].as_f64().unwrap()
            + item["neg"].as_f64().unwrap()
            + item["neu"].as_f64().unwrap();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn clean_slug_strips_scheme_and_host() {
        assert_eq!(clean_slug("some-story"), "some-story");
        assert_eq!(clean_slug("/a/b/"), "a/b");
        assert_eq!(
            clean_slug("https://news.example.com/world/some-story/"),
            "world/some-story"
        );
        assert_eq!(clean_slug("https://host-only.example.com"), "host-only.example.com");
    }

    #[test]
    fn nav_builder_drops_invalid_labels() {
        let nav = build_sections_nav(vec![
            "World / Asia".to_string(),
            "World / Asia".to_string(),
            "World/Europe".to_string(),
            " / ".to_string(),
            "".to_string(),
            "Loose".to_string(),
        ]);
        assert_eq!(nav.len(), 1);
        assert_eq!(nav[0].label, "World");
        assert_eq!(nav[0].children.len(), 2);
        assert_eq!(nav[0].children[0].href, "/world/asia");
    }
}
