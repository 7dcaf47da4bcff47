use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use nw_core::{
    query::{QuerySpec, SortDir, SortKey},
    section, Error, NewsItem, NewsStore, PageInfo, PageResult, Result,
};

/// In-memory backend. Reference semantics for the query contract; used for
/// tests and local development.
pub struct MemoryStore {
    items: Arc<RwLock<Vec<NewsItem>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn with_items(items: Vec<NewsItem>) -> Self {
        let store = Self::new();
        *store.items.write().await = items;
        store
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Predicate semantics shared with the SQL backend: normalized-substring
/// section match, inclusive date bounds, every keyword term must hit at
/// least one of title/description/id.
fn matches(item: &NewsItem, spec: &QuerySpec) -> bool {
    if let Some(wanted) = &spec.section {
        if !section::normalize(&item.section).contains(wanted.as_str()) {
            return false;
        }
    }
    if let Some(from) = spec.date_from {
        if item.published_time < from {
            return false;
        }
    }
    if let Some(to) = spec.date_to {
        if item.published_time > to {
            return false;
        }
    }
    spec.terms.iter().all(|term| {
        item.title.to_lowercase().contains(term)
            || item.description.to_lowercase().contains(term)
            || item.id.to_lowercase().contains(term)
    })
}

fn sort_items(items: &mut [NewsItem], key: SortKey, dir: SortDir) {
    items.sort_by(|a, b| {
        let ord = match key {
            SortKey::PublishedTime => a.published_time.cmp(&b.published_time),
            SortKey::Title => a.title.cmp(&b.title),
            SortKey::Section => a.section.cmp(&b.section),
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::ViewCount => a.view_count.cmp(&b.view_count),
        };
        match dir {
            SortDir::Asc => ord,
            SortDir::Desc => ord.reverse(),
        }
    });
}

#[async_trait]
impl NewsStore for MemoryStore {
    async fn query(&self, spec: &QuerySpec) -> Result<PageResult> {
        let guard = self.items.read().await;
        let mut matched: Vec<NewsItem> =
            guard.iter().filter(|item| matches(item, spec)).cloned().collect();
        drop(guard);

        let total = matched.len() as i64;
        sort_items(&mut matched, spec.order_by, spec.order_dir);

        let items = matched
            .into_iter()
            .skip(spec.offset.max(0) as usize)
            .take(spec.limit.max(0) as usize)
            .map(|item| item.project(&spec.fields))
            .collect();

        Ok(PageResult {
            items,
            page: PageInfo {
                limit: spec.limit,
                offset: spec.offset,
                total,
            },
            meta: spec.meta(),
        })
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<NewsItem>> {
        let guard = self.items.read().await;
        Ok(guard.iter().find(|item| item.id == id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<NewsItem>> {
        let needle = slug.to_lowercase();
        let guard = self.items.read().await;
        Ok(guard
            .iter()
            .filter(|item| item.url.to_lowercase().contains(&needle))
            .max_by_key(|item| item.published_time)
            .cloned())
    }

    async fn increment_views(&self, id: &str) -> Result<i64> {
        let mut guard = self.items.write().await;
        let item = guard
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| Error::NotFound(format!("news item {id}")))?;
        item.view_count += 1;
        Ok(item.view_count)
    }

    async fn insert(&self, item: &NewsItem) -> Result<()> {
        let mut guard = self.items.write().await;
        if let Some(existing) = guard.iter_mut().find(|i| i.id == item.id) {
            *existing = item.clone();
        } else {
            guard.push(item.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use nw_core::query::QueryRequest;

    fn item(id: &str, title: &str, description: &str, sec: &str, day: u32, views: i64) -> NewsItem {
        NewsItem {
            id: id.to_string(),
            title: title.to_string(),
            url: format!("https://news.example.com/{sec}/{id}", sec = section::slugify(sec)),
            description: description.to_string(),
            article: None,
            section: sec.to_string(),
            thumbnail: None,
            published_time: Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap(),
            view_count: views,
        }
    }

    async fn fixture() -> MemoryStore {
        MemoryStore::with_items(vec![
            item("n-1", "AI chips in short supply", "Fabs running hot", "Technology / AI", 1, 10),
            item("n-2", "New phone launched", "Thin and expensive", "Technology / Gadgets", 2, 4),
            item("n-3", "Robots everywhere", "Factory automation grows", "Technology / AI", 3, 7),
            item("n-4", "Market crash feared", "Stocks slide on weak data", "Business", 4, 30),
            item("n-5", "Cup final tonight", "A crash of titans", "Sports / Football", 5, 2),
        ])
        .await
    }

    fn build(f: impl Fn(&mut QueryRequest)) -> QuerySpec {
        let mut req = QueryRequest::default();
        f(&mut req);
        QuerySpec::build(&req)
    }

    #[tokio::test]
    async fn section_filter_pages_and_counts_consistently() {
        let store = fixture().await;
        let spec = build(|r| {
            r.sections = Some("technology".to_string());
            r.limit = Some("2".to_string());
            r.offset = Some("0".to_string());
        });
        let page = store.query(&spec).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.page.total, 3);
        assert_eq!(page.page.limit, 2);
    }

    #[tokio::test]
    async fn section_matches_by_normalized_substring() {
        let store = fixture().await;
        let spec = build(|r| r.sections = Some("TECHNOLOGY%2FAI".to_string()));
        let page = store.query(&spec).await.unwrap();
        assert_eq!(page.page.total, 2);
    }

    #[tokio::test]
    async fn query_uses_only_first_section() {
        let store = fixture().await;
        // A second label must not widen the filter.
        let spec = build(|r| r.sections = Some("business,sports".to_string()));
        let page = store.query(&spec).await.unwrap();
        assert_eq!(page.page.total, 1);
        assert_eq!(page.items[0]["id"], "n-4");
    }

    #[tokio::test]
    async fn keyword_terms_must_all_match() {
        let store = fixture().await;
        // "crash" alone appears in n-4 and n-5; "market crash" only in n-4.
        let spec = build(|r| r.q = Some("crash".to_string()));
        assert_eq!(store.query(&spec).await.unwrap().page.total, 2);

        let spec = build(|r| r.q = Some("Market crash".to_string()));
        let page = store.query(&spec).await.unwrap();
        assert_eq!(page.page.total, 1);
        assert_eq!(page.items[0]["id"], "n-4");
    }

    #[tokio::test]
    async fn keyword_matches_identifier_too() {
        let store = fixture().await;
        let spec = build(|r| r.q = Some("n-5".to_string()));
        let page = store.query(&spec).await.unwrap();
        assert_eq!(page.page.total, 1);
        assert_eq!(page.items[0]["id"], "n-5");
    }

    #[tokio::test]
    async fn date_bounds_are_inclusive() {
        let store = fixture().await;
        let spec = build(|r| {
            r.date_from = Some("2025-01-02T12:00:00Z".to_string());
            r.date_to = Some("2025-01-04T12:00:00Z".to_string());
        });
        let page = store.query(&spec).await.unwrap();
        assert_eq!(page.page.total, 3);
    }

    #[tokio::test]
    async fn sort_respects_key_and_direction() {
        let store = fixture().await;
        let spec = build(|r| {
            r.order_by = Some("view_count".to_string());
            r.order_dir = Some("asc".to_string());
            r.fields = Some("id,view_count".to_string());
        });
        let page = store.query(&spec).await.unwrap();
        let ids: Vec<&str> = page.items.iter().map(|i| i["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["n-5", "n-2", "n-3", "n-1", "n-4"]);
    }

    #[tokio::test]
    async fn default_sort_is_newest_first() {
        let store = fixture().await;
        let page = store.query(&build(|_| {})).await.unwrap();
        assert_eq!(page.items[0]["id"], "n-5");
        assert_eq!(page.meta.order_by, "published_time");
        assert_eq!(page.meta.order_dir, "DESC");
    }

    #[tokio::test]
    async fn projection_is_restricted_to_requested_fields() {
        let store = fixture().await;
        let spec = build(|r| r.fields = Some("id,title,nope".to_string()));
        let page = store.query(&spec).await.unwrap();
        assert_eq!(page.meta.fields, vec!["id", "title"]);
        for row in &page.items {
            assert_eq!(row.len(), 2);
            assert!(row.contains_key("id") && row.contains_key("title"));
        }
    }

    #[tokio::test]
    async fn increment_views_returns_new_count_and_persists() {
        let store = fixture().await;
        let count = store.increment_views("n-2").await.unwrap();
        assert_eq!(count, 5);
        assert_eq!(store.get_by_id("n-2").await.unwrap().unwrap().view_count, 5);
    }

    #[tokio::test]
    async fn increment_views_on_unknown_id_is_not_found() {
        let store = fixture().await;
        match store.increment_views("missing").await {
            Err(Error::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slug_lookup_prefers_newest_match() {
        let store = fixture().await;
        let found = store.get_by_slug("n-3").await.unwrap().unwrap();
        assert_eq!(found.id, "n-3");
        assert!(store.get_by_slug("absent-slug").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_upserts_by_id() {
        let store = fixture().await;
        let mut updated = store.get_by_id("n-1").await.unwrap().unwrap();
        updated.title = "AI chips everywhere".to_string();
        store.insert(&updated).await.unwrap();
        let page = store.query(&build(|_| {})).await.unwrap();
        assert_eq!(page.page.total, 5);
        assert_eq!(
            store.get_by_id("n-1").await.unwrap().unwrap().title,
            "AI chips everywhere"
        );
    }
}
