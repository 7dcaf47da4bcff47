use async_trait::async_trait;

use crate::query::QuerySpec;
use crate::types::{NewsItem, PageResult};
use crate::Result;

/// Storage backend contract. Implementations must evaluate the page lookup
/// and its total count over identical predicates, and must never
/// interpolate request-derived text into query syntax.
#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Run one filtered/sorted/paginated lookup plus the matching count.
    async fn query(&self, spec: &QuerySpec) -> Result<PageResult>;

    /// Fetch a single item by identifier.
    async fn get_by_id(&self, id: &str) -> Result<Option<NewsItem>>;

    /// Fetch the most recent item whose URL contains the given slug.
    async fn get_by_slug(&self, slug: &str) -> Result<Option<NewsItem>>;

    /// Atomically increment the view counter, returning the new value.
    /// Unknown identifiers surface as [`crate::Error::NotFound`].
    async fn increment_views(&self, id: &str) -> Result<i64>;

    /// Insert or replace an item by identifier.
    async fn insert(&self, item: &NewsItem) -> Result<()>;
}
