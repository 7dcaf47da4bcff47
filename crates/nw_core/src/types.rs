use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::Field;

/// A stored news item. Owned by the storage backend; the core reads and
/// filters it, except for the view counter which is only ever incremented
/// through [`crate::storage::NewsStore::increment_views`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub article: Option<String>,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub published_time: DateTime<Utc>,
    #[serde(default)]
    pub view_count: i64,
}

impl NewsItem {
    /// Derived slug: the last path segment of the canonical URL.
    pub fn slug(&self) -> Option<String> {
        slug_of(&self.url)
    }

    /// Materialize the item into a field -> value map restricted to the
    /// requested projection.
    pub fn project(&self, fields: &[Field]) -> Projection {
        let mut map = Projection::new();
        for field in fields {
            let value = match field {
                Field::Id => Value::String(self.id.clone()),
                Field::Title => Value::String(self.title.clone()),
                Field::Url => Value::String(self.url.clone()),
                Field::Description => Value::String(self.description.clone()),
                Field::PublishedTime => Value::String(self.published_time.to_rfc3339()),
                Field::Section => Value::String(self.section.clone()),
                Field::Thumbnail => match &self.thumbnail {
                    Some(t) => Value::String(t.clone()),
                    None => Value::Null,
                },
                Field::ViewCount => Value::from(self.view_count),
            };
            map.insert(field.column().to_string(), value);
        }
        map
    }
}

/// Last path segment of a URL-ish string, `None` when there is nothing left.
pub fn slug_of(url: &str) -> Option<String> {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    if last.is_empty() {
        None
    } else {
        Some(last.to_string())
    }
}

/// A projected row: field name -> JSON value, restricted to whitelisted
/// fields by construction.
pub type Projection = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    pub limit: i64,
    pub offset: i64,
    pub total: i64,
}

/// Effective field/sort choices actually applied, echoed back so clients
/// can detect silent fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaInfo {
    pub fields: Vec<String>,
    pub order_by: String,
    pub order_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub items: Vec<Projection>,
    pub page: PageInfo,
    pub meta: MetaInfo,
}

/// Article handed in for classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub publish_date: DateTime<Utc>,
}

/// Classification output: the input echoed verbatim plus the three scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationItem {
    pub title: String,
    pub description: String,
    pub publish_date: DateTime<Utc>,
    pub pos: f32,
    pub neg: f32,
    pub neu: f32,
}

/// Three-way sentiment distribution. Invariant after [`Sentiment::renormalized`]:
/// all components are >= 0 and sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentiment {
    pub pos: f32,
    pub neg: f32,
    pub neu: f32,
}

impl Sentiment {
    /// Rescale so the components sum to 1, compensating for model rounding.
    /// Negative components are clamped to 0 first; an all-zero vector
    /// renormalizes to uniform.
    pub fn renormalized(self) -> Self {
        let pos = self.pos.max(0.0);
        let neg = self.neg.max(0.0);
        let neu = self.neu.max(0.0);
        let sum = pos + neg + neu;
        if sum > 0.0 {
            Self {
                pos: pos / sum,
                neg: neg / sum,
                neu: neu / sum,
            }
        } else {
            Self {
                pos: 1.0 / 3.0,
                neg: 1.0 / 3.0,
                neu: 1.0 / 3.0,
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildSection {
    pub label: String,
    pub href: String,
}

/// One entry of the derived section navigation tree (two levels deep).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionItem {
    pub label: String,
    pub href: String,
    #[serde(rename = "childSection")]
    pub children: Vec<ChildSection>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Field;
    use chrono::TimeZone;

    fn item() -> NewsItem {
        NewsItem {
            id: "n-1".to_string(),
            title: "Test".to_string(),
            url: "https://example.com/world/asia/some-story/".to_string(),
            description: "A description".to_string(),
            article: None,
            section: "World / Asia".to_string(),
            thumbnail: None,
            published_time: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            view_count: 4,
        }
    }

    #[test]
    fn slug_is_last_path_segment() {
        assert_eq!(item().slug().as_deref(), Some("some-story"));
        assert_eq!(slug_of("no-slashes").as_deref(), Some("no-slashes"));
        assert_eq!(slug_of(""), None);
        assert_eq!(slug_of("///"), None);
    }

    #[test]
    fn projection_contains_only_requested_fields() {
        let proj = item().project(&[Field::Id, Field::ViewCount]);
        assert_eq!(proj.len(), 2);
        assert_eq!(proj["id"], "n-1");
        assert_eq!(proj["view_count"], 4);
        assert!(!proj.contains_key("title"));
    }

    #[test]
    fn renormalized_sums_to_one() {
        let s = Sentiment {
            pos: 0.2,
            neg: 0.3,
            neu: 0.6,
        }
        .renormalized();
        assert!((s.pos + s.neg + s.neu - 1.0).abs() < 1e-6);
        assert!(s.pos > 0.0 && s.neg > 0.0 && s.neu > 0.0);
    }

    #[test]
    fn renormalized_clamps_negatives_and_handles_zero() {
        let s = Sentiment {
            pos: -0.5,
            neg: 0.0,
            neu: 0.5,
        }
        .renormalized();
        assert_eq!(s.pos, 0.0);
        assert!((s.neu - 1.0).abs() < 1e-6);

        let z = Sentiment {
            pos: 0.0,
            neg: 0.0,
            neu: 0.0,
        }
        .renormalized();
        assert!((z.pos + z.neg + z.neu - 1.0).abs() < 1e-6);
    }
}
