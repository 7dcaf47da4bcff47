//! Query validation: untrusted filter/sort/pagination input is reduced to a
//! [`QuerySpec`] whose fields and sort column can only ever come from the
//! whitelists below. Malformed input never errors, it degrades to the
//! documented defaults — query parameters are advisory, not contractual.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::section;
use crate::types::MetaInfo;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 1000;

/// Whitelist of selectable columns. Column names reach query text only
/// through [`Field::column`], never from the raw request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Title,
    Url,
    Description,
    PublishedTime,
    Section,
    Thumbnail,
    ViewCount,
}

impl Field {
    /// Default projection, also the full whitelist in canonical order.
    pub const ALL: [Field; 8] = [
        Field::Id,
        Field::Title,
        Field::Url,
        Field::Description,
        Field::PublishedTime,
        Field::Section,
        Field::Thumbnail,
        Field::ViewCount,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Title => "title",
            Field::Url => "url",
            Field::Description => "description",
            Field::PublishedTime => "published_time",
            Field::Section => "section",
            Field::Thumbnail => "thumbnail",
            Field::ViewCount => "view_count",
        }
    }

    pub fn parse(raw: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.column() == raw.trim())
    }
}

/// Whitelist of sortable columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    PublishedTime,
    Title,
    Section,
    Id,
    ViewCount,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::PublishedTime,
        SortKey::Title,
        SortKey::Section,
        SortKey::Id,
        SortKey::ViewCount,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            SortKey::PublishedTime => "published_time",
            SortKey::Title => "title",
            SortKey::Section => "section",
            SortKey::Id => "id",
            SortKey::ViewCount => "view_count",
        }
    }

    /// Unknown sort columns silently fall back to the default.
    pub fn parse_or_default(raw: Option<&str>) -> SortKey {
        raw.and_then(|r| SortKey::ALL.iter().copied().find(|k| k.column() == r.trim()))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }

    /// Anything other than a case-insensitive `asc`/`desc` becomes `DESC`.
    pub fn parse_or_default(raw: Option<&str>) -> SortDir {
        match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("asc") => SortDir::Asc,
            Some("desc") => SortDir::Desc,
            _ => SortDir::Desc,
        }
    }
}

/// The raw, untrusted request as it arrives from the transport layer.
/// Everything is an optional string so that no value can be rejected before
/// the builder has a chance to degrade it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryRequest {
    /// Comma-separated field names, e.g. `id,title,section`.
    pub fields: Option<String>,
    /// Comma-separated section labels, possibly URL-encoded.
    pub sections: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    /// Free-text keyword search over title/description/id.
    pub q: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub order_by: Option<String>,
    pub order_dir: Option<String>,
}

/// A validated, immutable query. Every member is safe to use verbatim when
/// building a lookup.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub fields: Vec<Field>,
    /// Normalized matching key of the first supplied section, if any.
    pub section: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    /// Lowercased keyword terms; every term must match independently.
    pub terms: Vec<String>,
    pub order_by: SortKey,
    pub order_dir: SortDir,
    pub limit: i64,
    pub offset: i64,
}

impl QuerySpec {
    pub fn build(req: &QueryRequest) -> QuerySpec {
        QuerySpec {
            fields: normalize_fields(req.fields.as_deref()),
            section: first_section(req.sections.as_deref()),
            date_from: parse_date(req.date_from.as_deref()),
            date_to: parse_date(req.date_to.as_deref()),
            terms: keyword_terms(req.q.as_deref()),
            order_by: SortKey::parse_or_default(req.order_by.as_deref()),
            order_dir: SortDir::parse_or_default(req.order_dir.as_deref()),
            limit: clamp_limit(req.limit.as_deref()),
            offset: clamp_offset(req.offset.as_deref()),
        }
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.column().to_string()).collect()
    }

    /// Post-validation echo for the response `meta` block.
    pub fn meta(&self) -> MetaInfo {
        MetaInfo {
            fields: self.field_names(),
            order_by: self.order_by.column().to_string(),
            order_dir: self.order_dir.as_sql().to_string(),
        }
    }
}

/// Keep whitelisted names in request order, duplicate-free; an empty result
/// falls back to the default projection, never to "all columns" pass-through.
fn normalize_fields(raw: Option<&str>) -> Vec<Field> {
    let mut out = Vec::new();
    if let Some(raw) = raw {
        for part in raw.split(',') {
            if let Some(field) = Field::parse(part) {
                if !out.contains(&field) {
                    out.push(field);
                }
            }
        }
    }
    if out.is_empty() {
        Field::ALL.to_vec()
    } else {
        out
    }
}

/// Only the first normalized section value becomes the effective filter when
/// several are supplied.
fn first_section(raw: Option<&str>) -> Option<String> {
    raw?.split(',')
        .map(section::normalize)
        .find(|s| !s.is_empty())
}

fn keyword_terms(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

/// RFC 3339 first, then a bare `YYYY-MM-DD` read as midnight UTC; anything
/// else degrades to "no bound".
fn parse_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn clamp_limit(raw: Option<&str>) -> i64 {
    match raw.and_then(|r| r.trim().parse::<i64>().ok()) {
        Some(n) if (1..=MAX_LIMIT).contains(&n) => n,
        _ => DEFAULT_LIMIT,
    }
}

fn clamp_offset(raw: Option<&str>) -> i64 {
    raw.and_then(|r| r.trim().parse::<i64>().ok())
        .map(|n| n.max(0))
        .unwrap_or(0)
}
