use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::debug;

use nw_core::{
    query::{Field, QuerySpec},
    Error, NewsItem, NewsStore, PageInfo, PageResult, Projection, Result,
};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS news (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        url TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        article TEXT,
        section TEXT NOT NULL DEFAULT '',
        thumbnail TEXT,
        published_time TIMESTAMPTZ NOT NULL,
        view_count BIGINT NOT NULL DEFAULT 0
    )
    "#,
    // Add future migrations here
];

/// Section labels are compared on a canonical key computed the same way
/// [`nw_core::section::normalize`] computes it for the filter side.
const SECTION_KEY: &str = "regexp_replace(lower(section), '[^a-z0-9]', '', 'g')";

pub struct PostgresStore {
    pool: PgPool,
}

/// Bound parameter values for the predicate fragments. Everything
/// request-derived goes through here, never into the SQL text.
enum Param {
    Text(String),
    Time(DateTime<Utc>),
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    params: &'q [Param],
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    for param in params {
        query = match param {
            Param::Text(s) => query.bind(s),
            Param::Time(t) => query.bind(*t),
        };
    }
    query
}

/// Static predicate table: one fragment per validated QuerySpec member,
/// shared verbatim by the page and count lookups.
fn build_predicates(spec: &QuerySpec) -> (String, Vec<Param>) {
    let mut parts: Vec<String> = Vec::new();
    let mut params: Vec<Param> = Vec::new();

    if let Some(sec) = &spec.section {
        params.push(Param::Text(sec.clone()));
        parts.push(format!(
            "{SECTION_KEY} LIKE '%' || ${} || '%'",
            params.len()
        ));
    }
    if let Some(from) = spec.date_from {
        params.push(Param::Time(from));
        parts.push(format!("published_time >= ${}", params.len()));
    }
    if let Some(to) = spec.date_to {
        params.push(Param::Time(to));
        parts.push(format!("published_time <= ${}", params.len()));
    }
    for term in &spec.terms {
        params.push(Param::Text(format!("%{term}%")));
        let idx = params.len();
        parts.push(format!(
            "(title ILIKE ${idx} OR description ILIKE ${idx} OR id ILIKE ${idx})"
        ));
    }

    let where_sql = if parts.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", parts.join(" AND "))
    };
    (where_sql, params)
}

fn storage_err(context: &str) -> impl Fn(sqlx::Error) -> Error + '_ {
    move |e| Error::Storage(format!("{context}: {e}"))
}

fn project_row(row: &PgRow, fields: &[Field]) -> Result<Projection> {
    let mut map = Projection::new();
    for field in fields {
        let value = match field {
            Field::PublishedTime => {
                let ts: DateTime<Utc> = row
                    .try_get(field.column())
                    .map_err(storage_err("failed to decode row"))?;
                Value::String(ts.to_rfc3339())
            }
            Field::ViewCount => {
                let n: Option<i64> = row
                    .try_get(field.column())
                    .map_err(storage_err("failed to decode row"))?;
                Value::from(n.unwrap_or(0))
            }
            _ => {
                let s: Option<String> = row
                    .try_get(field.column())
                    .map_err(storage_err("failed to decode row"))?;
                match s {
                    Some(s) => Value::String(s),
                    None => Value::Null,
                }
            }
        };
        map.insert(field.column().to_string(), value);
    }
    Ok(map)
}

fn row_to_item(row: &PgRow) -> Result<NewsItem> {
    let decode = storage_err("failed to decode news row");
    Ok(NewsItem {
        id: row.try_get("id").map_err(&decode)?,
        title: row.try_get("title").map_err(&decode)?,
        url: row.try_get("url").map_err(&decode)?,
        description: row
            .try_get::<Option<String>, _>("description")
            .map_err(&decode)?
            .unwrap_or_default(),
        article: row.try_get("article").map_err(&decode)?,
        section: row
            .try_get::<Option<String>, _>("section")
            .map_err(&decode)?
            .unwrap_or_default(),
        thumbnail: row.try_get("thumbnail").map_err(&decode)?,
        published_time: row.try_get("published_time").map_err(&decode)?,
        view_count: row
            .try_get::<Option<i64>, _>("view_count")
            .map_err(&decode)?
            .unwrap_or(0),
    })
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(storage_err("failed to connect to database"))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("failed to run migration {i}: {e}")))?;
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl NewsStore for PostgresStore {
    async fn query(&self, spec: &QuerySpec) -> Result<PageResult> {
        let (where_sql, params) = build_predicates(spec);

        let select_cols: Vec<&str> = spec.fields.iter().map(|f| f.column()).collect();
        // Column names, sort column and direction come from the whitelist
        // enums; limit/offset are already clamped integers.
        let page_sql = format!(
            "SELECT {} FROM news {} ORDER BY {} {} NULLS LAST LIMIT {} OFFSET {}",
            select_cols.join(", "),
            where_sql,
            spec.order_by.column(),
            spec.order_dir.as_sql(),
            spec.limit,
            spec.offset,
        );
        let count_sql = format!("SELECT COUNT(*) FROM news {where_sql}");
        debug!("news query: {page_sql}");

        let rows = bind_params(sqlx::query(&page_sql), &params)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err("failed to query news"))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(project_row(row, &spec.fields)?);
        }

        let count_row = bind_params(sqlx::query(&count_sql), &params)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err("failed to count news"))?;
        let total: i64 = count_row
            .try_get(0)
            .map_err(storage_err("failed to decode count"))?;

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
        let row = sqlx::query("SELECT * FROM news WHERE id = $1 LIMIT 1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err("failed to fetch news item"))?;
        row.as_ref().map(row_to_item).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<NewsItem>> {
        let row = sqlx::query(
            "SELECT * FROM news WHERE url ILIKE '%' || $1 || '%' \
             ORDER BY published_time DESC LIMIT 1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err("failed to fetch news item by slug"))?;
        row.as_ref().map(row_to_item).transpose()
    }

    async fn increment_views(&self, id: &str) -> Result<i64> {
        let row = sqlx::query(
            "UPDATE news SET view_count = COALESCE(view_count, 0) + 1 \
             WHERE id = $1 RETURNING view_count",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err("failed to increment view count"))?;

        match row {
            Some(row) => row
                .try_get(0)
                .map_err(storage_err("failed to decode view count")),
            None => Err(Error::NotFound(format!("news item {id}"))),
        }
    }

    async fn insert(&self, item: &NewsItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO news
            (id, title, url, description, article, section, thumbnail, published_time, view_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                url = EXCLUDED.url,
                description = EXCLUDED.description,
                article = EXCLUDED.article,
                section = EXCLUDED.section,
                thumbnail = EXCLUDED.thumbnail,
                published_time = EXCLUDED.published_time,
                view_count = EXCLUDED.view_count
            "#,
        )
        .bind(&item.id)
        .bind(&item.title)
        .bind(&item.url)
        .bind(&item.description)
        .bind(item.article.as_deref())
        .bind(&item.section)
        .bind(item.thumbnail.as_deref())
        .bind(item.published_time)
        .bind(item.view_count)
        .execute(&self.pool)
        .await
        .map_err(storage_err("failed to store news item"))?;
        Ok(())
    }
}
