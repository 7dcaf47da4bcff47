use std::sync::Arc;

use nw_core::{Error, NewsStore, Result};

pub mod backends;

pub use backends::*;

/// Build a storage backend by name. `database_url` is only consulted by
/// backends that need one.
#[cfg_attr(not(feature = "postgres"), allow(unused_variables))]
pub async fn create_store(backend: &str, database_url: Option<&str>) -> Result<Arc<dyn NewsStore>> {
    match backend {
        "memory" => Ok(Arc::new(backends::memory::MemoryStore::new())),
        #[cfg(feature = "postgres")]
        "postgres" => {
            let url = database_url.ok_or_else(|| {
                Error::Storage("postgres backend requires a database url".to_string())
            })?;
            Ok(Arc::new(backends::postgres::PostgresStore::connect(url).await?))
        }
        other => Err(Error::Storage(format!("unknown storage backend: {other}"))),
    }
}
