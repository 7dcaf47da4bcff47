pub mod error;
pub mod query;
pub mod section;
pub mod storage;
pub mod types;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

pub use query::{Field, QueryRequest, QuerySpec, SortDir, SortKey};
pub use storage::NewsStore;
pub use types::{
    slug_of, ChildSection, ClassificationItem, MetaInfo, NewsInput, NewsItem, PageInfo,
    PageResult, Projection, SectionItem, Sentiment,
};
