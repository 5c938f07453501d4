//! Search and relevance core for research artifact libraries.
//!
//! [`search`] holds the query parser, scorer, facet aggregator, similarity
//! engine, trend detector and the [`search::Searcher`] that composes them.
//! [`store`] holds the record store trait and its in-memory and SQLite
//! implementations.


pub mod search;
pub mod store;

use thiserror::Error;

pub use search::{
    Record, RecordType, SearchConfig, SearchError, SearchOptions, SearchResponse, SearchResult,
    Searcher,
};
pub use store::{MemoryRecordStore, RecordStore, SqliteRecordStore, StoreError, StoreQuery};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Open the default SQLite library with configuration from the environment.
pub fn open_default_searcher() -> CoreResult<Searcher<SqliteRecordStore, search::SystemClock>> {
    let config = SearchConfig::load()?;
    let store = SqliteRecordStore::open_default()?;
    Ok(Searcher::new(store, search::SystemClock, config))
}
