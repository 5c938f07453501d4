//! Search error types

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SearchError {
    /// The record store could not serve a request. Retries belong to the store.
    #[error("retrieval error: {0}")]
    Retrieval(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<StoreError> for SearchError {
    fn from(err: StoreError) -> Self {
        SearchError::Retrieval(err.to_string())
    }
}

pub type SearchResult<T> = Result<T, SearchError>;
