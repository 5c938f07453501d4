//! Artifact Search Module
//!
//! Keyword relevance search, facets, "find similar" and trending fields over
//! registered research artifacts (datasets, papers, posters).
//!
//! ## Features
//!
//! - Query parsing with phrases, `key:value` filters and `-exclusions`
//! - Weighted multi-field relevance scoring with recency and quality bonuses
//! - Facets by type, field, file extension and year
//! - Feature-overlap similarity for recommendations
//! - Recency-weighted trend detection per research field
//!
//! ## Usage
//!
//! ```rust,ignore
//! use artifact_search_core::search::{SearchConfig, SearchOptions, Searcher, SystemClock};
//! use artifact_search_core::store::SqliteRecordStore;
//!
//! let store = SqliteRecordStore::open_default()?;
//! let searcher = Searcher::new(store, SystemClock, SearchConfig::load()?);
//! let response = searcher.search(&SearchOptions {
//!     query: Some("\"machine learning\" -poster".into()),
//!     limit: Some(10),
//!     ..Default::default()
//! })?;
//! ```

mod clock;
pub mod config;
mod error;
mod facets;
mod query;
mod scorer;
mod searcher;
mod similarity;
mod text;
mod trends;
pub mod types;


pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Dictionaries, FacetLimits, ScoringWeights, SearchBehaviorConfig, SearchConfig, SimilarityWeights};
pub use error::{SearchError, SearchResult};
pub use facets::FacetAggregator;
pub use query::QueryParser;
pub use scorer::RelevanceScorer;
pub use searcher::{paginate, Searcher};
pub use similarity::SimilarityEngine;
pub use text::highlight;
pub use trends::TrendDetector;
pub use types::*;
