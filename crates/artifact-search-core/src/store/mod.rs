//! Record store collaborators
//!
//! The search core reads records only through [`RecordStore`]. Two
//! implementations ship with the crate: an in-memory store for tests and
//! embedding, and a SQLite store for a local library.

mod sqlite;

pub use sqlite::SqliteRecordStore;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;

use crate::search::types::{Record, RecordType};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Filtered lookup. `keyword` is a case-insensitive substring of title,
/// summary or field; `field` is a case-insensitive substring of the field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreQuery<'a> {
    pub keyword: Option<&'a str>,
    pub record_type: Option<RecordType>,
    pub field: Option<&'a str>,
    pub limit: usize,
}

impl<'a> StoreQuery<'a> {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    pub fn with_keyword(mut self, keyword: Option<&'a str>) -> Self {
        self.keyword = keyword;
        self
    }

    pub fn with_type(mut self, record_type: Option<RecordType>) -> Self {
        self.record_type = record_type;
        self
    }

    pub fn with_field(mut self, field: Option<&'a str>) -> Self {
        self.field = field;
        self
    }

    /// In-memory evaluation of the filters, shared with [`MemoryRecordStore`]
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(record_type) = self.record_type {
            if record.record_type != record_type {
                return false;
            }
        }
        let field = record.field.as_deref().unwrap_or("").to_lowercase();
        if let Some(wanted) = self.field {
            if !field.contains(&wanted.to_lowercase()) {
                return false;
            }
        }
        match self.keyword {
            Some(keyword) => {
                let keyword = keyword.to_lowercase();
                record.title.to_lowercase().contains(&keyword)
                    || record.summary.to_lowercase().contains(&keyword)
                    || field.contains(&keyword)
            }
            None => true,
        }
    }
}

/// Source of records for search. Results come back newest `updated_at` first.
pub trait RecordStore {
    fn search(&self, query: &StoreQuery<'_>) -> StoreResult<Vec<Record>>;

    fn get_by_id(&self, id: &str) -> StoreResult<Option<Record>>;

    /// Records updated at or after `cutoff`
    fn search_updated_since(&self, cutoff: DateTime<Utc>, limit: usize) -> StoreResult<Vec<Record>>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn search(&self, query: &StoreQuery<'_>) -> StoreResult<Vec<Record>> {
        (**self).search(query)
    }

    fn get_by_id(&self, id: &str) -> StoreResult<Option<Record>> {
        (**self).get_by_id(id)
    }

    fn search_updated_since(&self, cutoff: DateTime<Utc>, limit: usize) -> StoreResult<Vec<Record>> {
        (**self).search_updated_since(cutoff, limit)
    }
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn search(&self, query: &StoreQuery<'_>) -> StoreResult<Vec<Record>> {
        (**self).search(query)
    }

    fn get_by_id(&self, id: &str) -> StoreResult<Option<Record>> {
        (**self).get_by_id(id)
    }

    fn search_updated_since(&self, cutoff: DateTime<Utc>, limit: usize) -> StoreResult<Vec<Record>> {
        (**self).search_updated_since(cutoff, limit)
    }
}

/// Records held in memory
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<Record>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let store = Self::new();
        store.extend(records);
        store
    }

    /// Insert or replace by id
    pub fn insert(&self, record: Record) {
        let mut records = self.records.write();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    pub fn extend(&self, records: impl IntoIterator<Item = Record>) {
        for record in records {
            self.insert(record);
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn collect_newest_first(&self, limit: usize, keep: impl Fn(&Record) -> bool) -> Vec<Record> {
        let mut hits: Vec<Record> = self.records.read().iter().filter(|r| keep(r)).cloned().collect();
        hits.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        hits.truncate(limit);
        hits
    }
}

impl RecordStore for MemoryRecordStore {
    fn search(&self, query: &StoreQuery<'_>) -> StoreResult<Vec<Record>> {
        Ok(self.collect_newest_first(query.limit, |r| query.matches(r)))
    }

    fn get_by_id(&self, id: &str) -> StoreResult<Option<Record>> {
        Ok(self.records.read().iter().find(|r| r.id == id).cloned())
    }

    fn search_updated_since(&self, cutoff: DateTime<Utc>, limit: usize) -> StoreResult<Vec<Record>> {
        Ok(self.collect_newest_first(limit, |r| r.updated_at.is_some_and(|u| u >= cutoff)))
    }
}
