//! Common types for search module

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of research artifact
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Dataset,
    Paper,
    Poster,
    /// Anything the registry could not classify
    #[default]
    #[serde(other)]
    Unknown,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Dataset => "dataset",
            RecordType::Paper => "paper",
            RecordType::Poster => "poster",
            RecordType::Unknown => "unknown",
        }
    }

    /// Map a stored or user supplied label onto a type. Unrecognised labels become `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "dataset" => RecordType::Dataset,
            "paper" => RecordType::Paper,
            "poster" => RecordType::Poster,
            _ => RecordType::Unknown,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered research artifact, as handed over by the record store.
///
/// The search core never mutates records; it only reads them to build
/// scores, facets, similarity features and trends.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier
    pub id: String,
    /// Artifact kind
    #[serde(rename = "type", default)]
    pub record_type: RecordType,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// Research field, if classified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_path: String,
    /// Free-form metadata (`keywords`, `file_extension`, `file_size`, ...)
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, record_type: RecordType, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            record_type,
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = file_path.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// A record needs an id and a title to take part in ranking.
    pub fn is_well_formed(&self) -> bool {
        !self.id.trim().is_empty() && !self.title.trim().is_empty()
    }

    /// Research field when present and non-blank
    pub fn field_label(&self) -> Option<&str> {
        self.field.as_deref().map(str::trim).filter(|f| !f.is_empty())
    }

    /// String metadata value when present and non-blank
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// String entries of `metadata.keywords`, in stored order
    pub fn metadata_keywords(&self) -> Vec<String> {
        match self.metadata.get("keywords") {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.to_string())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Structured form of a raw query string
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuery {
    pub raw_text: String,
    pub keywords: Vec<String>,
    pub phrases: Vec<String>,
    pub exclude_keywords: Vec<String>,
    pub field_filters: BTreeMap<String, String>,
    /// Boolean operators spotted in the query. Reported only, retrieval ignores them.
    pub operators_seen: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TemporalFilter {
    Recent,
    Old,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreference {
    High,
}

/// Hints derived from dictionary lookups on the raw query
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type_preference: Option<RecordType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal_filter: Option<TemporalFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_preference: Option<QualityPreference>,
}

/// Per-component contributions to a relevance score
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub keyword: f64,
    pub phrase: f64,
    pub recency: f64,
    pub quality: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.keyword + self.phrase + self.recency + self.quality
    }
}

/// Title and summary with matched terms wrapped in `<mark>` tags
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Highlights {
    pub title: String,
    pub summary: String,
}

/// A record with its relevance or similarity score
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredRecord {
    pub record: Record,
    /// Always >= 0
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Highlights>,
}

impl ScoredRecord {
    pub fn new(record: Record, score: f64) -> Self {
        Self {
            record,
            score: score.max(0.0),
            breakdown: None,
            highlights: None,
        }
    }

    pub fn with_breakdown(record: Record, breakdown: ScoreBreakdown) -> Self {
        Self {
            record,
            score: breakdown.total().max(0.0),
            breakdown: Some(breakdown),
            highlights: None,
        }
    }
}

/// Facet dimensions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum FacetDimension {
    Type,
    Field,
    Extension,
    Year,
}

impl FacetDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacetDimension::Type => "type",
            FacetDimension::Field => "field",
            FacetDimension::Extension => "extension",
            FacetDimension::Year => "year",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FacetEntry {
    pub value: String,
    pub count: usize,
}

/// Value counts for one dimension over a result set
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Facet {
    pub dimension: FacetDimension,
    pub entries: Vec<FacetEntry>,
}

/// Comparable attributes of a record for "find similar"
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityFeatures {
    pub record_type: RecordType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Unique, in extraction order
    pub keywords: Vec<String>,
    /// Unique, in extraction order
    pub title_tokens: Vec<String>,
    pub metadata_features: BTreeMap<String, String>,
}

/// A research field with enough recent activity to count as trending
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendTopic {
    pub topic: String,
    pub count: usize,
    pub latest_update: DateTime<Utc>,
    pub trend_score: f64,
}

/// Result ordering
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Relevance,
    Date,
    Title,
    Type,
    Field,
}

/// Record attribute an advanced condition inspects
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConditionField {
    Title,
    Summary,
    Field,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    #[default]
    Contains,
    Equals,
    StartsWith,
    EndsWith,
}

/// Extra post-scoring filter, all conditions must hold (case-insensitive)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldCondition {
    pub field: ConditionField,
    #[serde(default)]
    pub operator: ConditionOperator,
    pub value: String,
}

impl FieldCondition {
    pub fn matches(&self, record: &Record) -> bool {
        let haystack = match self.field {
            ConditionField::Title => record.title.to_lowercase(),
            ConditionField::Summary => record.summary.to_lowercase(),
            ConditionField::Field => record.field.as_deref().unwrap_or("").to_lowercase(),
        };
        let needle = self.value.to_lowercase();
        match self.operator {
            ConditionOperator::Contains => haystack.contains(&needle),
            ConditionOperator::Equals => haystack == needle,
            ConditionOperator::StartsWith => haystack.starts_with(&needle),
            ConditionOperator::EndsWith => haystack.ends_with(&needle),
        }
    }
}

/// Search options
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    /// Raw query text
    pub query: Option<String>,
    /// Restrict to one artifact type
    #[serde(rename = "type")]
    pub record_type: Option<RecordType>,
    /// Restrict to a research field (substring match)
    pub field: Option<String>,
    pub sort_by: Option<SortBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    #[serde(default)]
    pub conditions: Vec<FieldCondition>,
    /// Attach score breakdowns to results
    #[serde(default)]
    pub explain: bool,
    /// Attach `<mark>` highlights to results
    #[serde(default)]
    pub highlight: bool,
}

impl SearchOptions {
    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    pub fn query_text(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    pub fn limit_or(&self, default_limit: usize) -> usize {
        self.limit.unwrap_or(default_limit)
    }

    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    pub fn sort_by(&self) -> SortBy {
        self.sort_by.unwrap_or_default()
    }
}

/// Search results response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<ScoredRecord>,
    /// Matches after exclusion and conditions, before pagination
    pub total_count: usize,
    /// Always `results.len()`
    pub returned_count: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
    pub facets: BTreeMap<String, Facet>,
    /// Query improvement hints
    pub suggestions: Vec<String>,
    /// Follow-up queries built from frequent fields
    pub related_queries: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_query: Option<ParsedQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarResponse {
    pub base_id: String,
    pub similar: Vec<ScoredRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendResponse {
    pub window_days: u32,
    pub topics: Vec<TrendTopic>,
}

/// Facets over the whole library rather than one result set
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetsResponse {
    pub total_count: usize,
    pub facets: BTreeMap<String, Facet>,
}

/// Parse a stored timestamp. Accepts RFC 3339 and naive ISO 8601 (read as UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}
