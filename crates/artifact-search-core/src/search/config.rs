//! Search configuration

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::error::{SearchError, SearchResult};
use super::types::RecordType;

pub const TITLE_KEYWORD_WEIGHT: f64 = 10.0;
pub const SUMMARY_KEYWORD_WEIGHT: f64 = 5.0;
pub const FIELD_KEYWORD_WEIGHT: f64 = 3.0;
pub const TITLE_PHRASE_WEIGHT: f64 = 15.0;
pub const SUMMARY_PHRASE_WEIGHT: f64 = 8.0;

/// (age below this many days, bonus), checked in order
pub const RECENCY_TIERS: [(i64, f64); 3] = [(7, 2.0), (30, 1.0), (90, 0.5)];

pub const TITLE_LENGTH_MIN: usize = 10;
pub const TITLE_LENGTH_MAX: usize = 100;
pub const TITLE_LENGTH_BONUS: f64 = 1.0;
pub const SUMMARY_MIN_LENGTH: usize = 20;
pub const SUMMARY_BONUS: f64 = 1.0;
pub const CLASSIFIED_FIELD_BONUS: f64 = 0.5;
pub const METADATA_MIN_KEYS: usize = 3;
pub const RICH_METADATA_BONUS: f64 = 0.5;

pub const TYPE_MATCH_WEIGHT: f64 = 0.3;
pub const FIELD_MATCH_WEIGHT: f64 = 0.3;
pub const KEYWORD_OVERLAP_WEIGHT: f64 = 0.25;
pub const TITLE_OVERLAP_WEIGHT: f64 = 0.15;

const BUILTIN_DICTIONARIES: &str = include_str!("../../resources/dictionaries.toml");

static BUILTIN: Lazy<Dictionaries> = Lazy::new(|| {
    toml::from_str(BUILTIN_DICTIONARIES).unwrap_or_else(|e| {
        log::error!("[Config] Built-in dictionaries are invalid: {}", e);
        Dictionaries::empty()
    })
});

/// Main search configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Relevance scoring weights
    #[serde(default)]
    pub scoring: ScoringWeights,

    /// Similarity weights and candidate recall limits
    #[serde(default)]
    pub similarity: SimilarityWeights,

    /// Facet caps
    #[serde(default)]
    pub facets: FacetLimits,

    /// Search behavior configuration
    #[serde(default)]
    pub search: SearchBehaviorConfig,

    /// Locale dependent keyword tables and messages
    #[serde(default)]
    pub dictionaries: Dictionaries,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecencyTier {
    /// Records younger than this many whole days earn the bonus
    pub max_age_days: i64,
    pub bonus: f64,
}

/// Relevance scoring weights.
///
/// Ordering intent: title match > phrase in summary > summary match > field match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub title_keyword: f64,
    pub summary_keyword: f64,
    pub field_keyword: f64,
    pub title_phrase: f64,
    pub summary_phrase: f64,
    pub recency_tiers: Vec<RecencyTier>,
    pub title_length_min: usize,
    pub title_length_max: usize,
    pub title_length_bonus: f64,
    pub summary_min_length: usize,
    pub summary_bonus: f64,
    pub classified_field_bonus: f64,
    pub metadata_min_keys: usize,
    pub rich_metadata_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            title_keyword: TITLE_KEYWORD_WEIGHT,
            summary_keyword: SUMMARY_KEYWORD_WEIGHT,
            field_keyword: FIELD_KEYWORD_WEIGHT,
            title_phrase: TITLE_PHRASE_WEIGHT,
            summary_phrase: SUMMARY_PHRASE_WEIGHT,
            recency_tiers: RECENCY_TIERS
                .iter()
                .map(|&(max_age_days, bonus)| RecencyTier { max_age_days, bonus })
                .collect(),
            title_length_min: TITLE_LENGTH_MIN,
            title_length_max: TITLE_LENGTH_MAX,
            title_length_bonus: TITLE_LENGTH_BONUS,
            summary_min_length: SUMMARY_MIN_LENGTH,
            summary_bonus: SUMMARY_BONUS,
            classified_field_bonus: CLASSIFIED_FIELD_BONUS,
            metadata_min_keys: METADATA_MIN_KEYS,
            rich_metadata_bonus: RICH_METADATA_BONUS,
        }
    }
}

/// Similarity weights. Type and field matches dominate the token overlaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
    pub type_match: f64,
    pub field_match: f64,
    pub keyword_overlap: f64,
    pub title_overlap: f64,
    /// Store limit for the same-type recall query
    pub type_candidates: usize,
    /// Store limit for the same-field recall query
    pub field_candidates: usize,
    /// How many leading keywords are probed in the store
    pub keyword_probes: usize,
    /// Store limit per keyword probe
    pub keyword_candidates: usize,
    /// Summary words contributing to the keyword set
    pub summary_keyword_limit: usize,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            type_match: TYPE_MATCH_WEIGHT,
            field_match: FIELD_MATCH_WEIGHT,
            keyword_overlap: KEYWORD_OVERLAP_WEIGHT,
            title_overlap: TITLE_OVERLAP_WEIGHT,
            type_candidates: 50,
            field_candidates: 50,
            keyword_probes: 3,
            keyword_candidates: 20,
            summary_keyword_limit: 5,
        }
    }
}

/// Facet caps; `None` leaves a dimension unbounded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacetLimits {
    pub record_type: Option<usize>,
    pub field: Option<usize>,
    pub extension: Option<usize>,
    pub year: Option<usize>,
}

impl Default for FacetLimits {
    fn default() -> Self {
        Self {
            record_type: None,
            field: Some(10),
            extension: Some(5),
            year: Some(5),
        }
    }
}

/// Search behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchBehaviorConfig {
    /// Default page size
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Default size of "find similar" lists
    #[serde(default = "default_similar_limit")]
    pub similar_limit: usize,

    /// Default trend window in days
    #[serde(default = "default_trend_window_days")]
    pub trend_window_days: u32,

    /// Store limit per candidate query, independent of the requested page
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,

    /// Records scanned when detecting trends
    #[serde(default = "default_trend_scan_limit")]
    pub trend_scan_limit: usize,

    /// Records scanned for library-wide facets
    #[serde(default = "default_facet_scan_limit")]
    pub facet_scan_limit: usize,

    #[serde(default = "default_max_trend_topics")]
    pub max_trend_topics: usize,

    #[serde(default = "default_related_query_limit")]
    pub related_query_limit: usize,

    /// Result count above which the query is considered too broad
    #[serde(default = "default_broad_result_threshold")]
    pub broad_result_threshold: usize,

    /// Word count above which an empty search suggests dropping keywords
    #[serde(default = "default_verbose_query_words")]
    pub verbose_query_words: usize,

    /// Turn intent hints (type preference, field hint) into store filters
    #[serde(default)]
    pub apply_intent_filters: bool,
}

impl Default for SearchBehaviorConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            similar_limit: default_similar_limit(),
            trend_window_days: default_trend_window_days(),
            candidate_limit: default_candidate_limit(),
            trend_scan_limit: default_trend_scan_limit(),
            facet_scan_limit: default_facet_scan_limit(),
            max_trend_topics: default_max_trend_topics(),
            related_query_limit: default_related_query_limit(),
            broad_result_threshold: default_broad_result_threshold(),
            verbose_query_words: default_verbose_query_words(),
            apply_intent_filters: false,
        }
    }
}

fn default_limit() -> usize {
    50
}

fn default_similar_limit() -> usize {
    5
}

fn default_trend_window_days() -> u32 {
    7
}

fn default_candidate_limit() -> usize {
    500
}

fn default_trend_scan_limit() -> usize {
    200
}

fn default_facet_scan_limit() -> usize {
    10_000
}

fn default_max_trend_topics() -> usize {
    10
}

fn default_related_query_limit() -> usize {
    5
}

fn default_broad_result_threshold() -> usize {
    100
}

fn default_verbose_query_words() -> usize {
    3
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTypeEntry {
    pub record_type: RecordType,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldHintEntry {
    pub field: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalKeywords {
    #[serde(default)]
    pub recent: Vec<String>,
    #[serde(default)]
    pub old: Vec<String>,
}

/// Query improvement messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionMessages {
    #[serde(default)]
    pub reduce_keywords: String,
    #[serde(default)]
    pub remove_phrase: String,
    #[serde(default)]
    pub try_synonyms: String,
    #[serde(default)]
    pub try_other_language: String,
    #[serde(default)]
    pub add_keywords: String,
    #[serde(default)]
    pub filter_by_type: String,
    #[serde(default)]
    pub filter_by_field: String,
}

/// Locale dependent keyword tables.
///
/// Missing sections fall back to the built-in tables in
/// `resources/dictionaries.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionaries {
    #[serde(default = "builtin_unclassified_labels")]
    pub unclassified_labels: Vec<String>,
    #[serde(default = "builtin_generic_queries")]
    pub generic_queries: Vec<String>,
    #[serde(default = "builtin_quality_high")]
    pub quality_high: Vec<String>,
    #[serde(default = "builtin_data_types")]
    pub data_types: Vec<DataTypeEntry>,
    #[serde(default = "builtin_field_hints")]
    pub field_hints: Vec<FieldHintEntry>,
    #[serde(default = "builtin_temporal")]
    pub temporal: TemporalKeywords,
    #[serde(default = "builtin_messages")]
    pub messages: SuggestionMessages,
}

impl Default for Dictionaries {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

fn builtin_unclassified_labels() -> Vec<String> {
    BUILTIN.unclassified_labels.clone()
}

fn builtin_generic_queries() -> Vec<String> {
    BUILTIN.generic_queries.clone()
}

fn builtin_quality_high() -> Vec<String> {
    BUILTIN.quality_high.clone()
}

fn builtin_data_types() -> Vec<DataTypeEntry> {
    BUILTIN.data_types.clone()
}

fn builtin_field_hints() -> Vec<FieldHintEntry> {
    BUILTIN.field_hints.clone()
}

fn builtin_temporal() -> TemporalKeywords {
    BUILTIN.temporal.clone()
}

fn builtin_messages() -> SuggestionMessages {
    BUILTIN.messages.clone()
}

impl Dictionaries {
    /// Tables with no entries at all
    pub fn empty() -> Self {
        Self {
            unclassified_labels: Vec::new(),
            generic_queries: Vec::new(),
            quality_high: Vec::new(),
            data_types: Vec::new(),
            field_hints: Vec::new(),
            temporal: TemporalKeywords::default(),
            messages: SuggestionMessages::default(),
        }
    }

    /// Load dictionaries from a TOML file
    pub fn from_path(path: &Path) -> SearchResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// True when `field` is blank or one of the unclassified labels
    pub fn is_unclassified(&self, field: &str) -> bool {
        let trimmed = field.trim();
        trimmed.is_empty()
            || self
                .unclassified_labels
                .iter()
                .any(|label| label.eq_ignore_ascii_case(trimmed))
    }
}

impl SearchConfig {
    /// Load configuration from file and environment
    /// Priority: environment variables > config.toml > defaults
    pub fn load() -> SearchResult<Self> {
        let mut config = Self::default();

        let toml_path = Self::toml_config_path();
        if toml_path.exists() {
            match std::fs::read_to_string(&toml_path) {
                Ok(content) => match Self::from_toml_str(&content) {
                    Ok(file_config) => config = file_config,
                    Err(e) => log::warn!(
                        "[Config] Ignoring invalid {}: {}",
                        toml_path.display(),
                        e
                    ),
                },
                Err(e) => log::warn!("[Config] Cannot read {}: {}", toml_path.display(), e),
            }
        }

        if let Ok(value) = std::env::var("ARTIFACT_SEARCH_DEFAULT_LIMIT") {
            match value.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => config.search.default_limit = limit,
                _ => log::warn!("[Config] Ignoring ARTIFACT_SEARCH_DEFAULT_LIMIT={}", value),
            }
        }

        // An explicitly named dictionary file must load.
        if let Ok(path) = std::env::var("ARTIFACT_SEARCH_DICTIONARIES") {
            let path = PathBuf::from(path);
            config.dictionaries = Dictionaries::from_path(&path).map_err(|e| {
                SearchError::Config(format!("dictionaries {}: {}", path.display(), e))
            })?;
        }

        Ok(config)
    }

    /// Parse a full configuration from TOML text
    pub fn from_toml_str(content: &str) -> SearchResult<Self> {
        Ok(toml::from_str::<SearchConfig>(content)?)
    }

    /// Get base config directory
    fn config_dir() -> PathBuf {
        if let Ok(root) = std::env::var("ARTIFACT_SEARCH_ROOT") {
            return PathBuf::from(root);
        }

        dirs::home_dir()
            .map(|h| h.join(".artifact-search"))
            .unwrap_or_else(|| PathBuf::from(".artifact-search"))
    }

    /// Get config file path (config.toml)
    pub fn toml_config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Default SQLite database path
    pub fn default_db_path() -> PathBuf {
        if let Ok(path) = std::env::var("ARTIFACT_SEARCH_DB_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("records.db")
    }
}
