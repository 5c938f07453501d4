//! "Find similar" feature extraction and scoring

use std::collections::{BTreeMap, HashSet};

use super::config::{SearchConfig, SimilarityWeights};
use super::text::{leading_ascii_words, push_unique, title_tokens};
use super::types::{Record, ScoredRecord, SimilarityFeatures};
use crate::store::{RecordStore, StoreQuery, StoreResult};

const MIN_ASCII_TITLE_TOKEN: usize = 3;
const MIN_CJK_TITLE_TOKEN: usize = 2;
const MIN_SUMMARY_WORD: usize = 4;

const MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Default)]
pub struct SimilarityEngine {
    weights: SimilarityWeights,
}

impl SimilarityEngine {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            weights: config.similarity.clone(),
        }
    }

    /// Comparable attributes of one record.
    ///
    /// `keywords` unions metadata keywords (verbatim), title tokens and the
    /// first few long summary words, in that order.
    pub fn extract_features(&self, record: &Record) -> SimilarityFeatures {
        let titles = title_tokens(&record.title, MIN_ASCII_TITLE_TOKEN, MIN_CJK_TITLE_TOKEN);

        let mut keywords = Vec::new();
        for kw in record.metadata_keywords() {
            push_unique(&mut keywords, kw);
        }
        for token in &titles {
            push_unique(&mut keywords, token.clone());
        }
        for word in leading_ascii_words(&record.summary, MIN_SUMMARY_WORD, self.weights.summary_keyword_limit) {
            push_unique(&mut keywords, word);
        }

        SimilarityFeatures {
            record_type: record.record_type,
            field: record.field_label().map(str::to_string),
            keywords,
            title_tokens: titles,
            metadata_features: metadata_features(record),
        }
    }

    /// Cheap recall step: same type, same field, and a few keyword probes,
    /// deduplicated by id in first-seen order. May include the base record.
    pub fn candidate_set<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        base: &Record,
        features: &SimilarityFeatures,
    ) -> StoreResult<Vec<Record>> {
        let w = &self.weights;
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        let mut add = |batch: Vec<Record>| {
            for record in batch {
                if seen.insert(record.id.clone()) {
                    candidates.push(record);
                }
            }
        };

        add(store.search(&StoreQuery::new(w.type_candidates).with_type(Some(base.record_type)))?);

        if let Some(field) = features.field.as_deref() {
            add(store.search(&StoreQuery::new(w.field_candidates).with_field(Some(field)))?);
        }

        for keyword in features.keywords.iter().take(w.keyword_probes) {
            add(store.search(&StoreQuery::new(w.keyword_candidates).with_keyword(Some(keyword)))?);
        }

        Ok(candidates)
    }

    /// Weighted similarity in [0, 1]. Overlap ratios are taken against the
    /// base record's sets; an empty base set contributes 0.
    pub fn similarity(&self, base: &SimilarityFeatures, candidate: &SimilarityFeatures) -> f64 {
        let w = &self.weights;
        let mut score = 0.0;

        if base.record_type == candidate.record_type {
            score += w.type_match;
        }
        // Two unclassified records do not share a field.
        if let (Some(a), Some(b)) = (&base.field, &candidate.field) {
            if a == b {
                score += w.field_match;
            }
        }
        score += w.keyword_overlap * overlap_ratio(&base.keywords, &candidate.keywords);
        score += w.title_overlap * overlap_ratio(&base.title_tokens, &candidate.title_tokens);

        score.clamp(0.0, 1.0)
    }

    /// Score candidates against the base, drop the base itself, sort by
    /// similarity (stable) and keep the top `limit`.
    pub fn rank_similar(
        &self,
        base_id: &str,
        base_features: &SimilarityFeatures,
        candidates: Vec<Record>,
        limit: usize,
    ) -> Vec<ScoredRecord> {
        let mut scored: Vec<ScoredRecord> = candidates
            .into_iter()
            .filter(|c| c.id != base_id)
            .filter(|c| {
                let ok = c.is_well_formed();
                if !ok {
                    log::warn!("[Similarity] Skipping malformed candidate {:?}", c.id);
                }
                ok
            })
            .map(|c| {
                let score = self.similarity(base_features, &self.extract_features(&c));
                ScoredRecord::new(c, score)
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        scored
    }
}

fn overlap_ratio(base: &[String], other: &[String]) -> f64 {
    if base.is_empty() {
        return 0.0;
    }
    let other: HashSet<&str> = other.iter().map(String::as_str).collect();
    let shared = base.iter().filter(|t| other.contains(t.as_str())).count();
    shared as f64 / base.len() as f64
}

fn size_bucket(value: f64, medium_from: f64, large_from: f64) -> &'static str {
    if value < medium_from {
        "small"
    } else if value < large_from {
        "medium"
    } else {
        "large"
    }
}

/// Categorical features derived from file metadata
fn metadata_features(record: &Record) -> BTreeMap<String, String> {
    let mut features = BTreeMap::new();

    if let Some(ext) = record.metadata_str("file_extension") {
        features.insert("file_extension".to_string(), ext.to_lowercase());
    }
    if let Some(size) = record.metadata.get("file_size").and_then(|v| v.as_f64()) {
        features.insert(
            "file_size_category".to_string(),
            size_bucket(size, MB, 10.0 * MB).to_string(),
        );
    }
    if let Some(samples) = record.metadata.get("sample_count").and_then(|v| v.as_f64()) {
        features.insert(
            "sample_count_category".to_string(),
            size_bucket(samples, 100.0, 10_000.0).to_string(),
        );
    }
    if record.metadata.contains_key("json_keys") {
        features.insert("has_structured_data".to_string(), "true".to_string());
    }

    features
}
