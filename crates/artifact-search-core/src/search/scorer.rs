//! Weighted substring relevance scoring

use chrono::{DateTime, Utc};

use super::config::{Dictionaries, ScoringWeights, SearchConfig};
use super::types::{ParsedQuery, Record, ScoreBreakdown, ScoredRecord};

/// Scores candidate records against a parsed query.
///
/// Matching is case-insensitive substring containment. Scores are the sum of
/// keyword, phrase, recency and quality components.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    weights: ScoringWeights,
    dictionaries: Dictionaries,
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

/// Lower-cased record text, built once per record
struct Haystack {
    title: String,
    summary: String,
    field: String,
}

impl Haystack {
    fn of(record: &Record) -> Self {
        Self {
            title: record.title.to_lowercase(),
            summary: record.summary.to_lowercase(),
            field: record.field.as_deref().unwrap_or("").to_lowercase(),
        }
    }
}

fn lowered(terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

impl RelevanceScorer {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            weights: config.scoring.clone(),
            dictionaries: config.dictionaries.clone(),
        }
    }

    /// Score records in candidate order. Malformed and excluded records are
    /// dropped from the output.
    pub fn score(&self, records: &[Record], query: &ParsedQuery, now: DateTime<Utc>) -> Vec<ScoredRecord> {
        let keywords = lowered(&query.keywords);
        let phrases = lowered(&query.phrases);
        let excludes = lowered(&query.exclude_keywords);

        let mut scored = Vec::with_capacity(records.len());
        for record in records {
            if !record.is_well_formed() {
                log::warn!("[Scorer] Skipping malformed record {:?}", record.id);
                continue;
            }

            let haystack = Haystack::of(record);
            if excludes_hit(&haystack, &excludes) {
                continue;
            }

            let breakdown = ScoreBreakdown {
                keyword: self.keyword_score(&haystack, &keywords),
                phrase: self.phrase_score(&haystack, &phrases),
                recency: self.recency_bonus(record.updated_at, now),
                quality: self.quality_bonus(record),
            };
            scored.push(ScoredRecord::with_breakdown(record.clone(), breakdown));
        }
        scored
    }

    fn keyword_score(&self, haystack: &Haystack, keywords: &[String]) -> f64 {
        let w = &self.weights;
        keywords
            .iter()
            .map(|kw| {
                let mut s = 0.0;
                if haystack.title.contains(kw.as_str()) {
                    s += w.title_keyword;
                }
                if haystack.summary.contains(kw.as_str()) {
                    s += w.summary_keyword;
                }
                if haystack.field.contains(kw.as_str()) {
                    s += w.field_keyword;
                }
                s
            })
            .sum()
    }

    fn phrase_score(&self, haystack: &Haystack, phrases: &[String]) -> f64 {
        phrases
            .iter()
            .map(|phrase| {
                if haystack.title.contains(phrase.as_str()) {
                    self.weights.title_phrase
                } else if haystack.summary.contains(phrase.as_str()) {
                    self.weights.summary_phrase
                } else {
                    0.0
                }
            })
            .sum()
    }

    /// Bonus of the first tier the record's age (in whole days) falls under
    pub fn recency_bonus(&self, updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        let Some(updated_at) = updated_at else {
            return 0.0;
        };
        let age_days = (now - updated_at).num_days();
        self.weights
            .recency_tiers
            .iter()
            .find(|tier| age_days < tier.max_age_days)
            .map(|tier| tier.bonus)
            .unwrap_or(0.0)
    }

    pub fn quality_bonus(&self, record: &Record) -> f64 {
        let w = &self.weights;
        let mut bonus = 0.0;

        let title_len = record.title.chars().count();
        if (w.title_length_min..=w.title_length_max).contains(&title_len) {
            bonus += w.title_length_bonus;
        }
        if record.summary.chars().count() > w.summary_min_length {
            bonus += w.summary_bonus;
        }
        if record
            .field
            .as_deref()
            .is_some_and(|f| !self.dictionaries.is_unclassified(f))
        {
            bonus += w.classified_field_bonus;
        }
        if record.metadata.len() > w.metadata_min_keys {
            bonus += w.rich_metadata_bonus;
        }
        bonus
    }

    /// Stable sort by score, highest first. Ties keep candidate order.
    pub fn rank(scored: &mut [ScoredRecord]) {
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    }
}

fn excludes_hit(haystack: &Haystack, excludes: &[String]) -> bool {
    excludes.iter().any(|ex| {
        haystack.title.contains(ex.as_str())
            || haystack.summary.contains(ex.as_str())
            || haystack.field.contains(ex.as_str())
    })
}
