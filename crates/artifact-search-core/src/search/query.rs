//! Query parsing, normalization and intent hints

use once_cell::sync::Lazy;
use regex::Regex;

use super::config::{Dictionaries, SearchConfig};
use super::text::{collapse_whitespace, fold_full_width};
use super::types::{Intent, ParsedQuery, QualityPreference, TemporalFilter};

static FIELD_FILTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+):(.*)$").expect("field filter pattern is valid"));

const OPERATORS: [&str; 3] = ["AND", "OR", "NOT"];

/// Turns raw query text into a [`ParsedQuery`].
///
/// Parsing never fails: text that does not fit any structured form ends up
/// in `keywords`.
#[derive(Debug, Clone)]
pub struct QueryParser {
    dictionaries: Dictionaries,
    broad_result_threshold: usize,
    verbose_query_words: usize,
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

impl QueryParser {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            dictionaries: config.dictionaries.clone(),
            broad_result_threshold: config.search.broad_result_threshold,
            verbose_query_words: config.search.verbose_query_words,
        }
    }

    /// Collapse whitespace and fold full-width letters and digits to ASCII
    pub fn normalize(raw: &str) -> String {
        let folded: String = raw.chars().map(fold_full_width).collect();
        collapse_whitespace(&folded)
    }

    /// Split a query into phrases, field filters, exclusions and keywords.
    ///
    /// `AND` / `OR` / `NOT` are recorded in `operators_seen` and otherwise
    /// kept as ordinary keywords.
    pub fn parse(&self, raw: &str) -> ParsedQuery {
        let (phrases, rest) = split_phrases(raw);
        let mut parsed = ParsedQuery {
            raw_text: raw.to_string(),
            phrases,
            ..Default::default()
        };

        let mut seen = [false; OPERATORS.len()];
        let mut tokens = rest.split_whitespace();

        while let Some(token) = tokens.next() {
            if let Some(idx) = OPERATORS.iter().position(|op| token.eq_ignore_ascii_case(op)) {
                seen[idx] = true;
                parsed.keywords.push(token.to_string());
                continue;
            }

            if let Some(excluded) = token.strip_prefix('-').filter(|t| !t.is_empty()) {
                parsed.exclude_keywords.push(excluded.to_string());
                continue;
            }

            if let Some(caps) = FIELD_FILTER.captures(token) {
                let key = caps[1].to_lowercase();
                let inline_value = &caps[2];
                let value = if inline_value.is_empty() {
                    // "field: value" written with a space
                    tokens.next().map(str::to_string)
                } else {
                    Some(inline_value.to_string())
                };
                match value {
                    Some(value) => {
                        parsed.field_filters.insert(key, value);
                    }
                    None => parsed.keywords.push(token.to_string()),
                }
                continue;
            }

            parsed.keywords.push(token.to_string());
        }

        parsed.operators_seen = OPERATORS
            .iter()
            .zip(seen)
            .filter(|(_, hit)| *hit)
            .map(|(op, _)| op.to_string())
            .collect();

        parsed
    }

    /// Classify the query against the configured dictionaries. First match wins
    /// in every table.
    pub fn extract_intent(&self, raw: &str) -> Intent {
        let lower = raw.to_lowercase();
        let hit = |keywords: &[String]| {
            keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .any(|k| !k.is_empty() && lower.contains(&k))
        };

        let dict = &self.dictionaries;
        let temporal_filter = if hit(&dict.temporal.recent) {
            Some(TemporalFilter::Recent)
        } else if hit(&dict.temporal.old) {
            Some(TemporalFilter::Old)
        } else {
            None
        };

        Intent {
            data_type_preference: dict
                .data_types
                .iter()
                .find(|entry| hit(&entry.keywords))
                .map(|entry| entry.record_type),
            field_hint: dict
                .field_hints
                .iter()
                .find(|entry| hit(&entry.keywords))
                .map(|entry| entry.field.clone()),
            temporal_filter,
            quality_preference: hit(&dict.quality_high).then_some(QualityPreference::High),
        }
    }

    /// Fixed hints for queries that found nothing or far too much
    pub fn suggest_improvements(&self, raw: &str, result_count: usize) -> Vec<String> {
        let messages = &self.dictionaries.messages;
        let mut suggestions: Vec<&str> = Vec::new();

        if result_count == 0 {
            if raw.split_whitespace().count() > self.verbose_query_words {
                suggestions.push(&messages.reduce_keywords);
            }
            if raw.contains('"') {
                suggestions.push(&messages.remove_phrase);
            }
            suggestions.push(&messages.try_synonyms);
            suggestions.push(&messages.try_other_language);
        } else if result_count > self.broad_result_threshold {
            suggestions.push(&messages.add_keywords);
            suggestions.push(&messages.filter_by_type);
            suggestions.push(&messages.filter_by_field);
        }

        suggestions
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Pull `"quoted"` phrases out of the query. Returns the phrases and the
/// remaining text. An unpaired quote is left behind as a standalone `"` token.
fn split_phrases(raw: &str) -> (Vec<String>, String) {
    let mut phrases = Vec::new();
    let mut rest = String::with_capacity(raw.len());
    let mut remaining = raw;

    while let Some(start) = remaining.find('"') {
        rest.push_str(&remaining[..start]);
        let after = &remaining[start + 1..];
        match after.find('"') {
            Some(end) => {
                let phrase = collapse_whitespace(&after[..end]);
                if !phrase.is_empty() {
                    phrases.push(phrase);
                }
                rest.push(' ');
                remaining = &after[end + 1..];
            }
            None => {
                rest.push_str(" \" ");
                remaining = after;
            }
        }
    }
    rest.push_str(remaining);

    (phrases, rest)
}
