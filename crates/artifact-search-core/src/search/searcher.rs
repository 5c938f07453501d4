//! Search orchestration over a record store

use std::collections::{HashMap, HashSet};

use super::clock::Clock;
use super::config::SearchConfig;
use super::error::{SearchError, SearchResult};
use super::facets::FacetAggregator;
use super::query::QueryParser;
use super::scorer::RelevanceScorer;
use super::similarity::SimilarityEngine;
use super::text::highlight;
use super::trends::{window_start, TrendDetector};
use super::types::{
    FacetsResponse, Highlights, Intent, ParsedQuery, Record, RecordType, ScoredRecord,
    SearchOptions, SearchResponse, SimilarResponse, SortBy, TrendResponse,
};
use crate::store::{RecordStore, StoreQuery};

/// Results inspected when proposing related queries
const RELATED_SCAN: usize = 20;
/// Frequent fields turned into related queries
const RELATED_FIELDS: usize = 3;

/// Entry point of the search core.
///
/// Holds the store, the clock and one instance of each component, all
/// built from the same [`SearchConfig`].
pub struct Searcher<S, C> {
    store: S,
    clock: C,
    config: SearchConfig,
    parser: QueryParser,
    scorer: RelevanceScorer,
    facets: FacetAggregator,
    similarity: SimilarityEngine,
    trends: TrendDetector,
}

/// Filters sent to the store for one search
#[derive(Debug, Default)]
struct ResolvedFilters {
    record_type: Option<RecordType>,
    field: Option<String>,
}

impl<S: RecordStore, C: Clock> Searcher<S, C> {
    pub fn new(store: S, clock: C, config: SearchConfig) -> Self {
        Self {
            parser: QueryParser::new(&config),
            scorer: RelevanceScorer::new(&config),
            facets: FacetAggregator::new(config.facets.clone()),
            similarity: SimilarityEngine::new(&config),
            trends: TrendDetector::new(&config),
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run a search: parse, fetch candidates, score, filter, sort, facet,
    /// paginate and suggest.
    pub fn search(&self, options: &SearchOptions) -> SearchResult<SearchResponse> {
        let query = options.query_text().map(QueryParser::normalize);
        let parsed = query.as_deref().map(|q| self.parser.parse(q));
        let intent = query.as_deref().map(|q| self.parser.extract_intent(q));

        let limit = options.limit_or(self.config.search.default_limit);
        let offset = options.offset();
        let filters = self.resolve_filters(options, parsed.as_ref(), intent.as_ref());

        let candidates = self.fetch_candidates(parsed.as_ref(), &filters)?;
        let candidate_count = candidates.len();

        let mut results = match &parsed {
            Some(parsed) => self.scorer.score(&candidates, parsed, self.clock.now()),
            None => candidates
                .into_iter()
                .filter(|r| {
                    let ok = r.is_well_formed();
                    if !ok {
                        log::warn!("[Searcher] Skipping malformed record {:?}", r.id);
                    }
                    ok
                })
                .map(|r| ScoredRecord::new(r, 0.0))
                .collect(),
        };

        if !options.conditions.is_empty() {
            results.retain(|s| options.conditions.iter().all(|c| c.matches(&s.record)));
        }

        sort_results(&mut results, options.sort_by());

        let total_count = results.len();
        let facets = self.facets.generate(results.iter().map(|s| &s.record));
        let related_queries = self.related_queries(query.as_deref(), &results);
        let suggestions = query
            .as_deref()
            .map(|q| self.parser.suggest_improvements(q, total_count))
            .unwrap_or_default();

        let highlight_terms = parsed
            .as_ref()
            .filter(|_| options.highlight)
            .map(|p| p.keywords.iter().chain(&p.phrases).cloned().collect::<Vec<_>>());

        let page: Vec<ScoredRecord> = paginate(&results, offset, limit)
            .into_iter()
            .map(|mut item| {
                if !options.explain {
                    item.breakdown = None;
                }
                if let Some(terms) = &highlight_terms {
                    item.highlights = Some(Highlights {
                        title: highlight(&item.record.title, terms),
                        summary: highlight(&item.record.summary, terms),
                    });
                }
                item
            })
            .collect();

        log::debug!(
            "[Searcher] query={:?} candidates={} matched={} returned={}",
            query,
            candidate_count,
            total_count,
            page.len()
        );

        Ok(SearchResponse {
            returned_count: page.len(),
            results: page,
            total_count,
            offset,
            limit,
            has_more: offset.saturating_add(limit) < total_count,
            facets,
            suggestions,
            related_queries,
            parsed_query: parsed,
            intent,
        })
    }

    /// Records most similar to `id`, never including `id` itself
    pub fn get_similar(&self, id: &str, limit: Option<usize>) -> SearchResult<SimilarResponse> {
        let base = self
            .store
            .get_by_id(id)?
            .ok_or_else(|| SearchError::NotFound(id.to_string()))?;
        let limit = limit.unwrap_or(self.config.search.similar_limit);

        let features = self.similarity.extract_features(&base);
        let candidates = self.similarity.candidate_set(&self.store, &base, &features)?;
        log::debug!("[Searcher] similar to {}: {} candidates", id, candidates.len());

        Ok(SimilarResponse {
            base_id: base.id.clone(),
            similar: self.similarity.rank_similar(&base.id, &features, candidates, limit),
        })
    }

    /// Trending fields over the last `window_days` (configured default when `None`)
    pub fn trending(&self, window_days: Option<u32>) -> SearchResult<TrendResponse> {
        let window_days = window_days.unwrap_or(self.config.search.trend_window_days);
        if window_days == 0 {
            return Ok(TrendResponse {
                window_days,
                topics: Vec::new(),
            });
        }

        let now = self.clock.now();
        let cutoff = window_start(now, window_days);
        let records = self
            .store
            .search_updated_since(cutoff, self.config.search.trend_scan_limit)?;

        Ok(TrendResponse {
            window_days,
            topics: self.trends.detect(&records, window_days, now),
        })
    }

    /// Facets over the stored library, up to the configured scan limit
    pub fn library_facets(&self) -> SearchResult<FacetsResponse> {
        let records = self
            .store
            .search(&StoreQuery::new(self.config.search.facet_scan_limit))?;
        Ok(FacetsResponse {
            total_count: records.len(),
            facets: self.facets.generate(&records),
        })
    }

    /// Explicit options win over `type:` / `field:` in the query, which win
    /// over intent hints. Intent hints apply only when enabled.
    fn resolve_filters(
        &self,
        options: &SearchOptions,
        parsed: Option<&ParsedQuery>,
        intent: Option<&Intent>,
    ) -> ResolvedFilters {
        let from_query = |key: &str| parsed.and_then(|p| p.field_filters.get(key)).map(String::as_str);
        let use_intent = self.config.search.apply_intent_filters;

        let query_type = from_query("type").and_then(|label| match RecordType::from_label(label) {
            RecordType::Unknown if !label.eq_ignore_ascii_case("unknown") => {
                log::debug!("[Searcher] Ignoring unknown type filter {:?}", label);
                None
            }
            t => Some(t),
        });

        ResolvedFilters {
            record_type: options
                .record_type
                .or(query_type)
                .or_else(|| intent.filter(|_| use_intent).and_then(|i| i.data_type_preference)),
            field: options
                .field
                .as_deref()
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .or_else(|| from_query("field"))
                .map(str::to_string)
                .or_else(|| intent.filter(|_| use_intent).and_then(|i| i.field_hint.clone())),
        }
    }

    /// One store query per keyword and phrase, merged by id in first-seen
    /// order. Queries without terms fetch once without a keyword.
    ///
    /// The store limit does not depend on the requested page, so every page
    /// of a query is cut from the same ranked set.
    fn fetch_candidates(
        &self,
        parsed: Option<&ParsedQuery>,
        filters: &ResolvedFilters,
    ) -> SearchResult<Vec<Record>> {
        let base = StoreQuery::new(self.config.search.candidate_limit)
            .with_type(filters.record_type)
            .with_field(filters.field.as_deref());

        let terms: Vec<&str> = parsed
            .map(|p| {
                p.keywords
                    .iter()
                    .chain(&p.phrases)
                    .map(String::as_str)
                    .filter(|t| !t.trim().is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if terms.is_empty() {
            return Ok(self.store.search(&base)?);
        }

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for term in terms {
            for record in self.store.search(&base.with_keyword(Some(term)))? {
                if seen.insert(record.id.clone()) {
                    candidates.push(record);
                }
            }
        }
        Ok(candidates)
    }

    /// "query + field" for the most frequent fields among the top results,
    /// or the generic queries when there is nothing to build on.
    fn related_queries(&self, query: Option<&str>, results: &[ScoredRecord]) -> Vec<String> {
        let max = self.config.search.related_query_limit;
        let dictionaries = &self.config.dictionaries;

        let query = match query {
            Some(q) if !results.is_empty() => q,
            _ => return dictionaries.generic_queries.iter().take(max).cloned().collect(),
        };

        let mut order: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for scored in results.iter().take(RELATED_SCAN) {
            let Some(field) = scored.record.field_label() else {
                continue;
            };
            if dictionaries.is_unclassified(field) {
                continue;
            }
            let count = counts.entry(field).or_insert(0);
            if *count == 0 {
                order.push(field);
            }
            *count += 1;
        }
        order.sort_by(|a, b| counts[b].cmp(&counts[a]));

        let lower_query = query.to_lowercase();
        order
            .into_iter()
            .take(RELATED_FIELDS)
            .filter(|field| !lower_query.contains(&field.to_lowercase()))
            .map(|field| format!("{} {}", query, field))
            .take(max)
            .collect()
    }
}

/// Slice `items[offset..offset + limit]`, clamped to the bounds
pub fn paginate<T: Clone>(items: &[T], offset: usize, limit: usize) -> Vec<T> {
    items.iter().skip(offset).take(limit).cloned().collect()
}

/// Stable sort by the requested key
fn sort_results(results: &mut [ScoredRecord], sort_by: SortBy) {
    match sort_by {
        SortBy::Relevance => RelevanceScorer::rank(results),
        SortBy::Date => results.sort_by(|a, b| b.record.updated_at.cmp(&a.record.updated_at)),
        SortBy::Title => results.sort_by(|a, b| a.record.title.cmp(&b.record.title)),
        SortBy::Type => {
            results.sort_by(|a, b| a.record.record_type.as_str().cmp(b.record.record_type.as_str()))
        }
        SortBy::Field => results.sort_by(|a, b| {
            let fa = a.record.field.as_deref().unwrap_or("");
            let fb = b.record.field.as_deref().unwrap_or("");
            fa.cmp(fb)
        }),
    }
}
