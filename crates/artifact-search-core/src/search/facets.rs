//! Facet aggregation over a result set

use std::collections::{BTreeMap, HashMap};

use super::config::FacetLimits;
use super::types::{Facet, FacetDimension, FacetEntry, Record};

#[derive(Debug, Clone, Default)]
pub struct FacetAggregator {
    limits: FacetLimits,
}

impl FacetAggregator {
    pub fn new(limits: FacetLimits) -> Self {
        Self { limits }
    }

    /// Value counts per dimension, keyed by dimension name.
    ///
    /// Every record counts toward `type`. The other dimensions skip records
    /// without a value, so each facet total is at most `records.len()`.
    pub fn generate<'a>(&self, records: impl IntoIterator<Item = &'a Record>) -> BTreeMap<String, Facet> {
        let records: Vec<&Record> = records.into_iter().collect();
        let mut facets = BTreeMap::new();

        let types = count(records.iter().map(|r| Some(r.record_type.as_str().to_string())));
        self.insert(&mut facets, FacetDimension::Type, types);

        let fields = count(records.iter().map(|r| r.field_label().map(str::to_string)));
        self.insert(&mut facets, FacetDimension::Field, fields);

        let extensions = count(
            records
                .iter()
                .map(|r| r.metadata_str("file_extension").map(str::to_string)),
        );
        self.insert(&mut facets, FacetDimension::Extension, extensions);

        let years = count(records.iter().map(|r| created_year(r)));
        self.insert(&mut facets, FacetDimension::Year, years);

        facets
    }

    fn insert(
        &self,
        facets: &mut BTreeMap<String, Facet>,
        dimension: FacetDimension,
        counts: HashMap<String, usize>,
    ) {
        let mut entries: Vec<FacetEntry> = counts
            .into_iter()
            .map(|(value, count)| FacetEntry { value, count })
            .collect();

        let cap = match dimension {
            FacetDimension::Year => {
                entries.sort_by(|a, b| b.value.cmp(&a.value));
                self.limits.year
            }
            _ => {
                entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
                match dimension {
                    FacetDimension::Type => self.limits.record_type,
                    FacetDimension::Field => self.limits.field,
                    _ => self.limits.extension,
                }
            }
        };
        if let Some(cap) = cap {
            entries.truncate(cap);
        }

        facets.insert(dimension.as_str().to_string(), Facet { dimension, entries });
    }
}

fn count(values: impl Iterator<Item = Option<String>>) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for value in values.flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
}

/// Leading four characters of the RFC 3339 `created_at`, when they are digits
fn created_year(record: &Record) -> Option<String> {
    let stamp = record.created_at?.to_rfc3339();
    let year: String = stamp.chars().take(4).collect();
    (year.len() == 4 && year.chars().all(|c| c.is_ascii_digit())).then_some(year)
}
