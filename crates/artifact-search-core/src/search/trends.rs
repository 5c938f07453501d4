//! Trending research fields

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};

use super::config::{Dictionaries, SearchConfig};
use super::types::{Record, TrendTopic};

/// Groups recently updated records by field and scores each group by volume
/// and freshness: `count * (1 + recency)`, where recency falls linearly from
/// 1 (updated now) to 0 (updated at the window edge).
#[derive(Debug, Clone)]
pub struct TrendDetector {
    dictionaries: Dictionaries,
    max_topics: usize,
}

impl Default for TrendDetector {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

struct Group {
    count: usize,
    latest: DateTime<Utc>,
}

/// Start of a window of `window_days` ending at `now`. Windows reaching past
/// the representable range start at [`DateTime::MIN_UTC`].
pub(crate) fn window_start(now: DateTime<Utc>, window_days: u32) -> DateTime<Utc> {
    TimeDelta::try_days(i64::from(window_days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl TrendDetector {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            dictionaries: config.dictionaries.clone(),
            max_topics: config.search.max_trend_topics,
        }
    }

    pub fn detect(&self, records: &[Record], window_days: u32, now: DateTime<Utc>) -> Vec<TrendTopic> {
        if window_days == 0 {
            return Vec::new();
        }
        let cutoff = window_start(now, window_days);

        // Topics keep first-seen order so equal scores stay stable.
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Group> = HashMap::new();

        for record in records {
            let Some(updated_at) = record.updated_at.filter(|u| *u > cutoff) else {
                continue;
            };
            let Some(field) = record.field_label() else {
                continue;
            };
            if self.dictionaries.is_unclassified(field) {
                continue;
            }

            match groups.get_mut(field) {
                Some(group) => {
                    group.count += 1;
                    group.latest = group.latest.max(updated_at);
                }
                None => {
                    order.push(field.to_string());
                    groups.insert(field.to_string(), Group { count: 1, latest: updated_at });
                }
            }
        }

        let window_hours = f64::from(window_days) * 24.0;
        let mut topics: Vec<TrendTopic> = order
            .into_iter()
            .filter_map(|topic| {
                let group = groups.remove(&topic)?;
                if group.count < 2 {
                    return None;
                }
                let hours_since = (now - group.latest).num_seconds() as f64 / 3600.0;
                let recency = (1.0 - hours_since / window_hours).max(0.0);
                Some(TrendTopic {
                    topic,
                    count: group.count,
                    latest_update: group.latest,
                    trend_score: group.count as f64 * (1.0 + recency),
                })
            })
            .collect();

        topics.sort_by(|a, b| b.trend_score.total_cmp(&a.trend_score));
        topics.truncate(self.max_topics);

        log::debug!(
            "[Trends] {} topics from {} records over {} days",
            topics.len(),
            records.len(),
            window_days
        );
        topics
    }
}
