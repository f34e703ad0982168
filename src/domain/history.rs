// Variable history lookup: exact-name search over recorded readings
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::alarm::suggest_names;
use super::telemetry::{NamedSeries, RawTimestamp, SeriesPoint};
use super::timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: u64,
    pub variable_name: String,
    pub value: f64,
    #[serde(default)]
    pub unit: String,
    pub time: String,
}

impl HistoryEntry {
    fn time_ms(&self) -> Option<i64> {
        timestamp::normalize(&RawTimestamp::Text(self.time.clone()))
    }
}

/// Entry of the searchable variable catalogue.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryVariable {
    #[serde(default)]
    pub id: u64,
    pub variable_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub variable: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryResult {
    /// Newest first.
    pub entries: Vec<HistoryEntry>,
    /// One series per variable, oldest first, labelled `MM/DD`.
    pub series: Vec<NamedSeries>,
}

/// Entries whose variable name equals the query (ignoring case) inside the
/// inclusive date range. A blank variable matches nothing.
pub fn search(entries: &[HistoryEntry], query: &HistoryQuery) -> Vec<HistoryEntry> {
    let Some(variable) = query
        .variable
        .as_deref()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
    else {
        return Vec::new();
    };

    let mut matching: Vec<(Option<i64>, &HistoryEntry)> = entries
        .iter()
        .filter(|e| e.variable_name.to_lowercase() == variable)
        .map(|e| (e.time_ms(), e))
        .filter(|(time_ms, _)| timestamp::within_days(*time_ms, query.start, query.end))
        .collect();

    // Undated entries sort last
    matching.sort_by(|a, b| b.0.cmp(&a.0));
    matching.into_iter().map(|(_, e)| e.clone()).collect()
}

/// Group `entries` into chart series in chronological order.
pub fn chart_series(entries: &[HistoryEntry], offset: FixedOffset) -> Vec<NamedSeries> {
    let mut dated: Vec<(i64, &HistoryEntry)> = entries
        .iter()
        .filter_map(|e| e.time_ms().map(|ms| (ms, e)))
        .collect();
    dated.sort_by_key(|(ms, _)| *ms);

    let mut series: Vec<NamedSeries> = Vec::new();
    for (time_ms, entry) in dated {
        let Some(label) = day_label(time_ms, offset) else {
            continue;
        };
        let point = SeriesPoint::category(label, entry.value);
        match series.iter_mut().find(|s| s.name == entry.variable_name) {
            Some(existing) => existing.data.push(point),
            None => series.push(NamedSeries::new(entry.variable_name.clone(), vec![point])),
        }
    }
    series
}

pub fn lookup(entries: &[HistoryEntry], query: &HistoryQuery, offset: FixedOffset) -> HistoryResult {
    let entries = search(entries, query);
    let series = chart_series(&entries, offset);
    HistoryResult { entries, series }
}

/// Catalogue names containing `query`.
pub fn variable_suggestions(variables: &[HistoryVariable], query: &str) -> Vec<String> {
    suggest_names(variables.iter().map(|v| v.variable_name.as_str()), query)
}

fn day_label(time_ms: i64, offset: FixedOffset) -> Option<String> {
    let local = DateTime::<Utc>::from_timestamp_millis(time_ms)?.with_timezone(&offset);
    Some(local.format("%m/%d").to_string())
}
