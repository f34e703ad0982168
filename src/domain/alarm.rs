// Alarm history rows and their table filter
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::timestamp;
use super::telemetry::RawTimestamp;

const MAX_SUGGESTIONS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Baixa",
            Priority::Medium => "Média",
            Priority::High => "Alta",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub id: u64,
    pub variable_name: String,
    pub value: String,
    pub description: String,
    pub time: String,
    pub priority: Priority,
}

impl Alarm {
    fn time_ms(&self) -> Option<i64> {
        timestamp::normalize(&RawTimestamp::Text(self.time.clone()))
    }
}

/// Table filter; every criterion is optional and they combine with AND.
#[derive(Debug, Clone, Default)]
pub struct AlarmFilter {
    pub search: Option<String>,
    pub priority: Option<Priority>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl AlarmFilter {
    pub fn matches(&self, alarm: &Alarm) -> bool {
        self.matches_search(alarm) && self.matches_priority(alarm) && self.matches_range(alarm)
    }

    fn matches_search(&self, alarm: &Alarm) -> bool {
        let Some(query) = self.normalized_search() else {
            return true;
        };
        [&alarm.variable_name, &alarm.value, &alarm.description]
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
    }

    fn matches_priority(&self, alarm: &Alarm) -> bool {
        self.priority.is_none_or(|p| p == alarm.priority)
    }

    fn matches_range(&self, alarm: &Alarm) -> bool {
        timestamp::within_days(alarm.time_ms(), self.start, self.end)
    }

    fn normalized_search(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
    }
}

/// Apply `filter`, keeping the input order.
pub fn filter_alarms(alarms: &[Alarm], filter: &AlarmFilter) -> Vec<Alarm> {
    alarms.iter().filter(|a| filter.matches(a)).cloned().collect()
}

/// Sorted, de-duplicated variable names containing `query`.
pub fn variable_suggestions(alarms: &[Alarm], query: &str) -> Vec<String> {
    suggest_names(alarms.iter().map(|a| a.variable_name.as_str()), query)
}

/// At most six sorted unique names containing `query`, ignoring case.
/// A blank query suggests nothing.
pub fn suggest_names<'a>(names: impl IntoIterator<Item = &'a str>, query: &str) -> Vec<String> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let mut matching: Vec<String> = names
        .into_iter()
        .filter(|name| name.to_lowercase().contains(&query))
        .map(str::to_string)
        .collect();
    matching.sort();
    matching.dedup();
    matching.truncate(MAX_SUGGESTIONS);
    matching
}
