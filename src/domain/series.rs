// Series building: raw samples to chart-ready points
use super::telemetry::{RawValue, Sample, SeriesPoint};
use super::timestamp;
use std::collections::HashMap;

/// Build a chronological, capped series from raw samples.
///
/// Points with an unusable timestamp are dropped; bad values become `0`.
/// When more than `max_points` survive, the oldest are discarded.
pub fn build(samples: &[Sample], max_points: usize) -> Vec<SeriesPoint> {
    let mut timed: Vec<(i64, f64)> = samples
        .iter()
        .filter_map(|sample| {
            let Some(time_ms) = timestamp::normalize_opt(sample.timestamp.as_ref()) else {
                tracing::debug!("Dropping {} sample with unusable timestamp", sample.variable);
                return None;
            };
            Some((time_ms, coerce_value(&sample.variable, &sample.value)))
        })
        .collect();

    // Stable sort keeps arrival order among equal timestamps
    timed.sort_by_key(|(time_ms, _)| *time_ms);

    let skip = timed.len().saturating_sub(max_points);
    timed
        .into_iter()
        .skip(skip)
        .map(|(time_ms, value)| SeriesPoint::time(time_ms, value))
        .collect()
}

fn coerce_value(variable: &str, value: &RawValue) -> f64 {
    match value.as_number() {
        Some(number) => number,
        None => {
            tracing::debug!("Coercing malformed {} value {:?} to 0", variable, value);
            0.0
        }
    }
}

/// Ordered categorical series: one point per label, missing labels at `0`.
pub fn categorical(source: &HashMap<String, RawValue>, labels: &[&str]) -> Vec<SeriesPoint> {
    labels
        .iter()
        .map(|label| {
            let y = source
                .get(*label)
                .and_then(RawValue::as_number)
                .unwrap_or(0.0);
            SeriesPoint::category(*label, y)
        })
        .collect()
}

pub const WEEKDAY_LABELS: [&str; 7] = ["Seg", "Ter", "Qua", "Qui", "Sex", "Sab", "Dom"];

pub const HOUR_LABELS: [&str; 24] = [
    "00", "01", "02", "03", "04", "05", "06", "07", "08", "09", "10", "11", "12", "13", "14",
    "15", "16", "17", "18", "19", "20", "21", "22", "23",
];

pub const MONTH_LABELS: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Marco",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];
