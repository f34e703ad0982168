// Axis and tick policy for chart x axes
use super::telemetry::NamedSeries;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

pub const MAX_TICKS: usize = 12;
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    DayMonth,
    HourMinute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AxisPlan {
    pub granularity: Granularity,
    /// Earliest timed x; `None` for categorical data.
    pub start_ms: Option<i64>,
    /// `max(x) - min(x)` over every timed point; `None` for categorical data.
    pub span_ms: Option<i64>,
    pub tick_count: usize,
    pub has_data: bool,
}

impl AxisPlan {
    pub fn for_series(series: &[NamedSeries]) -> Self {
        let (min, max) = series
            .iter()
            .flat_map(|s| s.data.iter())
            .filter_map(|point| point.x.as_time())
            .fold((None, None), |(min, max): (Option<i64>, Option<i64>), x| {
                (
                    Some(min.map_or(x, |m| m.min(x))),
                    Some(max.map_or(x, |m| m.max(x))),
                )
            });

        let span_ms = min.zip(max).map(|(min, max)| max.saturating_sub(min));
        let granularity = match span_ms {
            Some(span) if span >= DAY_MS => Granularity::DayMonth,
            _ => Granularity::HourMinute,
        };

        // Densest series decides how many ticks can be filled
        let points = series.iter().map(|s| s.data.len()).max().unwrap_or(0);

        Self {
            granularity,
            start_ms: min,
            span_ms,
            tick_count: points.min(MAX_TICKS),
            has_data: points > 0,
        }
    }
}

/// Local-time axis label: `dd/MM` or `HH:mm`.
pub fn format_tick(time_ms: i64, granularity: Granularity, offset: FixedOffset) -> Option<String> {
    let local = DateTime::<Utc>::from_timestamp_millis(time_ms)?.with_timezone(&offset);
    let pattern = match granularity {
        Granularity::DayMonth => "%d/%m",
        Granularity::HourMinute => "%H:%M",
    };
    Some(local.format(pattern).to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AxisTick {
    pub x: i64,
    pub label: String,
}

/// `tick_count` labelled ticks spread evenly over the plan's time span.
pub fn ticks(plan: &AxisPlan, offset: FixedOffset) -> Vec<AxisTick> {
    let (Some(start), Some(span)) = (plan.start_ms, plan.span_ms) else {
        return Vec::new();
    };

    let positions: Vec<i64> = match plan.tick_count {
        0 => Vec::new(),
        1 => vec![start],
        n => {
            let steps = n as i64 - 1;
            (0..=steps)
                .map(|i| {
                    // Widened so extreme spans cannot overflow
                    let offset = i128::from(span) * i128::from(i) / i128::from(steps);
                    start.saturating_add(i64::try_from(offset).unwrap_or(i64::MAX))
                })
                .collect()
        }
    };

    positions
        .into_iter()
        .filter_map(|x| {
            format_tick(x, plan.granularity, offset).map(|label| AxisTick { x, label })
        })
        .collect()
}

/// Tooltip label: `dd/MM HH:mm`.
pub fn format_tooltip(time_ms: i64, offset: FixedOffset) -> Option<String> {
    let local = DateTime::<Utc>::from_timestamp_millis(time_ms)?.with_timezone(&offset);
    Some(local.format("%d/%m %H:%M").to_string())
}
