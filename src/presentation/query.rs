// URL query parameters and their parsing
use crate::application::fixture_service::{ConsumptionPeriod, GenerationPeriod, PeakMode, SharePeriod};
use crate::domain::alarm::{AlarmFilter, Priority};
use crate::domain::history::HistoryQuery;
use crate::domain::phase::{Phase, PhaseMetric, TimeFrame};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid {param}: '{value}'")]
pub struct QueryError {
    pub param: &'static str,
    pub value: String,
}

impl QueryError {
    fn new(param: &'static str, value: &str) -> Self {
        Self {
            param,
            value: value.to_string(),
        }
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PhaseChartQuery {
    pub metric: Option<String>,
    pub time_frame: Option<String>,
    pub phases: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimeFrameQuery {
    pub time_frame: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PhasesQuery {
    pub phases: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub period: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PeakQuery {
    pub mode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlarmQuery {
    pub search: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub variable: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestionQuery {
    pub q: Option<String>,
}

/// Treat absent and blank parameters alike.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn parse_metric(value: Option<&str>) -> Result<PhaseMetric, QueryError> {
    match present(value) {
        None => Ok(PhaseMetric::Current),
        Some(v) => PhaseMetric::from_label(v).ok_or_else(|| QueryError::new("metric", v)),
    }
}

pub fn parse_time_frame(value: Option<&str>) -> Result<TimeFrame, QueryError> {
    match present(value) {
        None => Ok(TimeFrame::Day),
        Some(v) => TimeFrame::from_query(v).ok_or_else(|| QueryError::new("time_frame", v)),
    }
}

/// Comma-separated phases in A, B, C order without repeats; `default` when absent.
pub fn parse_phases(value: Option<&str>, default: &[Phase]) -> Result<Vec<Phase>, QueryError> {
    let Some(list) = present(value) else {
        return Ok(default.to_vec());
    };

    let mut phases = list
        .split(',')
        .filter(|p| !p.trim().is_empty())
        .map(|p| Phase::parse(p).ok_or_else(|| QueryError::new("phases", p.trim())))
        .collect::<Result<Vec<_>, _>>()?;
    phases.sort();
    phases.dedup();

    if phases.is_empty() {
        return Err(QueryError::new("phases", list));
    }
    Ok(phases)
}

pub fn parse_phase(value: &str) -> Result<Phase, QueryError> {
    Phase::parse(value).ok_or_else(|| QueryError::new("phase", value))
}

pub fn parse_period(value: Option<&str>) -> Result<ConsumptionPeriod, QueryError> {
    match present(value) {
        None => Ok(ConsumptionPeriod::default()),
        Some(v) => ConsumptionPeriod::parse(v).ok_or_else(|| QueryError::new("period", v)),
    }
}

pub fn parse_peak_mode(value: Option<&str>) -> Result<PeakMode, QueryError> {
    match present(value) {
        None => Ok(PeakMode::default()),
        Some(v) => PeakMode::parse(v).ok_or_else(|| QueryError::new("mode", v)),
    }
}

pub fn parse_share_period(value: Option<&str>) -> Result<SharePeriod, QueryError> {
    match present(value) {
        None => Ok(SharePeriod::default()),
        Some(v) => SharePeriod::parse(v).ok_or_else(|| QueryError::new("period", v)),
    }
}

pub fn parse_generation_period(value: Option<&str>) -> Result<GenerationPeriod, QueryError> {
    match present(value) {
        None => Ok(GenerationPeriod::default()),
        Some(v) => GenerationPeriod::parse(v).ok_or_else(|| QueryError::new("period", v)),
    }
}

fn parse_date(param: &'static str, value: Option<&str>) -> Result<Option<NaiveDate>, QueryError> {
    present(value)
        .map(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|_| QueryError::new(param, v)))
        .transpose()
}

impl AlarmQuery {
    pub fn to_filter(&self) -> Result<AlarmFilter, QueryError> {
        let priority = present(self.priority.as_deref())
            .map(|p| Priority::parse(p).ok_or_else(|| QueryError::new("priority", p)))
            .transpose()?;

        Ok(AlarmFilter {
            search: present(self.search.as_deref()).map(str::to_string),
            priority,
            start: parse_date("start", self.start.as_deref())?,
            end: parse_date("end", self.end.as_deref())?,
        })
    }
}

impl HistoryParams {
    pub fn to_query(&self) -> Result<HistoryQuery, QueryError> {
        Ok(HistoryQuery {
            variable: present(self.variable.as_deref()).map(str::to_string),
            start: parse_date("start", self.start.as_deref())?,
            end: parse_date("end", self.end.as_deref())?,
        })
    }
}
