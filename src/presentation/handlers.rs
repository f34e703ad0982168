// HTTP request handlers
use crate::application::fixture_service::{GenerationSeries, WeekComparison, YearComparison};
use crate::domain::history::HistoryResult;
use crate::application::live_chart::ChartRequest;
use crate::domain::dashboard::{Dashboard, TileData};
use crate::domain::phase::Phase;
use crate::infrastructure::chunked_json::stream_from_receiver;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use crate::presentation::query::{
    parse_generation_period, parse_metric, parse_peak_mode, parse_period, parse_phase,
    parse_phases, parse_share_period, parse_time_frame, AlarmQuery, HistoryParams, PeakQuery,
    PeriodQuery, PhaseChartQuery, PhasesQuery, QueryError, SuggestionQuery, TimeFrameQuery,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct OverviewResponse {
    loading: bool,
    dashboard: Dashboard,
}

#[derive(Serialize)]
struct CardsResponse {
    loading: bool,
    cards: Vec<TileData>,
}

/// Every route of the service.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/overview", get(overview))
        .route("/overview/stream", get(stream_overview))
        .route("/phases/:phase/cards", get(phase_cards))
        .route("/phases/:phase/angles", get(angle_cards))
        .route("/general/cards", get(general_cards))
        .route("/charts/phase/stream", get(stream_phase_chart))
        .route("/charts/:id/stream", get(stream_configured_chart))
        .route("/consumption/phases", get(phase_consumption))
        .route("/consumption/phases/share", get(phase_share))
        .route("/consumption/peak", get(peak_consumption))
        .route("/consumption/weekly", get(weekly_consumption))
        .route("/alarms", get(list_alarms))
        .route("/alarms/suggestions", get(alarm_suggestions))
        .route("/generation", get(generation))
        .route("/history", get(history))
        .route("/history/suggestions", get(history_suggestions))
        .with_state(state)
}

async fn respond<T: Serialize>(data: &T, headers: &HeaderMap) -> Response {
    match json_response(data, accepts_brotli(headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn overview(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let body = OverviewResponse {
        loading: state.dashboard_service.is_loading(),
        dashboard: state.dashboard_service.overview(),
    };
    respond(&body, &headers).await
}

/// Overview tiles, re-sent on every new snapshot
pub async fn stream_overview(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let rx = state.streaming_service.stream_overview();
    stream_from_receiver(rx, accepts_brotli(&headers)).into_response()
}

/// Averaged per-phase cards; `phases` defaults to the path phase
pub async fn phase_cards(
    Path(phase): Path<String>,
    Query(query): Query<PhasesQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, QueryError> {
    let phase = parse_phase(&phase)?;
    let phases = parse_phases(query.phases.as_deref(), &[phase])?;

    let body = CardsResponse {
        loading: state.dashboard_service.is_loading(),
        cards: state.dashboard_service.phase_cards(&phases),
    };
    Ok(respond(&body, &headers).await)
}

pub async fn angle_cards(
    Path(phase): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, QueryError> {
    let phase = parse_phase(&phase)?;
    let body = CardsResponse {
        loading: state.dashboard_service.is_loading(),
        cards: state.dashboard_service.angle_cards(phase),
    };
    Ok(respond(&body, &headers).await)
}

pub async fn general_cards(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let dht = state
        .fixture_service
        .harmonic_distortion()
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Error loading general metrics: {}", e);
            None
        });
    let body = CardsResponse {
        loading: state.dashboard_service.is_loading(),
        cards: state.dashboard_service.general_cards(dht),
    };
    respond(&body, &headers).await
}

/// Live per-phase metric chart (progressive loading)
pub async fn stream_phase_chart(
    Query(query): Query<PhaseChartQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, QueryError> {
    let metric = parse_metric(query.metric.as_deref())?;
    let time_frame = parse_time_frame(query.time_frame.as_deref())?;
    let phases = parse_phases(query.phases.as_deref(), &Phase::ALL)?;

    let request = ChartRequest::phase_metric(metric, time_frame, &phases, state.max_points);
    tracing::info!(chart = %request.id, "Streaming phase chart");
    let rx = state.streaming_service.stream_chart(request);
    Ok(stream_from_receiver(rx, accepts_brotli(&headers)).into_response())
}

/// Live configured multi-series chart (progressive loading)
pub async fn stream_configured_chart(
    Path(id): Path<String>,
    Query(query): Query<TimeFrameQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, QueryError> {
    let time_frame = parse_time_frame(query.time_frame.as_deref())?;
    let Some(chart) = state.chart(&id) else {
        return Ok((StatusCode::NOT_FOUND, format!("unknown chart '{}'", id)).into_response());
    };

    let request = ChartRequest::from_config(chart, time_frame, state.max_points);
    tracing::info!(chart = %request.id, "Streaming configured chart");
    let rx = state.streaming_service.stream_chart(request);
    Ok(stream_from_receiver(rx, accepts_brotli(&headers)).into_response())
}

pub async fn phase_consumption(
    Query(query): Query<PeriodQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, QueryError> {
    let period = parse_period(query.period.as_deref())?;
    let series = state
        .fixture_service
        .phase_consumption(period)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Error loading phase consumption: {}", e);
            Vec::new()
        });
    Ok(respond(&series, &headers).await)
}

pub async fn phase_share(
    Query(query): Query<PeriodQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, QueryError> {
    let period = parse_share_period(query.period.as_deref())?;
    let shares = state.fixture_service.phase_share(period).await.unwrap_or_else(|e| {
        tracing::warn!("Error loading phase share: {}", e);
        Vec::new()
    });
    Ok(respond(&shares, &headers).await)
}

pub async fn peak_consumption(
    Query(query): Query<PeakQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, QueryError> {
    let mode = parse_peak_mode(query.mode.as_deref())?;
    let series = state
        .fixture_service
        .peak_consumption(mode)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Error loading peak consumption: {}", e);
            YearComparison {
                this_year: Vec::new(),
                last_year: Vec::new(),
            }
        });
    Ok(respond(&series, &headers).await)
}

pub async fn weekly_consumption(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let series = state
        .fixture_service
        .weekly_consumption()
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Error loading weekly consumption: {}", e);
            WeekComparison {
                this_week: Vec::new(),
                last_week: Vec::new(),
            }
        });
    respond(&series, &headers).await
}

pub async fn list_alarms(
    Query(query): Query<AlarmQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, QueryError> {
    let filter = query.to_filter()?;
    let alarms = state.alarm_service.search(&filter).await.unwrap_or_else(|e| {
        tracing::warn!("Error loading alarms: {}", e);
        Vec::new()
    });
    Ok(respond(&alarms, &headers).await)
}

pub async fn alarm_suggestions(
    Query(query): Query<SuggestionQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let suggestions = state
        .alarm_service
        .suggestions(query.q.as_deref().unwrap_or_default())
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Error loading alarm suggestions: {}", e);
            Vec::new()
        });
    respond(&suggestions, &headers).await
}

pub async fn generation(
    Query(query): Query<PeriodQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, QueryError> {
    let period = parse_generation_period(query.period.as_deref())?;
    let series = state.fixture_service.generation(period).await.unwrap_or_else(|e| {
        tracing::warn!("Error loading generation: {}", e);
        GenerationSeries {
            direta: Vec::new(),
            reversa: Vec::new(),
        }
    });
    Ok(respond(&series, &headers).await)
}

/// Readings of one variable, newest first, plus their chart series
pub async fn history(
    Query(params): Query<HistoryParams>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, QueryError> {
    let query = params.to_query()?;
    let result = state.history_service.search(&query).await.unwrap_or_else(|e| {
        tracing::warn!("Error loading history: {}", e);
        HistoryResult {
            entries: Vec::new(),
            series: Vec::new(),
        }
    });
    Ok(respond(&result, &headers).await)
}

pub async fn history_suggestions(
    Query(query): Query<SuggestionQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let suggestions = state
        .history_service
        .suggestions(query.q.as_deref().unwrap_or_default())
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Error loading history suggestions: {}", e);
            Vec::new()
        });
    respond(&suggestions, &headers).await
}
