// Live chart - Reactive (metric, window, phases) -> NamedSeries[] producer
use crate::application::series_board::SeriesBoard;
use crate::application::subscriber::{SeriesSubscriber, SubscriptionHandle, SubscriptionSpec};
use crate::domain::phase::{Phase, PhaseMetric, TimeFrame, TimeWindow};
use crate::domain::telemetry::{ChartSkeleton, NamedSeries, SeriesSkeleton};
use crate::infrastructure::config::ChartConfig;
use std::sync::Arc;

const SINGLE_SERIES_COLOR: &str = "#5750F1";

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSource {
    pub name: String,
    pub variable: String,
    pub color: Option<String>,
}

/// Everything that determines a chart's subscriptions.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub id: String,
    pub title: String,
    pub unit: Option<String>,
    pub sources: Vec<SeriesSource>,
    pub window: TimeWindow,
    pub max_points: usize,
}

impl ChartRequest {
    /// One series per selected phase for a per-phase metric.
    pub fn phase_metric(
        metric: PhaseMetric,
        time_frame: TimeFrame,
        phases: &[Phase],
        max_points: usize,
    ) -> Self {
        let multi = phases.len() > 1;
        let sources = phases
            .iter()
            .map(|phase| SeriesSource {
                name: if multi {
                    format!("Fase {}", phase)
                } else {
                    metric.label().to_string()
                },
                variable: metric.field(*phase),
                color: Some(
                    if multi { phase.color() } else { SINGLE_SERIES_COLOR }.to_string(),
                ),
            })
            .collect();

        let phase_ids: Vec<String> = phases.iter().map(Phase::to_string).collect();
        Self {
            id: format!("phase-{:?}-{}", metric, phase_ids.join("")).to_lowercase(),
            title: format!("{} ({})", metric.label(), time_frame.label()),
            unit: metric.unit().map(str::to_string),
            sources,
            window: time_frame.window(),
            max_points,
        }
    }

    /// A configured multi-variable chart.
    pub fn from_config(chart: &ChartConfig, time_frame: TimeFrame, max_points: usize) -> Self {
        Self {
            id: chart.id.clone(),
            title: format!("{} ({})", chart.title, time_frame.label()),
            unit: chart.unit.clone(),
            sources: chart
                .series
                .iter()
                .map(|s| SeriesSource {
                    name: s.name.clone(),
                    variable: s.field.clone(),
                    color: s.color.clone(),
                })
                .collect(),
            window: time_frame.window(),
            max_points,
        }
    }

    pub fn skeleton(&self) -> ChartSkeleton {
        ChartSkeleton {
            id: self.id.clone(),
            title: self.title.clone(),
            unit: self.unit.clone(),
            series: self
                .sources
                .iter()
                .map(|s| SeriesSkeleton {
                    name: s.name.clone(),
                    color: s.color.clone(),
                })
                .collect(),
        }
    }
}

/// Owns one subscription per series of the current request and writes each
/// into its own board slot.
pub struct LiveChart {
    subscriber: SeriesSubscriber,
    board: Arc<SeriesBoard>,
    handles: Vec<SubscriptionHandle>,
    request: Option<ChartRequest>,
}

impl LiveChart {
    pub fn new(subscriber: SeriesSubscriber) -> Self {
        Self {
            subscriber,
            board: Arc::new(SeriesBoard::new()),
            handles: Vec::new(),
            request: None,
        }
    }

    pub fn board(&self) -> Arc<SeriesBoard> {
        self.board.clone()
    }

    pub fn request(&self) -> Option<&ChartRequest> {
        self.request.as_ref()
    }

    pub fn series(&self) -> Vec<NamedSeries> {
        self.board.snapshot()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.handles.iter().filter(|h| h.is_active()).count()
    }

    /// Switch to `request`. The previous subscriptions are fully torn down
    /// before any new one starts; an unchanged request is a no-op.
    pub fn configure(&mut self, request: ChartRequest) {
        if self.request.as_ref() == Some(&request) {
            return;
        }

        self.teardown();
        self.board
            .reset(request.sources.iter().map(|s| s.name.clone()).collect());

        for (index, source) in request.sources.iter().enumerate() {
            let board = self.board.clone();
            let spec = SubscriptionSpec {
                variable: source.variable.clone(),
                window: request.window,
                max_points: request.max_points,
            };
            let handle = self.subscriber.subscribe(spec, move |points| {
                board.update_slot(index, points);
            });
            self.handles.push(handle);
        }

        tracing::debug!(chart = %request.id, series = request.sources.len(), "Chart configured");
        self.request = Some(request);
    }

    pub fn teardown(&mut self) {
        for handle in self.handles.drain(..) {
            handle.cancel();
        }
        self.request = None;
    }
}

impl Drop for LiveChart {
    fn drop(&mut self) {
        self.teardown();
    }
}
