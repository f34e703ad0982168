// Application state for HTTP handlers
use crate::application::alarm_service::AlarmService;
use crate::application::dashboard_service::DashboardService;
use crate::application::fixture_service::FixtureService;
use crate::application::history_service::HistoryService;
use crate::application::streaming_service::StreamingService;
use crate::infrastructure::config::ChartConfig;

#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: DashboardService,
    pub streaming_service: StreamingService,
    pub fixture_service: FixtureService,
    pub alarm_service: AlarmService,
    pub history_service: HistoryService,
    pub charts: Vec<ChartConfig>,
    pub max_points: usize,
}

impl AppState {
    pub fn chart(&self, id: &str) -> Option<&ChartConfig> {
        self.charts.iter().find(|c| c.id == id)
    }
}
