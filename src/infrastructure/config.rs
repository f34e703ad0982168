// Service configuration: optional config/telemetry.toml layered with PHASE_TELEMETRY__* env vars
use chrono::FixedOffset;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "config/telemetry";
pub const ENV_PREFIX: &str = "PHASE_TELEMETRY";
pub const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub fixtures: FixturesConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default = "default_charts")]
    pub charts: Vec<ChartConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            refresh: RefreshConfig::default(),
            fixtures: FixturesConfig::default(),
            display: DisplayConfig::default(),
            charts: default_charts(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Firestore,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    pub project_id: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            project_id: None,
            api_key: None,
            collection: default_collection(),
            timestamp_field: default_timestamp_field(),
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    #[serde(default = "default_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,
    #[serde(default = "default_history_interval_ms")]
    pub history_interval_ms: u64,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: Option<u64>,
    #[serde(default = "default_max_points")]
    pub max_points: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_ms: default_snapshot_interval_ms(),
            history_interval_ms: default_history_interval_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            max_points: default_max_points(),
        }
    }
}

impl RefreshConfig {
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_interval_ms)
    }

    pub fn history_interval(&self) -> Duration {
        Duration::from_millis(self.history_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FixturesConfig {
    #[serde(default = "default_fixtures_dir")]
    pub dir: String,
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            dir: default_fixtures_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    /// Offset from UTC used for axis labels, in minutes.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

impl DisplayConfig {
    pub fn offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ChartConfig {
    pub id: String,
    pub title: String,
    pub unit: Option<String>,
    #[serde(default)]
    pub series: Vec<ChartSeriesConfig>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ChartSeriesConfig {
    pub name: String,
    pub field: String,
    pub color: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_collection() -> String {
    "dadosEnergia".to_string()
}

fn default_timestamp_field() -> String {
    "createdAt".to_string()
}

fn default_base_url() -> String {
    FIRESTORE_BASE_URL.to_string()
}

fn default_snapshot_interval_ms() -> u64 {
    5_000
}

fn default_history_interval_ms() -> u64 {
    30_000
}

fn default_fetch_timeout_ms() -> Option<u64> {
    Some(15_000)
}

fn default_max_points() -> usize {
    500
}

fn default_fixtures_dir() -> String {
    "fixtures".to_string()
}

fn default_utc_offset_minutes() -> i32 {
    -180
}

fn default_charts() -> Vec<ChartConfig> {
    let series = |name: &str, field: &str, color: &str| ChartSeriesConfig {
        name: name.to_string(),
        field: field.to_string(),
        color: Some(color.to_string()),
    };
    vec![ChartConfig {
        id: "potencias".to_string(),
        title: "Potências".to_string(),
        unit: None,
        series: vec![
            series("Potência Ativa", "Pdir", "#5750F1"),
            series("Potência Reativa", "Q", "#0ABEF9"),
            series("Potência Aparente", "S", "#F2994A"),
        ],
    }]
}

impl AppConfig {
    /// Reject configurations the service cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.store.backend == StoreBackend::Firestore
            && self.store.project_id.as_deref().is_none_or(|p| p.trim().is_empty())
        {
            anyhow::bail!("store.project_id is required for the firestore backend");
        }
        if self.refresh.snapshot_interval_ms == 0 || self.refresh.history_interval_ms == 0 {
            anyhow::bail!("refresh intervals must be greater than zero");
        }
        if self.refresh.max_points == 0 {
            anyhow::bail!("refresh.max_points must be greater than zero");
        }
        if self.display.offset().is_none() {
            anyhow::bail!(
                "display.utc_offset_minutes out of range: {}",
                self.display.utc_offset_minutes
            );
        }
        for chart in &self.charts {
            if chart.series.is_empty() {
                anyhow::bail!("chart '{}' has no series", chart.id);
            }
        }
        Ok(())
    }
}

/// Load from `config/telemetry.*` (optional) and the environment.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    load_app_config_from(DEFAULT_CONFIG_FILE)
}

pub fn load_app_config_from(file: &str) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(file).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let app: AppConfig = settings.try_deserialize()?;
    app.validate()?;
    Ok(app)
}
