// Static JSON fixtures standing in for data the store does not hold
use crate::domain::alarm::Alarm;
use crate::domain::history::{HistoryEntry, HistoryVariable};
use crate::domain::telemetry::{PhaseSnapshot, RawTimestamp, RawValue};
use crate::domain::timestamp;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

pub const PHASE_LINES_FILE: &str = "consumo-por-fase-linha.json";
pub const PEAK_FILE: &str = "consumo-ponta.json";
pub const OFF_PEAK_FILE: &str = "consumo-fora-ponta.json";
pub const WEEKLY_FILE: &str = "consumo-semanal.json";
pub const ALARMS_FILE: &str = "alarms.json";
pub const DEMO_SNAPSHOTS_FILE: &str = "demo-snapshots.json";
pub const SHARE_WEEKLY_FILE: &str = "consumo-por-fase-semanal.json";
pub const SHARE_MONTHLY_FILE: &str = "consumo-por-fase-mensal.json";
pub const GENERATION_FILE: &str = "geracao.json";
pub const GENERAL_METRICS_FILE: &str = "info-gerais-metricas.json";
pub const HISTORY_VARIABLES_FILE: &str = "historico-variaveis.json";
/// Recorded readings, one file per quantity.
pub const HISTORY_FILES: [&str; 5] = [
    "historico/corrente.json",
    "historico/tensao.json",
    "historico/fator_potencia.json",
    "historico/correnteNeutro.json",
    "historico/temperatura.json",
];

/// Label -> value, values may be numbers or numeric strings.
pub type LabeledValues = HashMap<String, RawValue>;

/// Per-phase consumption keyed by series name, one table per period.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhaseConsumptionLines {
    #[serde(default)]
    pub semanal: BTreeMap<String, LabeledValues>,
    #[serde(default)]
    pub diario: BTreeMap<String, LabeledValues>,
}

/// Monthly consumption for the current and previous year.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyConsumption {
    #[serde(default)]
    pub this_year: LabeledValues,
    #[serde(default)]
    pub last_year: LabeledValues,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationTable {
    #[serde(default)]
    pub week: LabeledValues,
    #[serde(default)]
    pub year: LabeledValues,
}

/// Forward and reverse generated energy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Generation {
    #[serde(default)]
    pub direta: GenerationTable,
    #[serde(default)]
    pub reversa: GenerationTable,
}

/// Site-wide figures the live documents do not carry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneralMetrics {
    #[serde(default)]
    pub dht: Option<RawValue>,
}

#[derive(Debug, Clone)]
pub struct FixtureStore {
    dir: PathBuf,
}

impl FixtureStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let bytes = tokio::fs::read(&path).await?;
        let value = serde_json::from_slice(&bytes)?;
        tracing::debug!("Loaded fixture {}", path.display());
        Ok(value)
    }

    pub async fn phase_consumption_lines(&self) -> Result<PhaseConsumptionLines> {
        self.load(PHASE_LINES_FILE).await
    }

    pub async fn peak_consumption(&self, off_peak: bool) -> Result<YearlyConsumption> {
        self.load(if off_peak { OFF_PEAK_FILE } else { PEAK_FILE }).await
    }

    pub async fn weekly_consumption(&self) -> Result<LabeledValues> {
        self.load(WEEKLY_FILE).await
    }

    pub async fn alarms(&self) -> Result<Vec<Alarm>> {
        self.load(ALARMS_FILE).await
    }

    /// Consumption share per phase, weekly or monthly totals.
    pub async fn phase_share(&self, monthly: bool) -> Result<BTreeMap<String, RawValue>> {
        self.load(if monthly { SHARE_MONTHLY_FILE } else { SHARE_WEEKLY_FILE }).await
    }

    pub async fn generation(&self) -> Result<Generation> {
        self.load(GENERATION_FILE).await
    }

    pub async fn general_metrics(&self) -> Result<GeneralMetrics> {
        self.load(GENERAL_METRICS_FILE).await
    }

    /// Every recorded reading across the history files, in file order.
    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        let mut entries = Vec::new();
        for name in HISTORY_FILES {
            let mut file: Vec<HistoryEntry> = self.load(name).await?;
            entries.append(&mut file);
        }
        Ok(entries)
    }

    pub async fn history_variables(&self) -> Result<Vec<HistoryVariable>> {
        self.load(HISTORY_VARIABLES_FILE).await
    }

    /// Flat store documents used to seed the in-memory backend.
    pub async fn demo_snapshots(&self, timestamp_field: &str) -> Result<Vec<PhaseSnapshot>> {
        let documents: Vec<Map<String, Value>> = self.load(DEMO_SNAPSHOTS_FILE).await?;
        Ok(documents
            .iter()
            .map(|d| PhaseSnapshot::from_json_object(d, timestamp_field))
            .collect())
    }
}

/// Shift recorded snapshots so the newest lands at `now_ms`, keeping their spacing.
/// Snapshots without a usable timestamp are left untouched.
pub fn replay_at(snapshots: &mut [PhaseSnapshot], now_ms: i64) {
    let Some(newest) = snapshots
        .iter()
        .filter_map(|s| timestamp::normalize_opt(s.created_at.as_ref()))
        .max()
    else {
        return;
    };
    let shift = now_ms - newest;
    for snapshot in snapshots.iter_mut() {
        if let Some(ms) = timestamp::normalize_opt(snapshot.created_at.as_ref()) {
            snapshot.created_at = Some(RawTimestamp::EpochMillis((ms + shift) as f64));
        }
    }
}
