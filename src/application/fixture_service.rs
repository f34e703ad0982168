// Fixture service - Categorical consumption series from static fixtures
use crate::domain::series::{categorical, HOUR_LABELS, MONTH_LABELS, WEEKDAY_LABELS};
use crate::domain::telemetry::{NamedSeries, RawValue, SeriesPoint};
use crate::error::Result;
use crate::infrastructure::fixtures::{FixtureStore, GenerationTable};
use serde::Serialize;

/// Reduction applied to this week's consumption to present last week's.
const LAST_WEEK_FACTOR: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsumptionPeriod {
    /// One point per weekday.
    #[default]
    Weekly,
    /// One point per hour of the day.
    Daily,
}

impl ConsumptionPeriod {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "semanal" => Some(ConsumptionPeriod::Weekly),
            "diario" | "diário" => Some(ConsumptionPeriod::Daily),
            _ => None,
        }
    }

    fn labels(self) -> &'static [&'static str] {
        match self {
            ConsumptionPeriod::Weekly => &WEEKDAY_LABELS,
            ConsumptionPeriod::Daily => &HOUR_LABELS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeakMode {
    #[default]
    Peak,
    OffPeak,
}

impl PeakMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "ponta" => Some(PeakMode::Peak),
            "fora ponta" | "fora-ponta" | "fora_ponta" => Some(PeakMode::OffPeak),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SharePeriod {
    #[default]
    Weekly,
    Monthly,
}

impl SharePeriod {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "semanal" => Some(SharePeriod::Weekly),
            "mensal" => Some(SharePeriod::Monthly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationPeriod {
    /// One point per weekday.
    #[default]
    Weekly,
    /// One point per month.
    Yearly,
}

impl GenerationPeriod {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "semanal" => Some(GenerationPeriod::Weekly),
            "anual" => Some(GenerationPeriod::Yearly),
            _ => None,
        }
    }
}

/// One slice of the per-phase consumption share.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseShare {
    pub name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSeries {
    pub direta: Vec<SeriesPoint>,
    pub reversa: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearComparison {
    pub this_year: Vec<SeriesPoint>,
    pub last_year: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekComparison {
    pub this_week: Vec<SeriesPoint>,
    pub last_week: Vec<SeriesPoint>,
}

#[derive(Debug, Clone)]
pub struct FixtureService {
    store: FixtureStore,
}

impl FixtureService {
    pub fn new(store: FixtureStore) -> Self {
        Self { store }
    }

    /// One series per fixture entry (e.g. `Fase A`), aligned to the period's labels.
    pub async fn phase_consumption(&self, period: ConsumptionPeriod) -> Result<Vec<NamedSeries>> {
        let lines = self.store.phase_consumption_lines().await?;
        let source = match period {
            ConsumptionPeriod::Weekly => lines.semanal,
            ConsumptionPeriod::Daily => lines.diario,
        };

        Ok(source
            .iter()
            .map(|(name, values)| NamedSeries::new(name.clone(), categorical(values, period.labels())))
            .collect())
    }

    pub async fn peak_consumption(&self, mode: PeakMode) -> Result<YearComparison> {
        let source = self.store.peak_consumption(mode == PeakMode::OffPeak).await?;
        Ok(YearComparison {
            this_year: categorical(&source.this_year, &MONTH_LABELS),
            last_year: categorical(&source.last_year, &MONTH_LABELS),
        })
    }

    pub async fn weekly_consumption(&self) -> Result<WeekComparison> {
        let source = self.store.weekly_consumption().await?;
        let this_week = categorical(&source, &WEEKDAY_LABELS);
        let last_week = this_week
            .iter()
            .map(|p| SeriesPoint {
                x: p.x.clone(),
                y: (p.y * LAST_WEEK_FACTOR * 100.0).round() / 100.0,
            })
            .collect();

        Ok(WeekComparison {
            this_week,
            last_week,
        })
    }

    /// Share of consumption per phase; unreadable amounts count as zero.
    pub async fn phase_share(&self, period: SharePeriod) -> Result<Vec<PhaseShare>> {
        let source = self.store.phase_share(period == SharePeriod::Monthly).await?;
        Ok(source
            .into_iter()
            .map(|(name, amount)| PhaseShare {
                name,
                amount: amount.as_number().unwrap_or(0.0),
            })
            .collect())
    }

    pub async fn generation(&self, period: GenerationPeriod) -> Result<GenerationSeries> {
        let source = self.store.generation().await?;
        let series = |table: &GenerationTable| match period {
            GenerationPeriod::Weekly => categorical(&table.week, &WEEKDAY_LABELS),
            GenerationPeriod::Yearly => categorical(&table.year, &MONTH_LABELS),
        };

        Ok(GenerationSeries {
            direta: series(&source.direta),
            reversa: series(&source.reversa),
        })
    }

    /// Total harmonic distortion (%) recorded for the site, if readable.
    pub async fn harmonic_distortion(&self) -> Result<Option<f64>> {
        let metrics = self.store.general_metrics().await?;
        Ok(metrics.dht.as_ref().and_then(RawValue::as_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fixtures::{
        GENERAL_METRICS_FILE, GENERATION_FILE, PEAK_FILE, PHASE_LINES_FILE, SHARE_MONTHLY_FILE,
        SHARE_WEEKLY_FILE, WEEKLY_FILE,
    };

    fn service_with(files: &[(&str, &str)]) -> (tempfile::TempDir, FixtureService) {
        let dir = tempfile::tempdir().unwrap();
        for (name, contents) in files {
            std::fs::write(dir.path().join(name), contents).unwrap();
        }
        let service = FixtureService::new(FixtureStore::new(dir.path()));
        (dir, service)
    }

    #[test]
    fn test_parse_query_values() {
        assert_eq!(ConsumptionPeriod::parse("diario"), Some(ConsumptionPeriod::Daily));
        assert_eq!(ConsumptionPeriod::parse("semanal"), Some(ConsumptionPeriod::Weekly));
        assert_eq!(ConsumptionPeriod::parse("mensal"), None);
        assert_eq!(PeakMode::parse("fora ponta"), Some(PeakMode::OffPeak));
        assert_eq!(PeakMode::parse("ponta"), Some(PeakMode::Peak));
    }

    #[tokio::test]
    async fn test_daily_lines_cover_every_hour() {
        let (_dir, service) = service_with(&[(
            PHASE_LINES_FILE,
            r#"{ "diario": { "Fase A": { "00": "1.5", "13": "bad" }, "Fase B": {} } }"#,
        )]);
        let series = service.phase_consumption(ConsumptionPeriod::Daily).await.unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].name, "Fase A");
        assert_eq!(series[0].data.len(), 24);
        assert_eq!(series[0].data[0], SeriesPoint::category("00", 1.5));
        assert_eq!(series[0].data[13].y, 0.0);
        assert!(series[1].data.iter().all(|p| p.y == 0.0));
    }

    #[tokio::test]
    async fn test_peak_consumption_months() {
        let (_dir, service) = service_with(&[(
            PEAK_FILE,
            r#"{ "thisYear": { "Janeiro": "120", "Dezembro": 80 }, "lastYear": { "Marco": "10" } }"#,
        )]);
        let peak = service.peak_consumption(PeakMode::Peak).await.unwrap();

        assert_eq!(peak.this_year.len(), 12);
        assert_eq!(peak.this_year[0], SeriesPoint::category("Janeiro", 120.0));
        assert_eq!(peak.this_year[11].y, 80.0);
        assert_eq!(peak.last_year[2], SeriesPoint::category("Marco", 10.0));
        assert!(service.peak_consumption(PeakMode::OffPeak).await.is_err());
    }

    #[tokio::test]
    async fn test_last_week_is_scaled() {
        let (_dir, service) = service_with(&[(WEEKLY_FILE, r#"{ "Seg": "10", "Ter": "3.33" }"#)]);
        let weekly = service.weekly_consumption().await.unwrap();

        assert_eq!(weekly.this_week[1].y, 3.33);
        assert_eq!(weekly.last_week[0].y, 9.0);
        assert_eq!(weekly.last_week[1].y, 3.0);
    }

    #[tokio::test]
    async fn test_phase_share_per_period() {
        let (_dir, service) = service_with(&[
            (SHARE_WEEKLY_FILE, r#"{ "Fase B": "31.5", "Fase A": 40, "Fase C": "n/d" }"#),
            (SHARE_MONTHLY_FILE, r#"{ "Fase A": "900" }"#),
        ]);

        let weekly = service.phase_share(SharePeriod::Weekly).await.unwrap();
        assert_eq!(
            weekly,
            vec![
                PhaseShare { name: "Fase A".to_string(), amount: 40.0 },
                PhaseShare { name: "Fase B".to_string(), amount: 31.5 },
                PhaseShare { name: "Fase C".to_string(), amount: 0.0 },
            ]
        );
        let monthly = service.phase_share(SharePeriod::Monthly).await.unwrap();
        assert_eq!(monthly[0].amount, 900.0);
        assert_eq!(SharePeriod::parse("diario"), None);
    }

    #[tokio::test]
    async fn test_generation_follows_period_labels() {
        let (_dir, service) = service_with(&[(
            GENERATION_FILE,
            r#"{ "direta": { "week": { "Seg": "12", "Dom": 3 }, "year": { "Maio": "410" } },
                 "reversa": { "week": { "Qua": "1.5" } } }"#,
        )]);

        let weekly = service.generation(GenerationPeriod::Weekly).await.unwrap();
        assert_eq!(weekly.direta.len(), 7);
        assert_eq!(weekly.direta[0], SeriesPoint::category("Seg", 12.0));
        assert_eq!(weekly.direta[6].y, 3.0);
        assert_eq!(weekly.reversa[2], SeriesPoint::category("Qua", 1.5));

        let yearly = service.generation(GenerationPeriod::Yearly).await.unwrap();
        assert_eq!(yearly.direta.len(), 12);
        assert_eq!(yearly.direta[4], SeriesPoint::category("Maio", 410.0));
        assert!(yearly.reversa.iter().all(|p| p.y == 0.0));
        assert_eq!(GenerationPeriod::parse("anual"), Some(GenerationPeriod::Yearly));
    }

    #[tokio::test]
    async fn test_harmonic_distortion_reading() {
        let (_dir, service) = service_with(&[(GENERAL_METRICS_FILE, r#"{ "dht": "3.8" }"#)]);
        assert_eq!(service.harmonic_distortion().await.unwrap(), Some(3.8));

        let (_dir, service) = service_with(&[(GENERAL_METRICS_FILE, r#"{ "dht": "--" }"#)]);
        assert_eq!(service.harmonic_distortion().await.unwrap(), None);
    }
}
