// Dashboard service - Use case for building tiles and cards from the latest snapshot
use crate::application::data_hub::DataHub;
use crate::domain::dashboard::{Dashboard, TileData};
use crate::domain::metrics::{phase_average, phase_shift, total_power};
use crate::domain::phase::{Phase, PhaseMetric};
use crate::domain::telemetry::PhaseSnapshot;
use std::sync::Arc;

pub const OVERVIEW_TITLE: &str = "Visão geral";

#[derive(Clone)]
pub struct DashboardService {
    hub: Arc<DataHub>,
}

impl DashboardService {
    pub fn new(hub: Arc<DataHub>) -> Self {
        Self { hub }
    }

    pub fn is_loading(&self) -> bool {
        self.hub.is_loading()
    }

    pub fn overview(&self) -> Dashboard {
        overview(self.hub.current().as_deref())
    }

    pub fn phase_cards(&self, phases: &[Phase]) -> Vec<TileData> {
        phase_cards(self.hub.current().as_deref(), phases)
    }

    pub fn angle_cards(&self, phase: Phase) -> Vec<TileData> {
        angle_cards(self.hub.current().as_deref(), phase)
    }

    pub fn general_cards(&self, dht_fallback: Option<f64>) -> Vec<TileData> {
        general_cards(self.hub.current().as_deref(), dht_fallback)
    }
}

fn read(snapshot: Option<&PhaseSnapshot>, field: &str) -> Option<f64> {
    snapshot.and_then(|s| s.number(field))
}

/// Voltage per phase plus total power.
pub fn overview(snapshot: Option<&PhaseSnapshot>) -> Dashboard {
    let mut tiles: Vec<TileData> = Phase::ALL
        .iter()
        .map(|phase| {
            TileData::voltage(
                &format!("tensao-{}", phase.to_string().to_lowercase()),
                &format!("Tensão {}", phase),
                read(snapshot, &PhaseMetric::Voltage.field(*phase)),
            )
        })
        .collect();

    tiles.push(TileData::fixed(
        "potencia",
        "Potência",
        "W",
        snapshot.and_then(total_power),
    ));

    Dashboard::new(OVERVIEW_TITLE, tiles)
}

/// Averages over `phases` for the four per-phase metrics.
pub fn phase_cards(snapshot: Option<&PhaseSnapshot>, phases: &[Phase]) -> Vec<TileData> {
    [
        (PhaseMetric::Current, "corrente"),
        (PhaseMetric::Voltage, "tensao"),
        (PhaseMetric::Power, "potencia"),
        (PhaseMetric::PowerFactor, "fator-potencia"),
    ]
    .into_iter()
    .map(|(metric, id)| {
        TileData::value(
            id,
            metric.label(),
            metric.unit(),
            snapshot.and_then(|s| phase_average(s, metric, phases)),
        )
    })
    .collect()
}

pub fn angle_cards(snapshot: Option<&PhaseSnapshot>, phase: Phase) -> Vec<TileData> {
    let current = read(snapshot, &phase.current_angle_field());
    let voltage = read(snapshot, &phase.voltage_angle_field());

    vec![
        TileData::angle("angulo-corrente", "Ângulo de Corrente", current),
        TileData::angle("angulo-tensao", "Ângulo de Tensão", voltage),
        TileData::angle("defasagem", "Defasagem", phase_shift(voltage, current)),
    ]
}

/// Site-wide tiles. Harmonic distortion comes from the snapshot when it
/// carries `dht`, otherwise from `dht_fallback`.
pub fn general_cards(snapshot: Option<&PhaseSnapshot>, dht_fallback: Option<f64>) -> Vec<TileData> {
    let dht = read(snapshot, "dht").or(dht_fallback);
    vec![
        TileData::fixed("potencia-direta", "Potência direta", "W", read(snapshot, "Pdir")),
        TileData::fixed("potencia-reversa", "Potência reversa", "W", read(snapshot, "Prev")),
        TileData::fixed("potencia-reativa", "Potência reativa", "Var", read(snapshot, "Q")),
        TileData::fixed("potencia-complexa", "Potência complexa", "VA", read(snapshot, "S")),
        TileData::value("corrente-neutro", "Corrente de neutro", Some("A"), read(snapshot, "In")),
        TileData::value("distorcao-harmonica", "Distorção harmônica", Some("%"), dht),
        TileData::value("frequencia", "Frequência", Some("Hz"), read(snapshot, "f")),
        TileData::value("fator-potencia-total", "Fator de potência total", None, read(snapshot, "fpt")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::RawValue;

    fn snapshot(fields: &[(&str, RawValue)]) -> PhaseSnapshot {
        PhaseSnapshot::new(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_overview_tiles() {
        let s = snapshot(&[
            ("Va", RawValue::Number(220.0)),
            ("Vb", RawValue::Text("198".to_string())),
            ("Pa", RawValue::Number(100.0)),
            ("Pb", RawValue::Number(50.5)),
        ]);
        let dashboard = overview(Some(&s));

        assert_eq!(dashboard.tiles.len(), 4);
        assert_eq!(dashboard.tiles[0].display, "220.00 V");
        let indicator = dashboard.tiles[1].indicator.as_ref().unwrap();
        assert!(indicator.decreasing);
        assert_eq!(indicator.display, "90.0%");
        assert_eq!(dashboard.tiles[2].display, "--");
        assert_eq!(dashboard.tiles[3].display, "150.50 W");
    }

    #[test]
    fn test_overview_without_snapshot_uses_placeholders() {
        let dashboard = overview(None);
        let displays: Vec<&str> = dashboard.tiles.iter().map(|t| t.display.as_str()).collect();
        assert_eq!(displays, vec!["--", "--", "--", "-- W"]);
    }

    #[test]
    fn test_phase_cards_average_selected_phases() {
        let s = snapshot(&[
            ("Ia", RawValue::Number(10.0)),
            ("Ib", RawValue::Number(12.0)),
            ("Ic", RawValue::Number(99.0)),
            ("fpa", RawValue::Number(0.9)),
            ("fpb", RawValue::Text("x".to_string())),
        ]);
        let cards = phase_cards(Some(&s), &[Phase::A, Phase::B]);

        assert_eq!(cards[0].value, Some(11.0));
        assert_eq!(cards[0].display, "11 A");
        assert_eq!(cards[1].display, "-- V");
        // Non-numeric phase B is skipped, not zeroed
        assert_eq!(cards[3].value, Some(0.9));
        assert_eq!(cards[3].display, "0.90");
    }

    #[test]
    fn test_angle_cards() {
        let s = snapshot(&[("angVa", RawValue::Number(170.0)), ("angIa", RawValue::Number(-170.0))]);
        let cards = angle_cards(Some(&s), Phase::A);

        assert_eq!(cards[0].display, "-170°");
        assert_eq!(cards[1].display, "170°");
        assert_eq!(cards[2].value, Some(-20.0));

        let missing = angle_cards(Some(&s), Phase::B);
        assert!(missing.iter().all(|c| c.display == "--"));
    }

    #[test]
    fn test_general_cards() {
        let s = snapshot(&[("Pdir", RawValue::Number(1234.5)), ("f", RawValue::Number(60.0))]);
        let cards = general_cards(Some(&s), None);

        assert_eq!(cards.len(), 8);
        assert_eq!(cards[0].display, "1234.50 W");
        assert_eq!(cards[1].display, "-- W");
        assert_eq!(cards[3].display, "-- VA");
        assert_eq!(cards[5].id, "distorcao-harmonica");
        assert_eq!(cards[5].display, "-- %");
        assert_eq!(cards[6].display, "60 Hz");
    }

    #[test]
    fn test_harmonic_distortion_prefers_the_snapshot() {
        let live = snapshot(&[("dht", RawValue::Number(4.25))]);
        assert_eq!(general_cards(Some(&live), Some(3.8))[5].value, Some(4.25));

        let without = snapshot(&[("f", RawValue::Number(60.0))]);
        assert_eq!(general_cards(Some(&without), Some(3.8))[5].display, "3.80 %");
        assert_eq!(general_cards(None, Some(3.8))[5].value, Some(3.8));
    }
}
