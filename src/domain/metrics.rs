// Derived metrics computed on demand from the latest snapshot
use super::phase::{Phase, PhaseMetric};
use super::telemetry::PhaseSnapshot;

pub const BASE_VOLTAGE: f64 = 220.0;
pub const MAX_DEVIATION_RATIO: f64 = 0.1;

/// `|value - 220| / 220`
pub fn voltage_deviation_ratio(value: f64) -> f64 {
    (value - BASE_VOLTAGE).abs() / BASE_VOLTAGE
}

/// 120 (green) at nominal voltage down to 0 (red) at 10% deviation or more.
pub fn voltage_hue(value: f64) -> f64 {
    let clamped = voltage_deviation_ratio(value).min(MAX_DEVIATION_RATIO);
    120.0 - (clamped / MAX_DEVIATION_RATIO) * 120.0
}

pub fn voltage_color(value: f64) -> String {
    format!("hsl({} 80% 40%)", voltage_hue(value))
}

/// Percentage of the nominal voltage.
pub fn voltage_percent(value: f64) -> f64 {
    value / BASE_VOLTAGE * 100.0
}

/// Wrap any angle into `[0, 360)`.
pub fn normalize_degrees(value: f64) -> f64 {
    ((value % 360.0) + 360.0) % 360.0
}

/// Voltage angle minus current angle, wrapped into `(-180, 180]`.
pub fn phase_shift(voltage_angle: Option<f64>, current_angle: Option<f64>) -> Option<f64> {
    let voltage = voltage_angle.filter(|v| v.is_finite())?;
    let current = current_angle.filter(|c| c.is_finite())?;

    let diff = normalize_degrees(voltage) - normalize_degrees(current);
    let wrapped = if diff > 180.0 {
        diff - 360.0
    } else if diff <= -180.0 {
        diff + 360.0
    } else {
        diff
    };
    Some(wrapped)
}

/// Phase shift for one phase, read from its angle fields.
pub fn phase_shift_for(snapshot: &PhaseSnapshot, phase: Phase) -> Option<f64> {
    phase_shift(
        snapshot.number(&phase.voltage_angle_field()),
        snapshot.number(&phase.current_angle_field()),
    )
}

/// Mean of `metric` over the phases that report a usable value.
pub fn phase_average(snapshot: &PhaseSnapshot, metric: PhaseMetric, phases: &[Phase]) -> Option<f64> {
    let values: Vec<f64> = phases
        .iter()
        .filter_map(|phase| snapshot.number(&metric.field(*phase)))
        .collect();

    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// `Pdir` when present, otherwise the sum of the reporting per-phase powers.
pub fn total_power(snapshot: &PhaseSnapshot) -> Option<f64> {
    if let Some(direct) = snapshot.number("Pdir") {
        return Some(direct);
    }

    let reported: Vec<f64> = Phase::ALL
        .iter()
        .filter_map(|phase| snapshot.number(&PhaseMetric::Power.field(*phase)))
        .collect();

    if reported.is_empty() {
        None
    } else {
        Some(reported.iter().sum())
    }
}
