// Three-phase vocabulary: phases, metrics, field names and time windows
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Phase {
    A,
    B,
    C,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::A, Phase::B, Phase::C];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Phase::A),
            "B" => Some(Phase::B),
            "C" => Some(Phase::C),
            _ => None,
        }
    }

    fn suffix(self) -> char {
        match self {
            Phase::A => 'a',
            Phase::B => 'b',
            Phase::C => 'c',
        }
    }

    pub fn voltage_angle_field(self) -> String {
        format!("angV{}", self.suffix())
    }

    pub fn current_angle_field(self) -> String {
        format!("angI{}", self.suffix())
    }

    /// Chart colour used when several phases share a chart.
    pub fn color(self) -> &'static str {
        match self {
            Phase::A => "#5750F1",
            Phase::B => "#0ABEF9",
            Phase::C => "#F2994A",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Phase::A => "A",
            Phase::B => "B",
            Phase::C => "C",
        };
        f.write_str(letter)
    }
}

/// Per-phase quantity with its own store field per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PhaseMetric {
    Current,
    Voltage,
    Power,
    PowerFactor,
    Energy,
}

impl PhaseMetric {
    /// Store field holding this metric for `phase` (e.g. `Va`, `Ib`, `fpc`).
    pub fn field(self, phase: Phase) -> String {
        let prefix = match self {
            PhaseMetric::Current => "I",
            PhaseMetric::Voltage => "V",
            PhaseMetric::Power => "P",
            PhaseMetric::PowerFactor => "fp",
            PhaseMetric::Energy => "E",
        };
        format!("{}{}", prefix, phase.suffix())
    }

    pub fn label(self) -> &'static str {
        match self {
            PhaseMetric::Current => "Corrente",
            PhaseMetric::Voltage => "Tensão",
            PhaseMetric::Power => "Potência",
            PhaseMetric::PowerFactor => "Fator de Potência",
            PhaseMetric::Energy => "Energia",
        }
    }

    pub fn unit(self) -> Option<&'static str> {
        match self {
            PhaseMetric::Current => Some("A"),
            PhaseMetric::Voltage => Some("V"),
            PhaseMetric::Power => Some("W"),
            PhaseMetric::PowerFactor => None,
            PhaseMetric::Energy => Some("kWh"),
        }
    }

    /// Accepts the dashboard's picker labels, with or without accents.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Corrente" | "corrente" => Some(PhaseMetric::Current),
            "Tensão" | "Tensao" | "tensao" => Some(PhaseMetric::Voltage),
            "Potência" | "Potencia" | "potencia" => Some(PhaseMetric::Power),
            "Fator de Potência" | "Fator de Potencia" | "fator_potencia" => {
                Some(PhaseMetric::PowerFactor)
            }
            "Energia" | "energia" => Some(PhaseMetric::Energy),
            _ => None,
        }
    }
}

/// Named period selectable from the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFrame {
    Day,
    Week,
}

impl TimeFrame {
    pub fn from_query(value: &str) -> Option<Self> {
        match value.trim() {
            "diario" | "diário" | "day" => Some(TimeFrame::Day),
            "semanal" | "week" => Some(TimeFrame::Week),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeFrame::Day => "diário",
            TimeFrame::Week => "semanal",
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            TimeFrame::Day => Duration::days(1),
            TimeFrame::Week => Duration::days(7),
        }
    }

    pub fn window(self) -> TimeWindow {
        TimeWindow::Trailing(self.duration())
    }
}

/// Bounds of a history query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    Fixed {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
    /// Ends at the moment of each fetch.
    Trailing(Duration),
}

impl TimeWindow {
    /// Concrete `(start, end)` as of `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match self {
            TimeWindow::Fixed { start, end } => (*start, *end),
            TimeWindow::Trailing(length) => (Some(now - *length), Some(now)),
        }
    }
}
