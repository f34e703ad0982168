// Dashboard domain model: summary tiles rendered from a snapshot
use super::metrics::{voltage_color, voltage_percent, BASE_VOLTAGE};
use serde::Serialize;

pub const PLACEHOLDER: &str = "--";

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub title: String,
    pub tiles: Vec<TileData>,
}

impl Dashboard {
    pub fn new(title: impl Into<String>, tiles: Vec<TileData>) -> Self {
        Self {
            title: title.into(),
            tiles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileIndicator {
    pub display: String,
    pub decreasing: bool,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileData {
    pub id: String,
    pub title: String,
    pub unit: Option<String>,
    pub value: Option<f64>,
    pub display: String,
    pub indicator: Option<TileIndicator>,
}

impl TileData {
    /// Plain value tile: integers print as-is, others with two decimals.
    pub fn value(id: &str, title: &str, unit: Option<&str>, value: Option<f64>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            unit: unit.map(str::to_string),
            value,
            display: with_unit(value.map(format_number), unit),
            indicator: None,
        }
    }

    /// Power-style tile: always two decimals.
    pub fn fixed(id: &str, title: &str, unit: &str, value: Option<f64>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            unit: Some(unit.to_string()),
            value,
            display: with_unit(value.map(|v| format!("{:.2}", v)), Some(unit)),
            indicator: None,
        }
    }

    /// Voltage tile with its deviation indicator against the 220 V base.
    pub fn voltage(id: &str, title: &str, value: Option<f64>) -> Self {
        let Some(volts) = value else {
            return Self {
                id: id.to_string(),
                title: title.to_string(),
                unit: Some("V".to_string()),
                value: None,
                display: PLACEHOLDER.to_string(),
                indicator: None,
            };
        };

        Self {
            id: id.to_string(),
            title: title.to_string(),
            unit: Some("V".to_string()),
            value: Some(volts),
            display: format!("{:.2} V", volts),
            indicator: Some(TileIndicator {
                display: format!("{:.1}%", voltage_percent(volts)),
                decreasing: volts < BASE_VOLTAGE,
                color: voltage_color(volts),
            }),
        }
    }

    pub fn angle(id: &str, title: &str, value: Option<f64>) -> Self {
        let display = match value {
            Some(degrees) if degrees.fract() == 0.0 => format!("{}°", degrees),
            Some(degrees) => format!("{:.1}°", degrees),
            None => PLACEHOLDER.to_string(),
        };
        Self {
            id: id.to_string(),
            title: title.to_string(),
            unit: Some("°".to_string()),
            value,
            display,
            indicator: None,
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn with_unit(formatted: Option<String>, unit: Option<&str>) -> String {
    let value = formatted.unwrap_or_else(|| PLACEHOLDER.to_string());
    match unit {
        Some(unit) => format!("{} {}", value, unit),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voltage_tile() {
        let tile = TileData::voltage("va", "Tensão A", Some(198.0));
        assert_eq!(tile.display, "198.00 V");
        let indicator = tile.indicator.unwrap();
        assert_eq!(indicator.display, "90.0%");
        assert!(indicator.decreasing);
        assert_eq!(indicator.color, "hsl(0 80% 40%)");

        let nominal = TileData::voltage("va", "Tensão A", Some(220.0)).indicator.unwrap();
        assert_eq!(nominal.display, "100.0%");
        assert!(!nominal.decreasing);
        assert_eq!(nominal.color, "hsl(120 80% 40%)");

        let missing = TileData::voltage("vb", "Tensão B", None);
        assert_eq!(missing.display, "--");
        assert!(missing.indicator.is_none());
    }

    #[test]
    fn test_value_formatting() {
        assert_eq!(TileData::value("i", "Corrente", Some("A"), Some(5.0)).display, "5 A");
        assert_eq!(TileData::value("i", "Corrente", Some("A"), Some(5.456)).display, "5.46 A");
        assert_eq!(TileData::value("fp", "Fator", None, Some(0.92)).display, "0.92");
        assert_eq!(TileData::value("fp", "Fator", None, None).display, "--");
        assert_eq!(TileData::value("p", "Potência", Some("W"), None).display, "-- W");
        assert_eq!(TileData::fixed("p", "Potência", "W", Some(1500.0)).display, "1500.00 W");
    }

    #[test]
    fn test_angle_formatting() {
        assert_eq!(TileData::angle("s", "Defasagem", Some(20.0)).display, "20°");
        assert_eq!(TileData::angle("s", "Defasagem", Some(-12.345)).display, "-12.3°");
        assert_eq!(TileData::angle("s", "Defasagem", None).display, "--");
    }
}
