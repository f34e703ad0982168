// Telemetry data domain models
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A moment in time as it arrived from the store, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTimestamp {
    /// Known to be epoch milliseconds (e.g. a store timestamp's millis accessor).
    EpochMillis(f64),
    /// Known to be epoch seconds.
    EpochSeconds(f64),
    /// A bare number of unknown unit; scale is inferred from magnitude.
    Numeric(f64),
    /// ISO-8601 text or a numeric string.
    Text(String),
    DateTime(DateTime<Utc>),
    /// Store-native `{seconds, nanoseconds}` pair.
    Structured { seconds: i64, nanos: i64 },
}

impl RawTimestamp {
    /// Classify a loosely-typed JSON value at the ingestion boundary.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(RawTimestamp::Numeric),
            Value::String(s) => Some(RawTimestamp::Text(s.clone())),
            Value::Object(map) => {
                let seconds = map
                    .get("seconds")
                    .or_else(|| map.get("_seconds"))
                    .and_then(json_integer)?;
                let nanos = map
                    .get("nanoseconds")
                    .or_else(|| map.get("_nanoseconds"))
                    .and_then(json_integer)
                    .unwrap_or(0);
                Some(RawTimestamp::Structured { seconds, nanos })
            }
            _ => None,
        }
    }
}

fn json_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A reading's value as delivered: numeric, textual, or absent.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
#[serde(untagged, from = "serde_json::Value")]
pub enum RawValue {
    Number(f64),
    Text(String),
    Missing,
}

impl RawValue {
    /// Finite numeric interpretation, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) if n.is_finite() => Some(*n),
            RawValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(n) => n.as_f64().map(RawValue::Number).unwrap_or(RawValue::Missing),
            Value::String(s) => RawValue::Text(s),
            _ => RawValue::Missing,
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// One telemetry reading for one variable.
#[derive(Debug, Clone)]
pub struct Sample {
    pub variable: String,
    pub timestamp: Option<RawTimestamp>,
    pub value: RawValue,
}

impl Sample {
    pub fn new(variable: impl Into<String>, timestamp: Option<RawTimestamp>, value: RawValue) -> Self {
        Self {
            variable: variable.into(),
            timestamp,
            value,
        }
    }
}

/// X coordinate of a chart point: epoch millis or a category label.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AxisValue {
    Time(i64),
    Category(String),
}

impl AxisValue {
    pub fn as_time(&self) -> Option<i64> {
        match self {
            AxisValue::Time(ms) => Some(*ms),
            AxisValue::Category(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: AxisValue,
    pub y: f64,
}

impl SeriesPoint {
    pub fn time(time_ms: i64, y: f64) -> Self {
        Self {
            x: AxisValue::Time(time_ms),
            y,
        }
    }

    pub fn category(label: impl Into<String>, y: f64) -> Self {
        Self {
            x: AxisValue::Category(label.into()),
            y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedSeries {
    pub name: String,
    pub data: Vec<SeriesPoint>,
}

impl NamedSeries {
    pub fn new(name: impl Into<String>, data: Vec<SeriesPoint>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }
}

/// Latest full reading across all monitored variables.
///
/// Replaced wholesale on every update; never merged field by field.
#[derive(Debug, Clone, Default)]
pub struct PhaseSnapshot {
    pub id: Option<String>,
    pub created_at: Option<RawTimestamp>,
    pub fields: BTreeMap<String, RawValue>,
}

impl PhaseSnapshot {
    pub fn new(fields: BTreeMap<String, RawValue>) -> Self {
        Self {
            id: None,
            created_at: None,
            fields,
        }
    }

    /// Build from a flat JSON object, lifting `timestamp_field` out as the creation time.
    pub fn from_json_object(object: &serde_json::Map<String, Value>, timestamp_field: &str) -> Self {
        let created_at = object.get(timestamp_field).and_then(RawTimestamp::from_json);
        let id = object.get("id").and_then(Value::as_str).map(str::to_string);
        let fields = object
            .iter()
            .filter(|(key, _)| key.as_str() != timestamp_field && key.as_str() != "id")
            .map(|(key, value)| (key.clone(), RawValue::from(value.clone())))
            .collect();

        Self {
            id,
            created_at,
            fields,
        }
    }

    /// Numeric value of a field; `None` when absent or non-numeric.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(RawValue::as_number)
    }
}

/// Skeleton of a multi-series chart, sent before any data arrives.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSkeleton {
    pub id: String,
    pub title: String,
    pub unit: Option<String>,
    pub series: Vec<SeriesSkeleton>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesSkeleton {
    pub name: String,
    pub color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_value_coercion() {
        assert_eq!(RawValue::from(json!(219.8)).as_number(), Some(219.8));
        assert_eq!(RawValue::from(json!(" 220.5 ")).as_number(), Some(220.5));
        assert_eq!(RawValue::from(json!("bad")).as_number(), None);
        assert_eq!(RawValue::from(json!(null)).as_number(), None);
        assert_eq!(RawValue::from(json!(true)), RawValue::Missing);
        assert_eq!(RawValue::Number(f64::NAN).as_number(), None);
    }

    #[test]
    fn test_timestamp_classification() {
        assert_eq!(
            RawTimestamp::from_json(&json!(1_700_000_000)),
            Some(RawTimestamp::Numeric(1_700_000_000.0))
        );
        assert_eq!(
            RawTimestamp::from_json(&json!({"seconds": 10, "nanoseconds": 5_000_000})),
            Some(RawTimestamp::Structured { seconds: 10, nanos: 5_000_000 })
        );
        assert_eq!(
            RawTimestamp::from_json(&json!({"_seconds": 10})),
            Some(RawTimestamp::Structured { seconds: 10, nanos: 0 })
        );
        assert_eq!(RawTimestamp::from_json(&json!({"foo": 1})), None);
        assert_eq!(RawTimestamp::from_json(&json!(null)), None);
    }

    #[test]
    fn test_snapshot_from_object() {
        let object = json!({
            "id": "doc-1",
            "createdAt": "2024-05-01T12:00:00Z",
            "Va": 221.3,
            "Ia": "4.5",
            "Pdir": null
        });
        let snapshot = PhaseSnapshot::from_json_object(object.as_object().unwrap(), "createdAt");

        assert_eq!(snapshot.id.as_deref(), Some("doc-1"));
        assert_eq!(
            snapshot.created_at,
            Some(RawTimestamp::Text("2024-05-01T12:00:00Z".to_string()))
        );
        assert_eq!(snapshot.number("Va"), Some(221.3));
        assert_eq!(snapshot.number("Ia"), Some(4.5));
        assert_eq!(snapshot.number("Pdir"), None);
        assert!(!snapshot.fields.contains_key("createdAt"));
    }
}
