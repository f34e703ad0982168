// Firestore repository implementation (REST runQuery)
use crate::application::telemetry_repository::TelemetryRepository;
use crate::domain::telemetry::{PhaseSnapshot, RawTimestamp, RawValue, Sample};
use crate::error::{Result, TelemetryError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct FirestoreRepository {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    api_key: Option<String>,
    collection: String,
    timestamp_field: String,
}

/// One element of a runQuery response; elements without `document` only carry read metadata.
#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<FirestoreDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
    #[serde(default)]
    create_time: Option<String>,
}

impl FirestoreRepository {
    pub fn new(
        base_url: String,
        project_id: String,
        api_key: Option<String>,
        collection: String,
        timestamp_field: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id,
            api_key,
            collection,
            timestamp_field,
        }
    }

    fn build_query_url(&self) -> String {
        let mut url = format!(
            "{}/projects/{}/databases/(default)/documents:runQuery",
            self.base_url, self.project_id
        );
        if let Some(key) = &self.api_key {
            url.push_str("?key=");
            url.push_str(&urlencoding::encode(key));
        }
        url
    }

    /// Newest-first structured query over the collection, optionally windowed and projected.
    fn structured_query(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: usize,
        fields: Option<&[&str]>,
    ) -> Value {
        let mut query = json!({
            "from": [{ "collectionId": self.collection }],
            "orderBy": [{
                "field": { "fieldPath": self.timestamp_field },
                "direction": "DESCENDING"
            }],
            "limit": limit,
        });

        let mut filters = Vec::new();
        if let Some(start) = start {
            filters.push(self.time_filter("GREATER_THAN_OR_EQUAL", start));
        }
        if let Some(end) = end {
            filters.push(self.time_filter("LESS_THAN_OR_EQUAL", end));
        }
        let filter = match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(json!({ "compositeFilter": { "op": "AND", "filters": filters } })),
        };
        if let Some(filter) = filter {
            query["where"] = filter;
        }

        if let Some(fields) = fields {
            let paths: Vec<Value> = fields
                .iter()
                .map(|f| json!({ "fieldPath": quote_field_path(f) }))
                .collect();
            query["select"] = json!({ "fields": paths });
        }

        json!({ "structuredQuery": query })
    }

    fn time_filter(&self, op: &str, at: DateTime<Utc>) -> Value {
        json!({
            "fieldFilter": {
                "field": { "fieldPath": self.timestamp_field },
                "op": op,
                "value": { "timestampValue": at.to_rfc3339_opts(SecondsFormat::Millis, true) }
            }
        })
    }

    async fn run_query(&self, body: &Value) -> Result<Vec<FirestoreDocument>> {
        let response = self
            .client
            .post(self.build_query_url())
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TelemetryError::Status { status, body });
        }

        let items: Vec<RunQueryItem> = response.json().await?;
        Ok(items.into_iter().filter_map(|item| item.document).collect())
    }

    fn to_snapshot(&self, document: FirestoreDocument) -> PhaseSnapshot {
        let id = document.name.rsplit('/').next().map(str::to_string);
        let mut created_at = None;
        let mut fields = BTreeMap::new();

        for (key, value) in &document.fields {
            if *key == self.timestamp_field {
                created_at = decode_timestamp(value);
            } else {
                fields.insert(key.clone(), decode_value(value));
            }
        }
        // Documents written without the field still have a server creation time
        if created_at.is_none() {
            created_at = document.create_time.map(RawTimestamp::Text);
        }

        PhaseSnapshot {
            id,
            created_at,
            fields,
        }
    }
}

/// Firestore quotes field paths that are not plain identifiers.
fn quote_field_path(field: &str) -> String {
    let simple = field
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        field.to_string()
    } else {
        format!("`{}`", field.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Map a typed Firestore value onto a reading value.
fn decode_value(value: &Value) -> RawValue {
    let Some(object) = value.as_object() else {
        return RawValue::from(value.clone());
    };

    if let Some(v) = object.get("doubleValue") {
        return RawValue::from(v.clone());
    }
    if let Some(v) = object.get("integerValue") {
        // int64 travels as a JSON string
        return match v {
            Value::String(s) => s.parse::<f64>().map(RawValue::Number).unwrap_or(RawValue::Missing),
            other => RawValue::from(other.clone()),
        };
    }
    if let Some(Value::String(s)) = object.get("stringValue") {
        return RawValue::Text(s.clone());
    }
    RawValue::Missing
}

/// Map a typed Firestore value onto a raw timestamp; kept un-normalized.
fn decode_timestamp(value: &Value) -> Option<RawTimestamp> {
    let object = value.as_object()?;

    if let Some(Value::String(s)) = object.get("timestampValue") {
        return Some(RawTimestamp::Text(s.clone()));
    }
    if let Some(Value::String(s)) = object.get("stringValue") {
        return Some(RawTimestamp::Text(s.clone()));
    }
    if let Some(v) = object.get("integerValue") {
        return match v {
            Value::String(s) => s.parse::<f64>().ok().map(RawTimestamp::Numeric),
            other => other.as_f64().map(RawTimestamp::Numeric),
        };
    }
    if let Some(v) = object.get("doubleValue") {
        return v.as_f64().map(RawTimestamp::Numeric);
    }
    if let Some(Value::Object(map)) = object.get("mapValue") {
        // {seconds, nanoseconds} written as a plain map
        let inner: Map<String, Value> = map
            .get("fields")
            .and_then(Value::as_object)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), decoded_scalar(v)))
                    .collect()
            })
            .unwrap_or_default();
        return RawTimestamp::from_json(&Value::Object(inner));
    }
    None
}

fn decoded_scalar(value: &Value) -> Value {
    match decode_value(value) {
        RawValue::Number(n) => json!(n),
        RawValue::Text(s) => Value::String(s),
        RawValue::Missing => Value::Null,
    }
}

#[async_trait]
impl TelemetryRepository for FirestoreRepository {
    async fn latest_snapshot(&self) -> Result<Option<PhaseSnapshot>> {
        let body = self.structured_query(None, None, 1, None);
        let documents = self.run_query(&body).await?;
        Ok(documents.into_iter().next().map(|d| self.to_snapshot(d)))
    }

    async fn query_variable_history(
        &self,
        variable: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        max_points: usize,
    ) -> Result<Vec<Sample>> {
        let projection = [self.timestamp_field.as_str(), variable];
        let body = self.structured_query(start, end, max_points, Some(&projection));
        tracing::debug!("Executing history query for {}: {}", variable, body);

        let documents = self.run_query(&body).await?;
        let samples = documents
            .into_iter()
            .map(|d| self.to_snapshot(d))
            .map(|mut snapshot| {
                let value = snapshot.fields.remove(variable).unwrap_or(RawValue::Missing);
                Sample::new(variable, snapshot.created_at, value)
            })
            .collect::<Vec<_>>();

        tracing::debug!("Found {} samples for {}", samples.len(), variable);
        Ok(samples)
    }
}
