// In-memory repository: demo data, fixtures and tests
use crate::application::telemetry_repository::TelemetryRepository;
use crate::domain::telemetry::{PhaseSnapshot, RawTimestamp, RawValue, Sample};
use crate::domain::timestamp;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

const PUSH_CAPACITY: usize = 32;

/// Holds whole documents and pushes every new one to listeners.
pub struct InMemoryRepository {
    documents: RwLock<Vec<PhaseSnapshot>>,
    updates: broadcast::Sender<PhaseSnapshot>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::with_documents(Vec::new())
    }

    pub fn with_documents(documents: Vec<PhaseSnapshot>) -> Self {
        let (updates, _) = broadcast::channel(PUSH_CAPACITY);
        Self {
            documents: RwLock::new(documents),
            updates,
        }
    }

    /// Append a document and notify listeners.
    pub fn push(&self, document: PhaseSnapshot) {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(document.clone());
        // No listeners is fine
        let _ = self.updates.send(document);
    }

    pub fn len(&self) -> usize {
        self.documents.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push_listeners(&self) -> usize {
        self.updates.receiver_count()
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn created_ms(document: &PhaseSnapshot) -> Option<i64> {
    timestamp::normalize_opt(document.created_at.as_ref())
}

#[async_trait]
impl TelemetryRepository for InMemoryRepository {
    async fn latest_snapshot(&self) -> Result<Option<PhaseSnapshot>> {
        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        // Ties and undated documents resolve to the one inserted last
        let latest = documents
            .iter()
            .enumerate()
            .max_by_key(|(index, d)| (created_ms(d), *index))
            .map(|(_, d)| d.clone());
        Ok(latest)
    }

    async fn query_variable_history(
        &self,
        variable: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        max_points: usize,
    ) -> Result<Vec<Sample>> {
        let start_ms = start.map(|t| t.timestamp_millis());
        let end_ms = end.map(|t| t.timestamp_millis());

        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        let mut matching: Vec<(i64, &PhaseSnapshot)> = documents
            .iter()
            .filter_map(|d| created_ms(d).map(|ms| (ms, d)))
            .filter(|(ms, _)| start_ms.is_none_or(|s| *ms >= s) && end_ms.is_none_or(|e| *ms <= e))
            .collect();

        // Most recent first, like the remote store's ordered query
        matching.sort_by(|a, b| b.0.cmp(&a.0));
        matching.truncate(max_points);

        Ok(matching
            .into_iter()
            .map(|(ms, d)| {
                Sample::new(
                    variable,
                    Some(RawTimestamp::EpochMillis(ms as f64)),
                    d.fields.get(variable).cloned().unwrap_or(RawValue::Missing),
                )
            })
            .collect())
    }

    fn snapshot_updates(&self) -> Option<broadcast::Receiver<PhaseSnapshot>> {
        Some(self.updates.subscribe())
    }
}
