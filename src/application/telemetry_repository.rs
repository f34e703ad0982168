// Repository trait for telemetry data access
use crate::domain::telemetry::{PhaseSnapshot, Sample};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    /// Newest full reading, or `None` when the store is empty
    async fn latest_snapshot(&self) -> Result<Option<PhaseSnapshot>>;

    /// Up to `max_points` samples of one variable inside the window, most recent first
    async fn query_variable_history(
        &self,
        variable: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        max_points: usize,
    ) -> Result<Vec<Sample>>;

    /// Push feed of new snapshots, for stores that can deliver them.
    /// Stores without push return `None` and are polled instead.
    fn snapshot_updates(&self) -> Option<broadcast::Receiver<PhaseSnapshot>> {
        None
    }
}
