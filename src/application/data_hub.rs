// Data hub - The single upstream snapshot subscription shared by every consumer
use crate::application::telemetry_repository::TelemetryRepository;
use crate::domain::telemetry::PhaseSnapshot;
use crate::error::{Result, TelemetryError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// What consumers observe: the latest snapshot and whether any answer has
/// arrived from the store yet.
#[derive(Debug, Clone, Default)]
pub struct HubState {
    pub snapshot: Option<Arc<PhaseSnapshot>>,
    pub loaded: bool,
}

pub struct DataHub {
    repository: Arc<dyn TelemetryRepository>,
    poll_interval: Duration,
    fetch_timeout: Option<Duration>,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    running: Mutex<bool>,
    state: watch::Sender<HubState>,
}

impl Shared {
    /// Publish only while running, so a stopped hub stays silent.
    fn publish(&self, snapshot: Option<PhaseSnapshot>) {
        let running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if *running {
            self.state.send_replace(HubState {
                snapshot: snapshot.map(Arc::new),
                loaded: true,
            });
        }
    }
}

impl DataHub {
    pub fn new(
        repository: Arc<dyn TelemetryRepository>,
        poll_interval: Duration,
        fetch_timeout: Option<Duration>,
    ) -> Self {
        let (state, _) = watch::channel(HubState::default());
        Self {
            repository,
            poll_interval,
            fetch_timeout,
            shared: Arc::new(Shared {
                running: Mutex::new(false),
                state,
            }),
            task: Mutex::new(None),
        }
    }

    /// Attach to the store. Calling it while running keeps the existing attachment.
    pub fn start(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return;
        }

        *self.shared.running.lock().unwrap_or_else(PoisonError::into_inner) = true;
        *task = Some(tokio::spawn(run_hub(
            self.repository.clone(),
            self.poll_interval,
            self.fetch_timeout,
            self.shared.clone(),
        )));
        tracing::info!("Data hub started");
    }

    /// Detach from the store. Idempotent.
    pub fn stop(&self) {
        let Some(task) = self.task.lock().unwrap_or_else(PoisonError::into_inner).take() else {
            return;
        };
        *self.shared.running.lock().unwrap_or_else(PoisonError::into_inner) = false;
        task.abort();
        tracing::info!("Data hub stopped");
    }

    pub fn is_running(&self) -> bool {
        *self.shared.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Option<Arc<PhaseSnapshot>> {
        self.shared.state.borrow().snapshot.clone()
    }

    pub fn is_loading(&self) -> bool {
        !self.shared.state.borrow().loaded
    }

    pub fn subscribe(&self) -> watch::Receiver<HubState> {
        self.shared.state.subscribe()
    }
}

impl Drop for DataHub {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_hub(
    repository: Arc<dyn TelemetryRepository>,
    poll_interval: Duration,
    fetch_timeout: Option<Duration>,
    shared: Arc<Shared>,
) {
    // Attach the push feed before the first read so nothing slips in between
    let mut pushes = repository.snapshot_updates();
    let mut loaded = refresh(repository.as_ref(), fetch_timeout, &shared).await;

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        // With a push feed the ticker only retries until the first good read
        let polling = pushes.is_none() || !loaded;
        tokio::select! {
            _ = ticker.tick(), if polling => {
                loaded |= refresh(repository.as_ref(), fetch_timeout, &shared).await;
            }
            event = next_push(&mut pushes) => match event {
                Ok(snapshot) => {
                    shared.publish(Some(snapshot));
                    loaded = true;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Snapshot feed lagged by {}, re-reading latest", skipped);
                    loaded |= refresh(repository.as_ref(), fetch_timeout, &shared).await;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::warn!("Snapshot feed closed, falling back to polling");
                    pushes = None;
                }
            },
        }
    }
}

async fn next_push(
    pushes: &mut Option<broadcast::Receiver<PhaseSnapshot>>,
) -> std::result::Result<PhaseSnapshot, broadcast::error::RecvError> {
    match pushes {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// `true` once the store has answered.
async fn refresh(repository: &dyn TelemetryRepository, fetch_timeout: Option<Duration>, shared: &Shared) -> bool {
    match read_latest(repository, fetch_timeout).await {
        Ok(snapshot) => {
            shared.publish(snapshot);
            true
        }
        Err(e) => {
            tracing::warn!("Failed to read latest snapshot: {}", e);
            false
        }
    }
}

async fn read_latest(
    repository: &dyn TelemetryRepository,
    fetch_timeout: Option<Duration>,
) -> Result<Option<PhaseSnapshot>> {
    match fetch_timeout {
        Some(limit) => tokio::time::timeout(limit, repository.latest_snapshot())
            .await
            .map_err(|_| TelemetryError::Timeout(limit))?,
        None => repository.latest_snapshot().await,
    }
}
