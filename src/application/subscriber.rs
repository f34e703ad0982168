// Live series subscriptions - One independent refresh loop per (variable, window)
use crate::application::telemetry_repository::TelemetryRepository;
use crate::domain::phase::TimeWindow;
use crate::domain::series;
use crate::domain::telemetry::SeriesPoint;
use crate::error::{Result, TelemetryError};
use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionState {
    Idle,
    Fetching,
    Streaming,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionSpec {
    pub variable: String,
    pub window: TimeWindow,
    pub max_points: usize,
}

#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    pub interval: Duration,
    /// Fetches running longer than this count as failed.
    pub fetch_timeout: Option<Duration>,
}

#[derive(Clone)]
pub struct SeriesSubscriber {
    repository: Arc<dyn TelemetryRepository>,
    policy: RefreshPolicy,
}

impl SeriesSubscriber {
    pub fn new(repository: Arc<dyn TelemetryRepository>, policy: RefreshPolicy) -> Self {
        Self { repository, policy }
    }

    /// Start a subscription. The first fetch runs immediately, then one per
    /// refresh interval and one per pushed store change.
    ///
    /// `on_update` must not cancel its own handle.
    pub fn subscribe<F>(&self, spec: SubscriptionSpec, on_update: F) -> SubscriptionHandle
    where
        F: Fn(Vec<SeriesPoint>) + Send + Sync + 'static,
    {
        let lifecycle = Arc::new(Lifecycle::new());
        let task = tokio::spawn(run_subscription(
            self.repository.clone(),
            self.policy.clone(),
            spec.clone(),
            lifecycle.clone(),
            on_update,
        ));

        tracing::info!(variable = %spec.variable, "Subscription created");
        SubscriptionHandle {
            spec,
            lifecycle,
            task: Mutex::new(Some(task)),
        }
    }
}

/// Owning token for one live subscription; dropping it tears the subscription down.
pub struct SubscriptionHandle {
    spec: SubscriptionSpec,
    lifecycle: Arc<Lifecycle>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SubscriptionHandle {
    pub fn spec(&self) -> &SubscriptionSpec {
        &self.spec
    }

    pub fn state(&self) -> SubscriptionState {
        *self.lifecycle.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<SubscriptionState> {
        self.lifecycle.state.subscribe()
    }

    pub fn is_active(&self) -> bool {
        *self.lifecycle.lock()
    }

    /// Tear down. Safe to call repeatedly; once it returns no update fires.
    pub fn cancel(&self) {
        if !self.lifecycle.close() {
            return;
        }
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
        tracing::info!(variable = %self.spec.variable, "Subscription torn down");
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Open flag and state, changed together under one lock so a late fetch
/// result can never be delivered after teardown.
struct Lifecycle {
    open: Mutex<bool>,
    state: watch::Sender<SubscriptionState>,
}

impl Lifecycle {
    fn new() -> Self {
        let (state, _) = watch::channel(SubscriptionState::Idle);
        Self {
            open: Mutex::new(true),
            state,
        }
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        lock(&self.open)
    }

    fn transition(&self, next: SubscriptionState) -> bool {
        let open = self.lock();
        if *open {
            self.state.send_replace(next);
        }
        *open
    }

    fn deliver(&self, update: impl FnOnce()) -> bool {
        let open = self.lock();
        if *open {
            self.state.send_replace(SubscriptionState::Streaming);
            update();
        }
        *open
    }

    fn close(&self) -> bool {
        let mut open = self.lock();
        let was_open = std::mem::replace(&mut *open, false);
        if was_open {
            self.state.send_replace(SubscriptionState::Idle);
        }
        was_open
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, PartialEq)]
enum Trigger {
    Tick,
    Push,
    PushClosed,
}

async fn run_subscription<F>(
    repository: Arc<dyn TelemetryRepository>,
    policy: RefreshPolicy,
    spec: SubscriptionSpec,
    lifecycle: Arc<Lifecycle>,
    on_update: F,
) where
    F: Fn(Vec<SeriesPoint>) + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(policy.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pushes = repository.snapshot_updates();

    loop {
        // First tick completes immediately
        let trigger = tokio::select! {
            _ = ticker.tick() => Trigger::Tick,
            alive = next_push(&mut pushes) => {
                if alive { Trigger::Push } else { Trigger::PushClosed }
            }
        };
        if trigger == Trigger::PushClosed {
            pushes = None;
            continue;
        }

        if !lifecycle.transition(SubscriptionState::Fetching) {
            break;
        }

        match fetch(repository.as_ref(), &spec, &policy).await {
            Ok(points) => {
                tracing::debug!(
                    variable = %spec.variable,
                    points = points.len(),
                    trigger = ?trigger,
                    "Series refreshed"
                );
                if !lifecycle.deliver(|| on_update(points)) {
                    break;
                }
            }
            Err(e) => {
                // Last delivered series stays in place; retry on the next tick
                tracing::warn!(variable = %spec.variable, "Series fetch failed: {}", e);
                if !lifecycle.transition(SubscriptionState::Error) {
                    break;
                }
            }
        }
    }
}

async fn next_push<T: Clone>(pushes: &mut Option<broadcast::Receiver<T>>) -> bool {
    match pushes {
        Some(rx) => match rx.recv().await {
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => true,
            Err(broadcast::error::RecvError::Closed) => false,
        },
        None => std::future::pending().await,
    }
}

async fn fetch(
    repository: &dyn TelemetryRepository,
    spec: &SubscriptionSpec,
    policy: &RefreshPolicy,
) -> Result<Vec<SeriesPoint>> {
    let (start, end) = spec.window.resolve(Utc::now());
    let query = repository.query_variable_history(&spec.variable, start, end, spec.max_points);

    let samples = match policy.fetch_timeout {
        Some(limit) => tokio::time::timeout(limit, query)
            .await
            .map_err(|_| TelemetryError::Timeout(limit))??,
        None => query.await?,
    };

    Ok(series::build(&samples, spec.max_points))
}
