// Per-view aggregation state: one slot per plotted series
use crate::domain::axis::AxisPlan;
use crate::domain::telemetry::{NamedSeries, SeriesPoint};
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// Slots were replaced by a new layout.
    Reset,
    /// One slot received new data.
    Slot(usize),
}

/// Updates replace a single slot, never the whole collection, so concurrent
/// completions from independent subscriptions cannot overwrite each other.
pub struct SeriesBoard {
    slots: RwLock<Vec<NamedSeries>>,
    events: broadcast::Sender<BoardEvent>,
}

impl SeriesBoard {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            slots: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Replace the layout with empty, named slots.
    pub fn reset(&self, names: Vec<String>) {
        let slots = names.into_iter().map(NamedSeries::empty).collect();
        *self.slots.write().unwrap_or_else(PoisonError::into_inner) = slots;
        let _ = self.events.send(BoardEvent::Reset);
    }

    /// Overwrite one slot's data; `false` when the slot does not exist.
    pub fn update_slot(&self, index: usize, data: Vec<SeriesPoint>) -> bool {
        {
            let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
            let Some(slot) = slots.get_mut(index) else {
                tracing::warn!("Ignoring update for unknown series slot {}", index);
                return false;
            };
            slot.data = data;
        }
        let _ = self.events.send(BoardEvent::Slot(index));
        true
    }

    pub fn slot(&self, index: usize) -> Option<NamedSeries> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    pub fn snapshot(&self) -> Vec<NamedSeries> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn axis_plan(&self) -> AxisPlan {
        AxisPlan::for_series(&self.slots.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn events(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }
}

impl Default for SeriesBoard {
    fn default() -> Self {
        Self::new()
    }
}
