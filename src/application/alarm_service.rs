// Alarm service - Alarm history table queries
use crate::domain::alarm::{filter_alarms, variable_suggestions, Alarm, AlarmFilter};
use crate::error::Result;
use crate::infrastructure::fixtures::FixtureStore;

#[derive(Debug, Clone)]
pub struct AlarmService {
    store: FixtureStore,
}

impl AlarmService {
    pub fn new(store: FixtureStore) -> Self {
        Self { store }
    }

    pub async fn search(&self, filter: &AlarmFilter) -> Result<Vec<Alarm>> {
        let alarms = self.store.alarms().await?;
        let matching = filter_alarms(&alarms, filter);
        tracing::debug!("Alarm search matched {} of {}", matching.len(), alarms.len());
        Ok(matching)
    }

    pub async fn suggestions(&self, query: &str) -> Result<Vec<String>> {
        let alarms = self.store.alarms().await?;
        Ok(variable_suggestions(&alarms, query))
    }
}
