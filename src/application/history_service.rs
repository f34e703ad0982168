// History service - Per-variable lookups over recorded readings
use crate::domain::history::{lookup, variable_suggestions, HistoryQuery, HistoryResult};
use crate::error::Result;
use crate::infrastructure::fixtures::FixtureStore;
use chrono::FixedOffset;

#[derive(Debug, Clone)]
pub struct HistoryService {
    store: FixtureStore,
    offset: FixedOffset,
}

impl HistoryService {
    /// `offset` sets the calendar day used for chart labels.
    pub fn new(store: FixtureStore, offset: FixedOffset) -> Self {
        Self { store, offset }
    }

    pub async fn search(&self, query: &HistoryQuery) -> Result<HistoryResult> {
        let entries = self.store.history().await?;
        let result = lookup(&entries, query, self.offset);
        tracing::debug!(
            "History lookup for {:?} matched {} of {}",
            query.variable,
            result.entries.len(),
            entries.len()
        );
        Ok(result)
    }

    pub async fn suggestions(&self, query: &str) -> Result<Vec<String>> {
        let variables = self.store.history_variables().await?;
        Ok(variable_suggestions(&variables, query))
    }
}
