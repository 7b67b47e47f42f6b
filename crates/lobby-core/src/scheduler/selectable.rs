use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::{PushBatch, PushScheduler};
use crate::defer::next_tick;
use crate::{LobbyError, LobbyResult};

/// Picks a registered scheduler id for each batch
pub type SchedulerSelector = Arc<dyn Fn(&PushBatch) -> String + Send + Sync>;

/// Routes each batch to one of several named schedulers
pub struct SelectableScheduler {
    selector: SchedulerSelector,
    schedulers: HashMap<String, Arc<dyn PushScheduler>>,
}

impl SelectableScheduler {
    #[must_use]
    pub fn new(selector: SchedulerSelector) -> Self {
        Self {
            selector,
            schedulers: HashMap::new(),
        }
    }

    /// Register a scheduler under `id`
    #[must_use]
    pub fn with(mut self, id: impl Into<String>, scheduler: Arc<dyn PushScheduler>) -> Self {
        self.schedulers.insert(id.into(), scheduler);
        self
    }

    pub fn scheduler_ids(&self) -> Vec<&str> {
        self.schedulers.keys().map(String::as_str).collect()
    }
}

#[async_trait]
impl PushScheduler for SelectableScheduler {
    async fn schedule(&self, batch: PushBatch) -> LobbyResult<()> {
        let id = (self.selector)(&batch);
        let Some(scheduler) = self.schedulers.get(&id) else {
            next_tick().await;
            tracing::error!(
                scheduler_id = %id,
                request_id = batch.request_id,
                route = %batch.route,
                "Invalid push scheduler id"
            );
            return Err(LobbyError::Validation(format!(
                "invalid push scheduler id: {id}"
            )));
        };

        scheduler.schedule(batch).await
    }

    async fn start(&self) {
        for scheduler in self.schedulers.values() {
            scheduler.start().await;
        }
    }

    async fn stop(&self) {
        for scheduler in self.schedulers.values() {
            scheduler.stop().await;
        }
    }
}

impl std::fmt::Debug for SelectableScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectableScheduler")
            .field("schedulers", &self.scheduler_ids())
            .finish_non_exhaustive()
    }
}
