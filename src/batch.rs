use std::sync::Arc;

use anyhow::Result;
use tracing::{info, instrument};

use crate::guard::ProcessingGuard;
use crate::store::{JobQueue, TrackerStore};

/// What a batch run did. Empty batches are a success, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub processed: usize,
    pub tracker_ids: Vec<u64>,
}

/// Selects pending trackers and puts the eligible ones on the job queue.
pub struct BatchProcessor {
    trackers: Arc<dyn TrackerStore>,
    guard: ProcessingGuard,
    queue: Arc<dyn JobQueue>,
}

impl BatchProcessor {
    pub fn new(
        trackers: Arc<dyn TrackerStore>,
        guard: ProcessingGuard,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            trackers,
            guard,
            queue,
        }
    }

    /// Automated batch run: select all pending trackers, apply the
    /// processing guard, enqueue the survivors.
    #[instrument(skip(self))]
    pub async fn process_pending_trackers(&self) -> Result<BatchOutcome> {
        let pending = self.trackers.list_pending().await?;
        if pending.is_empty() {
            info!("no pending trackers");
            return Ok(BatchOutcome::default());
        }

        let ids: Vec<u64> = pending.iter().map(|t| t.id).collect();
        let eligible = self.guard.filter_processable(&ids).await;
        if eligible.is_empty() {
            info!(pending = ids.len(), "no trackers eligible for automated processing");
            return Ok(BatchOutcome::default());
        }

        self.queue.enqueue_batch(&eligible).await?;
        info!(
            pending = ids.len(),
            enqueued = eligible.len(),
            "enqueued scrape batch"
        );
        Ok(BatchOutcome {
            processed: eligible.len(),
            tracker_ids: eligible,
        })
    }

    /// Manual, guild-scoped run triggered by a community administrator.
    ///
    /// Deliberately bypasses the processing guard: the per-community opt-in
    /// toggle only governs automatic scheduling, not an explicit manual
    /// trigger.
    #[instrument(skip(self))]
    pub async fn process_pending_trackers_for_guild(&self, guild_id: u64) -> Result<BatchOutcome> {
        let pending = self.trackers.list_pending_for_guild(guild_id).await?;
        if pending.is_empty() {
            info!(guild_id, "no pending trackers for guild");
            return Ok(BatchOutcome::default());
        }

        let ids: Vec<u64> = pending.iter().map(|t| t.id).collect();
        self.queue.enqueue_batch(&ids).await?;
        info!(guild_id, enqueued = ids.len(), "enqueued manual guild batch");
        Ok(BatchOutcome {
            processed: ids.len(),
            tracker_ids: ids,
        })
    }
}
