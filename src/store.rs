//! Trait seams for everything the pipeline consumes but does not implement:
//! the job queue, community membership and settings lookups, tracker and
//! season persistence, and the solver itself.
//!
//! Implementations live with the surrounding platform; tests swap in
//! deterministic in-memory versions.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{ScrapedProfile, ScrapingStatus, SeasonRecord, Tracker};

/// Fetches one profile page's payload. [`crate::solver::SolverClient`] is the
/// production implementation.
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    async fn fetch_profile(&self, url: &str) -> crate::error::Result<ScrapedProfile>;
}

/// Asynchronous scrape-job dispatch, at-least-once.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, tracker_id: u64) -> Result<()>;
    async fn enqueue_batch(&self, tracker_ids: &[u64]) -> Result<()>;
}

/// Per-community automation settings.
#[derive(Debug, Clone)]
pub struct GuildSettings {
    pub processing_enabled: bool,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            processing_enabled: true,
        }
    }
}

#[async_trait]
pub trait GuildSettingsProvider: Send + Sync {
    /// Settings for one community. `None` means nothing was ever configured,
    /// which callers treat as the defaults.
    async fn get_settings(&self, guild_id: u64) -> Result<Option<GuildSettings>>;
}

#[async_trait]
pub trait MembershipProvider: Send + Sync {
    /// Communities the user belongs to, excluding deleted/banned memberships.
    async fn list_active_memberships(&self, user_id: u64) -> Result<Vec<u64>>;
}

/// Tracker persistence as the pipeline needs it. Selection queries exclude
/// soft-deleted and inactive trackers.
#[async_trait]
pub trait TrackerStore: Send + Sync {
    async fn get(&self, tracker_id: u64) -> Result<Option<Tracker>>;

    /// Active, non-deleted trackers with status `Pending`.
    async fn list_pending(&self) -> Result<Vec<Tracker>>;

    /// Same selection, restricted to trackers owned by members of one
    /// community.
    async fn list_pending_for_guild(&self, guild_id: u64) -> Result<Vec<Tracker>>;

    /// Mark a scrape as started: status to `InProgress` and the attempt
    /// counter incremented. The counter never goes down.
    async fn begin_scrape(&self, tracker_id: u64) -> Result<()>;

    /// Record the outcome of a finished scrape along with its timestamp.
    async fn finish_scrape(
        &self,
        tracker_id: u64,
        status: ScrapingStatus,
        at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Season record persistence, idempotent on (tracker, season_number). An
/// upsert of an existing season only overwrites fields the new record
/// actually carries.
#[async_trait]
pub trait SeasonStore: Send + Sync {
    async fn upsert(&self, tracker_id: u64, record: &SeasonRecord) -> Result<()>;
    async fn bulk_upsert(&self, tracker_id: u64, records: &[SeasonRecord]) -> Result<()>;
}
