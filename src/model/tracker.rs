use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a tracker sits in the scrape lifecycle. Transitions happen only in
/// the worker: `Pending -> InProgress -> Succeeded | Failed`.
#[derive(
    Default,
    Debug,
    Clone,
    Copy,
    Hash,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ScrapingStatus {
    #[default]
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

/// Platform a tracked profile lives on.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Platform {
    Steam,
    Epic,
    Psn,
    Xbl,
    Switch,
}

/// A linked external profile (game + platform + handle) owned by one user.
///
/// Trackers are soft-deleted rather than removed so that accumulated season
/// records survive; a deleted tracker never appears in batch selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tracker {
    pub id: u64,
    pub url: String,
    pub game: String,
    pub platform: Platform,
    pub user_id: u64,
    pub scraping_status: ScrapingStatus,
    /// Monotonic counter, only ever incremented.
    pub scraping_attempts: u32,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_deleted: bool,
}
