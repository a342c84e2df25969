//! Test doubles for the pipeline's trait seams.
//!
//! One mock per boundary: MockFetcher (ProfileFetcher), MemTrackerStore
//! (TrackerStore), MockMemberships / MockSettings (guard lookups),
//! RecordingQueue (JobQueue), RecordingSeasonStore (SeasonStore). All
//! HashMap-backed and deterministic: no network, no database.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::error::TrackerError;
use crate::model::{
    AvailableSegment, Platform, ScrapedProfile, ScrapingStatus, SeasonRecord, Segment, Tracker,
};
use crate::store::{
    GuildSettings, GuildSettingsProvider, JobQueue, MembershipProvider, ProfileFetcher,
    SeasonStore, TrackerStore,
};

pub(crate) fn tracker(id: u64, user_id: u64) -> Tracker {
    Tracker {
        id,
        url: format!("https://tracker.example/profile/steam/user{id}"),
        game: "rocket-league".to_string(),
        platform: Platform::Steam,
        user_id,
        scraping_status: ScrapingStatus::Pending,
        scraping_attempts: 0,
        last_scraped_at: None,
        is_active: true,
        is_deleted: false,
    }
}

/// A profile whose current season is `current` and whose availableSegments
/// advertise `available`, with a ranked 1v1 segment for every season either
/// mentions.
pub(crate) fn profile_with_seasons(current: u32, available: &[u32]) -> ScrapedProfile {
    let mut seasons: Vec<u32> = available.to_vec();
    seasons.push(current);
    seasons.dedup();

    let segments: Vec<Segment> = seasons
        .iter()
        .map(|season| {
            serde_json::from_value(json!({
                "type": "playlist",
                "attributes": { "playlistId": 1, "season": season },
                "stats": {
                    "tier": { "metadata": { "name": "Champion I" }, "value": 16 },
                    "rating": { "value": 1200 },
                    "matchesPlayed": { "value": 30 }
                }
            }))
            .unwrap()
        })
        .collect();

    let available_segments: Vec<AvailableSegment> = available
        .iter()
        .map(|season| {
            serde_json::from_value(json!({
                "attributes": { "season": season },
                "metadata": { "name": format!("Season {season}") }
            }))
            .unwrap()
        })
        .collect();

    ScrapedProfile {
        platform_slug: "steam".to_string(),
        platform_user_id: "7656119".to_string(),
        platform_user_handle: "player1".to_string(),
        user_id: 42,
        is_premium: false,
        last_updated: None,
        current_season: current,
        segments,
        available_segments,
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// URL-keyed profile fetcher with a call log. Unregistered URLs error.
pub(crate) struct MockFetcher {
    profiles: HashMap<String, ScrapedProfile>,
    failures: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
            failures: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_profile(mut self, url: &str, profile: ScrapedProfile) -> Self {
        self.profiles.insert(url.to_string(), profile);
        self
    }

    /// Make fetches of `url` fail with a retryable challenge error.
    pub fn failing(mut self, url: &str) -> Self {
        self.failures.insert(url.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProfileFetcher for MockFetcher {
    async fn fetch_profile(&self, url: &str) -> crate::error::Result<ScrapedProfile> {
        self.calls.lock().unwrap().push(url.to_string());

        if self.failures.contains(url) {
            return Err(TrackerError::ChallengeFailed {
                url: url.to_string(),
                message: "mock challenge failure".to_string(),
            });
        }
        match self.profiles.get(url) {
            Some(profile) => Ok(profile.clone()),
            None => Err(TrackerError::MalformedResponse {
                url: url.to_string(),
                reason: "no profile registered for url".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MemTrackerStore
// ---------------------------------------------------------------------------

/// Stateful in-memory tracker store, plus a guild membership index for the
/// guild-scoped selection query.
pub(crate) struct MemTrackerStore {
    inner: Mutex<HashMap<u64, Tracker>>,
    guild_users: HashMap<u64, Vec<u64>>,
}

impl MemTrackerStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            guild_users: HashMap::new(),
        }
    }

    pub fn with_trackers(trackers: impl IntoIterator<Item = Tracker>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock().unwrap();
            for t in trackers {
                inner.insert(t.id, t);
            }
        }
        store
    }

    pub fn guild_members(mut self, guild_id: u64, user_ids: &[u64]) -> Self {
        self.guild_users.insert(guild_id, user_ids.to_vec());
        self
    }

    pub fn snapshot(&self, tracker_id: u64) -> Option<Tracker> {
        self.inner.lock().unwrap().get(&tracker_id).cloned()
    }

    fn pending(&self) -> Vec<Tracker> {
        let mut pending: Vec<Tracker> = self
            .inner
            .lock()
            .unwrap()
            .values()
            .filter(|t| {
                t.is_active && !t.is_deleted && t.scraping_status == ScrapingStatus::Pending
            })
            .cloned()
            .collect();
        pending.sort_by_key(|t| t.id);
        pending
    }
}

#[async_trait]
impl TrackerStore for MemTrackerStore {
    async fn get(&self, tracker_id: u64) -> Result<Option<Tracker>> {
        Ok(self.snapshot(tracker_id))
    }

    async fn list_pending(&self) -> Result<Vec<Tracker>> {
        Ok(self.pending())
    }

    async fn list_pending_for_guild(&self, guild_id: u64) -> Result<Vec<Tracker>> {
        let members = self.guild_users.get(&guild_id).cloned().unwrap_or_default();
        Ok(self
            .pending()
            .into_iter()
            .filter(|t| members.contains(&t.user_id))
            .collect())
    }

    async fn begin_scrape(&self, tracker_id: u64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let Some(t) = inner.get_mut(&tracker_id) else {
            bail!("tracker {tracker_id} not found");
        };
        t.scraping_status = ScrapingStatus::InProgress;
        t.scraping_attempts += 1;
        Ok(())
    }

    async fn finish_scrape(
        &self,
        tracker_id: u64,
        status: ScrapingStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let Some(t) = inner.get_mut(&tracker_id) else {
            bail!("tracker {tracker_id} not found");
        };
        t.scraping_status = status;
        t.last_scraped_at = Some(at);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Guard lookups
// ---------------------------------------------------------------------------

pub(crate) struct MockMemberships {
    map: HashMap<u64, Vec<u64>>,
    calls: Arc<Mutex<Vec<u64>>>,
    fail: bool,
}

impl MockMemberships {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    pub fn member_of(mut self, user_id: u64, guild_ids: &[u64]) -> Self {
        self.map.insert(user_id, guild_ids.to_vec());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls_handle(&self) -> Arc<Mutex<Vec<u64>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl MembershipProvider for MockMemberships {
    async fn list_active_memberships(&self, user_id: u64) -> Result<Vec<u64>> {
        self.calls.lock().unwrap().push(user_id);
        if self.fail {
            bail!("membership lookup failed");
        }
        Ok(self.map.get(&user_id).cloned().unwrap_or_default())
    }
}

pub(crate) struct MockSettings {
    map: HashMap<u64, bool>,
    fail: bool,
}

impl MockSettings {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            fail: false,
        }
    }

    pub fn enabled(mut self, guild_id: u64, processing_enabled: bool) -> Self {
        self.map.insert(guild_id, processing_enabled);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl GuildSettingsProvider for MockSettings {
    async fn get_settings(&self, guild_id: u64) -> Result<Option<GuildSettings>> {
        if self.fail {
            bail!("settings lookup failed");
        }
        Ok(self.map.get(&guild_id).map(|&processing_enabled| GuildSettings {
            processing_enabled,
        }))
    }
}

// ---------------------------------------------------------------------------
// Queue and season store recorders
// ---------------------------------------------------------------------------

pub(crate) struct RecordingQueue {
    items: Mutex<Vec<u64>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    pub fn enqueued(&self) -> Vec<u64> {
        self.items.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobQueue for RecordingQueue {
    async fn enqueue(&self, tracker_id: u64) -> Result<()> {
        self.items.lock().unwrap().push(tracker_id);
        Ok(())
    }

    async fn enqueue_batch(&self, tracker_ids: &[u64]) -> Result<()> {
        self.items.lock().unwrap().extend_from_slice(tracker_ids);
        Ok(())
    }
}

pub(crate) struct RecordingSeasonStore {
    upserts: Mutex<Vec<(u64, Vec<SeasonRecord>)>>,
}

impl RecordingSeasonStore {
    pub fn new() -> Self {
        Self {
            upserts: Mutex::new(Vec::new()),
        }
    }

    pub fn upserts(&self) -> Vec<(u64, Vec<SeasonRecord>)> {
        self.upserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SeasonStore for RecordingSeasonStore {
    async fn upsert(&self, tracker_id: u64, record: &SeasonRecord) -> Result<()> {
        self.upserts
            .lock()
            .unwrap()
            .push((tracker_id, vec![record.clone()]));
        Ok(())
    }

    async fn bulk_upsert(&self, tracker_id: u64, records: &[SeasonRecord]) -> Result<()> {
        self.upserts
            .lock()
            .unwrap()
            .push((tracker_id, records.to_vec()));
        Ok(())
    }
}
