use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use crate::store::{GuildSettingsProvider, MembershipProvider, TrackerStore};

/// Eligibility filter for automated (non-manual) scraping.
///
/// A user is eligible when any community they belong to has processing
/// enabled, or when they belong to no community at all. Resolution failures
/// never block processing: the guard fails open and logs the anomaly. That
/// is a reviewed product decision favoring automation continuity over strict
/// enforcement, not an oversight.
pub struct ProcessingGuard {
    trackers: Arc<dyn TrackerStore>,
    memberships: Arc<dyn MembershipProvider>,
    settings: Arc<dyn GuildSettingsProvider>,
}

impl ProcessingGuard {
    pub fn new(
        trackers: Arc<dyn TrackerStore>,
        memberships: Arc<dyn MembershipProvider>,
        settings: Arc<dyn GuildSettingsProvider>,
    ) -> Self {
        Self {
            trackers,
            memberships,
            settings,
        }
    }

    /// Whether a tracker may be included in an automated batch run.
    #[instrument(skip(self))]
    pub async fn can_process_tracker(&self, tracker_id: u64) -> bool {
        match self.resolve_owner_opt_in(tracker_id).await {
            Ok(eligible) => eligible,
            Err(e) => {
                warn!(tracker_id, error = %e, "guard resolution failed, failing open");
                true
            }
        }
    }

    /// Same rule applied straight to a user id. Used by manual and
    /// administrative flows that never went through batch selection.
    #[instrument(skip(self))]
    pub async fn can_process_tracker_for_user(&self, user_id: u64) -> bool {
        match self.user_opted_in(user_id).await {
            Ok(eligible) => eligible,
            Err(e) => {
                warn!(user_id, error = %e, "guard resolution failed, failing open");
                true
            }
        }
    }

    /// Batched eligibility filter. Trackers are grouped by owning user so
    /// each user's communities and settings resolve once, however many
    /// trackers they own. Any resolution failure returns the full input set
    /// unfiltered.
    #[instrument(skip(self, tracker_ids), fields(count = tracker_ids.len()))]
    pub async fn filter_processable(&self, tracker_ids: &[u64]) -> Vec<u64> {
        match self.try_filter(tracker_ids).await {
            Ok(eligible) => eligible,
            Err(e) => {
                warn!(error = %e, "batch guard resolution failed, failing open");
                tracker_ids.to_vec()
            }
        }
    }

    async fn try_filter(&self, tracker_ids: &[u64]) -> Result<Vec<u64>> {
        let mut by_user: HashMap<u64, Vec<u64>> = HashMap::new();
        let mut unowned = Vec::new();

        for &tracker_id in tracker_ids {
            match self.trackers.get(tracker_id).await? {
                Some(tracker) => by_user.entry(tracker.user_id).or_default().push(tracker_id),
                // Unknown tracker: nothing to gate on, keep it.
                None => unowned.push(tracker_id),
            }
        }

        let mut eligible = unowned;
        for (user_id, ids) in by_user {
            if self.user_opted_in(user_id).await? {
                eligible.extend(ids);
            } else {
                debug!(user_id, excluded = ids.len(), "user opted out of automated processing");
            }
        }

        // Keep the caller's ordering stable.
        eligible.sort_by_key(|id| tracker_ids.iter().position(|t| t == id));
        Ok(eligible)
    }

    async fn resolve_owner_opt_in(&self, tracker_id: u64) -> Result<bool> {
        let tracker = self
            .trackers
            .get(tracker_id)
            .await?
            .with_context(|| format!("tracker {tracker_id} not found"))?;
        self.user_opted_in(tracker.user_id).await
    }

    /// Union semantics across communities: one opted-in community suffices.
    /// No memberships at all means no restriction applies.
    async fn user_opted_in(&self, user_id: u64) -> Result<bool> {
        let guilds = self.memberships.list_active_memberships(user_id).await?;
        if guilds.is_empty() {
            return Ok(true);
        }

        for guild_id in guilds {
            let enabled = self
                .settings
                .get_settings(guild_id)
                .await?
                .unwrap_or_default()
                .processing_enabled;
            if enabled {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
