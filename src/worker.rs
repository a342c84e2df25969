use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::client::TrackerClient;
use crate::model::ScrapingStatus;
use crate::store::{SeasonStore, TrackerStore};

/// How one scrape job ended. Scrape failures are part of the job's normal
/// vocabulary; only collaborator failures (store writes) surface as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Seasons scraped and upserted.
    Completed { seasons: usize },
    /// The tracker no longer exists or is soft-deleted.
    Skipped,
    /// The scrape itself failed after retries; the tracker is marked failed.
    Failed,
}

/// The queue's consumer side: runs one scrape job end to end.
///
/// This is the only place tracker status transitions happen:
/// `Pending -> InProgress` when the job starts, then `Succeeded` or `Failed`
/// with `last_scraped_at` stamped when it ends.
pub struct ScrapeWorker {
    client: TrackerClient,
    trackers: Arc<dyn TrackerStore>,
    seasons: Arc<dyn SeasonStore>,
}

impl ScrapeWorker {
    pub fn new(
        client: TrackerClient,
        trackers: Arc<dyn TrackerStore>,
        seasons: Arc<dyn SeasonStore>,
    ) -> Self {
        Self {
            client,
            trackers,
            seasons,
        }
    }

    #[instrument(skip(self))]
    pub async fn run_job(&self, tracker_id: u64) -> Result<JobOutcome> {
        let Some(tracker) = self.trackers.get(tracker_id).await? else {
            warn!(tracker_id, "job for unknown tracker, skipping");
            return Ok(JobOutcome::Skipped);
        };
        if tracker.is_deleted || !tracker.is_active {
            info!(tracker_id, "tracker inactive or deleted, skipping");
            return Ok(JobOutcome::Skipped);
        }

        self.trackers.begin_scrape(tracker_id).await?;

        match self.client.scrape_all_seasons(&tracker.url).await {
            Ok(records) => {
                self.seasons.bulk_upsert(tracker_id, &records).await?;
                self.trackers
                    .finish_scrape(tracker_id, ScrapingStatus::Succeeded, Utc::now())
                    .await?;
                info!(tracker_id, seasons = records.len(), "scrape job completed");
                Ok(JobOutcome::Completed {
                    seasons: records.len(),
                })
            }
            Err(e) => {
                self.trackers
                    .finish_scrape(tracker_id, ScrapingStatus::Failed, Utc::now())
                    .await?;
                warn!(tracker_id, error = %e, "scrape job failed");
                Ok(JobOutcome::Failed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        profile_with_seasons, tracker, MemTrackerStore, MockFetcher, RecordingSeasonStore,
    };

    fn worker_with(
        store: MemTrackerStore,
        fetcher: MockFetcher,
    ) -> (ScrapeWorker, Arc<MemTrackerStore>, Arc<RecordingSeasonStore>) {
        let store = Arc::new(store);
        let seasons = Arc::new(RecordingSeasonStore::new());
        let client = TrackerClient::with_fetcher(Arc::new(fetcher));
        (
            ScrapeWorker::new(
                client,
                Arc::clone(&store) as Arc<dyn TrackerStore>,
                Arc::clone(&seasons) as Arc<dyn SeasonStore>,
            ),
            store,
            seasons,
        )
    }

    #[tokio::test]
    async fn successful_job_upserts_and_marks_succeeded() {
        let t = tracker(1, 100);
        let url = t.url.clone();
        let fetcher = MockFetcher::new().on_profile(&url, profile_with_seasons(34, &[33, 34]));
        let (worker, store, seasons) = worker_with(MemTrackerStore::with_trackers([t]), fetcher);

        let outcome = worker.run_job(1).await.unwrap();

        assert_eq!(outcome, JobOutcome::Completed { seasons: 2 });
        let tracker = store.snapshot(1).unwrap();
        assert_eq!(tracker.scraping_status, ScrapingStatus::Succeeded);
        assert_eq!(tracker.scraping_attempts, 1);
        assert!(tracker.last_scraped_at.is_some());
        assert_eq!(seasons.upserts().len(), 1);
    }

    #[tokio::test]
    async fn failed_scrape_marks_failed_and_skips_upsert() {
        let t = tracker(1, 100);
        let url = t.url.clone();
        let fetcher = MockFetcher::new().failing(&url);
        let (worker, store, seasons) = worker_with(MemTrackerStore::with_trackers([t]), fetcher);

        let outcome = worker.run_job(1).await.unwrap();

        assert_eq!(outcome, JobOutcome::Failed);
        let tracker = store.snapshot(1).unwrap();
        assert_eq!(tracker.scraping_status, ScrapingStatus::Failed);
        assert_eq!(tracker.scraping_attempts, 1);
        assert!(seasons.upserts().is_empty());
    }

    #[tokio::test]
    async fn unknown_tracker_is_skipped() {
        let (worker, store, _) = worker_with(MemTrackerStore::new(), MockFetcher::new());

        let outcome = worker.run_job(99).await.unwrap();

        assert_eq!(outcome, JobOutcome::Skipped);
        assert!(store.snapshot(99).is_none());
    }

    #[tokio::test]
    async fn soft_deleted_tracker_is_skipped_without_status_change() {
        let mut t = tracker(1, 100);
        t.is_deleted = true;
        let (worker, store, seasons) =
            worker_with(MemTrackerStore::with_trackers([t]), MockFetcher::new());

        let outcome = worker.run_job(1).await.unwrap();

        assert_eq!(outcome, JobOutcome::Skipped);
        assert_eq!(store.snapshot(1).unwrap().scraping_attempts, 0);
        assert!(seasons.upserts().is_empty());
    }

    #[tokio::test]
    async fn attempts_counter_accumulates_across_jobs() {
        let t = tracker(1, 100);
        let url = t.url.clone();
        let fetcher = MockFetcher::new().on_profile(&url, profile_with_seasons(34, &[]));
        let (worker, store, _) = worker_with(MemTrackerStore::with_trackers([t]), fetcher);

        worker.run_job(1).await.unwrap();
        worker.run_job(1).await.unwrap();

        assert_eq!(store.snapshot(1).unwrap().scraping_attempts, 2);
    }
}
