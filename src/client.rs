use std::sync::Arc;

use chrono::Utc;
use itertools::Itertools;
use tracing::{debug, instrument, warn};

use crate::config::SolverConfig;
use crate::error::Result;
use crate::model::SeasonRecord;
use crate::parser;
use crate::solver::SolverClient;
use crate::store::ProfileFetcher;

/// The main entry point for scraping tracker profiles.
///
/// `TrackerClient` wraps the challenge-solving proxy behind a
/// [`ProfileFetcher`] and exposes season-level scrape operations.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> tracker_ingest::Result<()> {
/// use tracker_ingest::{SolverConfig, TrackerClient};
///
/// let client = TrackerClient::new(SolverConfig::new("http://localhost:8191/v1"))?;
/// let seasons = client
///     .scrape_all_seasons("https://tracker.example/profile/steam/player1")
///     .await?;
/// println!("Scraped {} seasons", seasons.len());
/// # Ok(())
/// # }
/// ```
pub struct TrackerClient {
    fetcher: Arc<dyn ProfileFetcher>,
}

impl TrackerClient {
    /// Create a client backed by the real solver.
    pub fn new(config: SolverConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Arc::new(SolverClient::new(config)?),
        })
    }

    /// Create a client using the provided fetcher. The worker shares one
    /// fetcher across clients so the rate limiter stays process-wide.
    pub fn with_fetcher(fetcher: Arc<dyn ProfileFetcher>) -> Self {
        Self { fetcher }
    }

    /// Scrape the profile's current season.
    #[instrument(skip(self))]
    pub async fn scrape_current_season(&self, url: &str) -> Result<SeasonRecord> {
        let profile = self.fetcher.fetch_profile(url).await?;
        Ok(parser::build_season_record(
            &profile.segments,
            profile.current_season,
            &profile.available_segments,
            Utc::now(),
        ))
    }

    /// Scrape the current season plus every historical season the profile
    /// advertises.
    ///
    /// Seasons are fetched one at a time; a season whose own retries exhaust
    /// is logged and omitted without aborting the rest of the crawl. The
    /// result is sorted by season number, newest first, with the current
    /// season present exactly once.
    #[instrument(skip(self))]
    pub async fn scrape_all_seasons(&self, url: &str) -> Result<Vec<SeasonRecord>> {
        let profile = self.fetcher.fetch_profile(url).await?;
        let current = profile.current_season;

        let mut records = vec![parser::build_season_record(
            &profile.segments,
            current,
            &profile.available_segments,
            Utc::now(),
        )];

        let past_seasons: Vec<u32> = profile
            .available_segments
            .iter()
            .filter_map(|s| s.attributes.season)
            .filter(|s| *s != current)
            .unique()
            .collect();

        // Sequential on purpose: the shared limiter paces these requests and
        // one profile crawl must not front-load the upstream site.
        for season in past_seasons {
            let season_url = season_url(url, season);
            match self.fetcher.fetch_profile(&season_url).await {
                Ok(p) => records.push(parser::build_season_record(
                    &p.segments,
                    season,
                    &p.available_segments,
                    Utc::now(),
                )),
                Err(e) => {
                    warn!(url, season, error = %e, "season scrape failed, omitting from crawl");
                }
            }
        }

        records.sort_by(|a, b| b.season_number.cmp(&a.season_number));
        debug!(url, count = records.len(), "season crawl complete");
        Ok(records)
    }
}

/// Append the season query parameter to a profile URL.
fn season_url(base: &str, season: u32) -> String {
    if base.contains('?') {
        format!("{base}&season={season}")
    } else {
        format!("{base}?season={season}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{profile_with_seasons, MockFetcher};

    const URL: &str = "https://tracker.example/profile/steam/player1";

    #[tokio::test]
    async fn scrapes_current_season_from_profile_metadata() {
        let fetcher = MockFetcher::new().on_profile(URL, profile_with_seasons(34, &[]));
        let client = TrackerClient::with_fetcher(Arc::new(fetcher));

        let record = client.scrape_current_season(URL).await.unwrap();

        assert_eq!(record.season_number, 34);
        assert!(record.playlist_1v1.is_some());
    }

    #[tokio::test]
    async fn crawls_every_advertised_season_newest_first() {
        let fetcher = MockFetcher::new()
            .on_profile(URL, profile_with_seasons(34, &[32, 33, 34]))
            .on_profile(
                &season_url(URL, 32),
                profile_with_seasons(34, &[32, 33, 34]),
            )
            .on_profile(
                &season_url(URL, 33),
                profile_with_seasons(34, &[32, 33, 34]),
            );
        let client = TrackerClient::with_fetcher(Arc::new(fetcher));

        let records = client.scrape_all_seasons(URL).await.unwrap();

        let seasons: Vec<u32> = records.iter().map(|r| r.season_number).collect();
        assert_eq!(seasons, vec![34, 33, 32]);
    }

    #[tokio::test]
    async fn current_season_appears_exactly_once() {
        // 34 is both the current season and listed in availableSegments.
        let fetcher = MockFetcher::new()
            .on_profile(URL, profile_with_seasons(34, &[33, 34, 34]))
            .on_profile(
                &season_url(URL, 33),
                profile_with_seasons(34, &[33, 34]),
            );
        let client = TrackerClient::with_fetcher(Arc::new(fetcher));

        let records = client.scrape_all_seasons(URL).await.unwrap();

        let current_count = records.iter().filter(|r| r.season_number == 34).count();
        assert_eq!(current_count, 1);
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn failed_season_is_omitted_without_aborting_the_crawl() {
        let fetcher = MockFetcher::new()
            .on_profile(URL, profile_with_seasons(34, &[31, 32, 33]))
            .on_profile(
                &season_url(URL, 31),
                profile_with_seasons(34, &[31, 32, 33]),
            )
            .failing(&season_url(URL, 32))
            .on_profile(
                &season_url(URL, 33),
                profile_with_seasons(34, &[31, 32, 33]),
            );
        let client = TrackerClient::with_fetcher(Arc::new(fetcher));

        let records = client.scrape_all_seasons(URL).await.unwrap();

        let seasons: Vec<u32> = records.iter().map(|r| r.season_number).collect();
        assert_eq!(seasons, vec![34, 33, 31]);
    }

    #[tokio::test]
    async fn no_advertised_seasons_yields_the_base_scrape_alone() {
        let fetcher = MockFetcher::new().on_profile(URL, profile_with_seasons(34, &[]));
        let client = TrackerClient::with_fetcher(Arc::new(fetcher));

        let records = client.scrape_all_seasons(URL).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].season_number, 34);
    }

    #[tokio::test]
    async fn base_scrape_failure_propagates() {
        let fetcher = MockFetcher::new().failing(URL);
        let client = TrackerClient::with_fetcher(Arc::new(fetcher));

        assert!(client.scrape_all_seasons(URL).await.is_err());
    }

    #[tokio::test]
    async fn season_fetches_are_sequential_and_ordered() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .on_profile(URL, profile_with_seasons(34, &[32, 33]))
                .on_profile(&season_url(URL, 32), profile_with_seasons(34, &[32, 33]))
                .on_profile(&season_url(URL, 33), profile_with_seasons(34, &[32, 33])),
        );
        let client = TrackerClient::with_fetcher(Arc::clone(&fetcher) as Arc<dyn ProfileFetcher>);

        client.scrape_all_seasons(URL).await.unwrap();

        let calls = fetcher.calls();
        assert_eq!(
            calls,
            vec![
                URL.to_string(),
                season_url(URL, 32),
                season_url(URL, 33),
            ]
        );
    }

    #[test]
    fn season_url_appends_query_parameter_correctly() {
        assert_eq!(
            season_url("https://t.example/p/steam/x", 5),
            "https://t.example/p/steam/x?season=5"
        );
        assert_eq!(
            season_url("https://t.example/p/steam/x?view=ranked", 5),
            "https://t.example/p/steam/x?view=ranked&season=5"
        );
    }
}
