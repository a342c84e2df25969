use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::SolverConfig;
use crate::error::{Result, TrackerError};
use crate::limiter::RateLimiter;
use crate::model::{RawProfile, ScrapedProfile};
use crate::store::ProfileFetcher;

/// Headroom over the solver's own solve budget before the HTTP call is
/// abandoned client-side.
const HTTP_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

const SOLVER_CMD_GET: &str = "request.get";
const SOLVER_STATUS_OK: &str = "ok";

/// Client for the challenge-solving proxy.
///
/// Every fetch delegates the actual page load to the solver, which defeats
/// the origin site's anti-bot layer and hands back the rendered body. The
/// profile JSON travels inside that body as pre-formatted text.
pub struct SolverClient {
    http: reqwest::Client,
    endpoint: String,
    limiter: RateLimiter,
    config: SolverConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SolverRequest<'a> {
    cmd: &'a str,
    url: &'a str,
    max_timeout: u64,
}

#[derive(Debug, Deserialize)]
struct SolverEnvelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    solution: Option<SolverSolution>,
}

#[derive(Debug, Deserialize)]
struct SolverSolution {
    response: Option<String>,
}

/// What one solver round trip amounts to, decided before any error leaves
/// this module so the retry/no-retry split stays explicit.
#[derive(Debug)]
enum SolveOutcome {
    Solved { body: String },
    ChallengeFailed { message: String },
    Malformed { reason: String },
}

impl SolverClient {
    /// Build a client from config. Fails fast when the endpoint is absent;
    /// that is a deployment problem no retry will fix.
    pub fn new(config: SolverConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(TrackerError::Configuration(
                "solver endpoint is empty".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.max_timeout_ms) + HTTP_TIMEOUT_MARGIN)
            .build()
            .map_err(|e| TrackerError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            limiter: RateLimiter::per_minute(config.requests_per_minute),
            config,
        })
    }

    /// One solve attempt: rate-limit slot, solver round trip, payload decode.
    async fn solve_once(&self, url: &str) -> Result<ScrapedProfile> {
        self.limiter.acquire().await;
        debug!(url, "requesting challenge solve");

        let request = SolverRequest {
            cmd: SOLVER_CMD_GET,
            url,
            max_timeout: self.config.max_timeout_ms,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| TrackerError::Transport {
                url: url.to_owned(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::UnexpectedStatus {
                url: url.to_owned(),
                status,
            });
        }

        let body = response.text().await.map_err(|e| TrackerError::Transport {
            url: url.to_owned(),
            source: e,
        })?;

        decode_payload(url, &body)
    }
}

#[async_trait]
impl ProfileFetcher for SolverClient {
    #[instrument(skip(self))]
    async fn fetch_profile(&self, url: &str) -> Result<ScrapedProfile> {
        with_retries(self.config.max_attempts, self.config.retry_delay, move |_| {
            self.solve_once(url)
        })
        .await
    }
}

/// Run `op` up to `max_attempts` times, sleeping `delay` between attempts.
/// Only retryable error classes get another attempt; the rest surface
/// immediately.
pub(crate) async fn with_retries<T, F, Fut>(max_attempts: u32, delay: Duration, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                warn!(attempt, max_attempts, error = %err, "transient solver error, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Decode one solver response body into a profile.
fn decode_payload(url: &str, body: &str) -> Result<ScrapedProfile> {
    let envelope: SolverEnvelope = serde_json::from_str(body).map_err(|e| malformed(url, format!("unparseable solver envelope: {e}")))?;

    match classify(envelope) {
        SolveOutcome::Solved { body } => {
            let payload = extract_payload(&body).map_err(|reason| malformed(url, reason))?;
            let raw: RawProfile = serde_json::from_str(&payload)
                .map_err(|e| malformed(url, format!("invalid embedded JSON: {e}")))?;
            normalize(url, raw)
        }
        SolveOutcome::ChallengeFailed { message } => Err(TrackerError::ChallengeFailed {
            url: url.to_owned(),
            message,
        }),
        SolveOutcome::Malformed { reason } => Err(malformed(url, reason)),
    }
}

fn classify(envelope: SolverEnvelope) -> SolveOutcome {
    if envelope.status != SOLVER_STATUS_OK {
        let message = if envelope.message.is_empty() {
            format!("solver status {:?}", envelope.status)
        } else {
            envelope.message
        };
        return SolveOutcome::ChallengeFailed { message };
    }

    let Some(solution) = envelope.solution else {
        return SolveOutcome::Malformed {
            reason: "missing solution object".to_string(),
        };
    };
    let Some(body) = solution.response else {
        return SolveOutcome::Malformed {
            reason: "solution has no response body".to_string(),
        };
    };

    SolveOutcome::Solved { body }
}

/// Pull the profile JSON out of the solved page. The origin serves raw API
/// JSON, which the solver's browser renders wrapped in a pre element.
fn extract_payload(body: &str) -> std::result::Result<String, String> {
    let document = Html::parse_document(body);
    let selector =
        Selector::parse("pre").map_err(|e| format!("invalid payload selector: {e}"))?;

    let pre = document
        .select(&selector)
        .next()
        .ok_or_else(|| "missing pre-formatted payload wrapper".to_string())?;

    Ok(pre.text().collect())
}

/// Raw payload to domain profile. Only the segment arrays are load-bearing;
/// missing surrounding objects synthesize zero values.
fn normalize(url: &str, raw: RawProfile) -> Result<ScrapedProfile> {
    let segments = raw
        .segments
        .ok_or_else(|| malformed(url, "payload has no segments array"))?;
    let available_segments = raw
        .available_segments
        .ok_or_else(|| malformed(url, "payload has no availableSegments array"))?;

    let platform = raw.platform_info.unwrap_or_default();
    let user = raw.user_info.unwrap_or_default();
    let metadata = raw.metadata.unwrap_or_default();

    Ok(ScrapedProfile {
        platform_slug: platform.platform_slug.unwrap_or_default(),
        platform_user_id: platform.platform_user_id.unwrap_or_default(),
        platform_user_handle: platform.platform_user_handle.unwrap_or_default(),
        user_id: user.user_id.unwrap_or_default(),
        is_premium: user.is_premium.unwrap_or_default(),
        last_updated: metadata.last_updated.and_then(|l| l.value),
        current_season: metadata.current_season.unwrap_or_default(),
        segments,
        available_segments,
    })
}

fn malformed(url: &str, reason: impl Into<String>) -> TrackerError {
    TrackerError::MalformedResponse {
        url: url.to_owned(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const URL: &str = "https://tracker.example/profile/steam/player1";

    fn envelope_with(profile_json: &str) -> String {
        let html = format!("<html><body><pre>{profile_json}</pre></body></html>");
        serde_json::json!({
            "status": "ok",
            "message": "Challenge solved!",
            "solution": { "response": html }
        })
        .to_string()
    }

    const FULL_PROFILE: &str = r#"{
        "platformInfo": {
            "platformSlug": "steam",
            "platformUserId": "7656119",
            "platformUserHandle": "player1"
        },
        "userInfo": { "userId": 42, "isPremium": true },
        "metadata": {
            "lastUpdated": { "value": "2024-02-01T10:00:00Z" },
            "currentSeason": 34
        },
        "segments": [
            {
                "type": "playlist",
                "attributes": { "playlistId": 1, "season": 34 },
                "stats": { "rating": { "value": 1721 } }
            }
        ],
        "availableSegments": [
            { "attributes": { "season": 33 }, "metadata": { "name": "Season 33" } }
        ]
    }"#;

    #[test]
    fn decodes_full_envelope_into_profile() {
        let profile = decode_payload(URL, &envelope_with(FULL_PROFILE)).unwrap();

        assert_eq!(profile.platform_slug, "steam");
        assert_eq!(profile.platform_user_handle, "player1");
        assert_eq!(profile.user_id, 42);
        assert!(profile.is_premium);
        assert_eq!(profile.current_season, 34);
        assert!(profile.last_updated.is_some());
        assert_eq!(profile.segments.len(), 1);
        assert_eq!(profile.available_segments.len(), 1);
    }

    #[test]
    fn missing_optional_objects_synthesize_zero_values() {
        let profile_json = r#"{ "segments": [], "availableSegments": [] }"#;

        let profile = decode_payload(URL, &envelope_with(profile_json)).unwrap();

        assert_eq!(profile.platform_slug, "");
        assert_eq!(profile.user_id, 0);
        assert!(!profile.is_premium);
        assert_eq!(profile.current_season, 0);
        assert!(profile.last_updated.is_none());
    }

    #[test]
    fn missing_segments_array_is_malformed() {
        let profile_json = r#"{ "availableSegments": [] }"#;

        let err = decode_payload(URL, &envelope_with(profile_json)).unwrap_err();

        assert!(matches!(err, TrackerError::MalformedResponse { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn challenge_failure_is_retryable() {
        let body = serde_json::json!({
            "status": "error",
            "message": "Challenge not solved"
        })
        .to_string();

        let err = decode_payload(URL, &body).unwrap_err();

        assert!(matches!(err, TrackerError::ChallengeFailed { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn ok_without_solution_is_malformed() {
        let body = serde_json::json!({ "status": "ok" }).to_string();

        let err = decode_payload(URL, &body).unwrap_err();

        assert!(matches!(err, TrackerError::MalformedResponse { .. }));
    }

    #[test]
    fn body_without_pre_wrapper_is_malformed() {
        let body = serde_json::json!({
            "status": "ok",
            "solution": { "response": "<html><body>Access denied</body></html>" }
        })
        .to_string();

        let err = decode_payload(URL, &body).unwrap_err();

        assert!(matches!(err, TrackerError::MalformedResponse { .. }));
    }

    #[test]
    fn garbage_inside_pre_wrapper_is_malformed() {
        let err = decode_payload(URL, &envelope_with("not json at all")).unwrap_err();

        assert!(matches!(err, TrackerError::MalformedResponse { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_errors_exhaust_the_attempt_budget() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = with_retries(3, Duration::from_secs(2), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(TrackerError::ChallengeFailed {
                    url: URL.to_owned(),
                    message: "still blocked".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(TrackerError::ChallengeFailed { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_errors_are_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = with_retries(3, Duration::from_secs(2), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(malformed(URL, "missing segments")) }
        })
        .await;

        assert!(matches!(result, Err(TrackerError::MalformedResponse { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn success_after_transient_failure_stops_retrying() {
        let calls = AtomicU32::new(0);

        let result = with_retries(3, Duration::from_secs(2), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(TrackerError::ChallengeFailed {
                        url: URL.to_owned(),
                        message: "blocked".to_string(),
                    })
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
