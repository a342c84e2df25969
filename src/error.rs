/// All errors that can occur while fetching and normalizing tracker profiles.
///
/// The retry policy hangs off this taxonomy: transport and challenge failures
/// are transient and retried, while configuration and malformed-payload errors
/// are surfaced immediately. [`TrackerError::is_retryable`] is the single
/// source of truth for that split.
#[derive(thiserror::Error, Debug)]
pub enum TrackerError {
    /// Solver endpoint missing or unusable at construction time. Fatal.
    #[error("solver misconfigured: {0}")]
    Configuration(String),

    /// HTTP request to the solver failed (network, DNS, TLS, timeout, etc.).
    #[error("solver request failed for {url}: {source}")]
    Transport {
        url: String,
        source: reqwest::Error,
    },

    /// Solver returned a non-success HTTP status code.
    #[error("unexpected solver status {status} for {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The solver could not defeat the origin site's challenge. Surfaced as a
    /// service-unavailable condition once retries are exhausted.
    #[error("challenge solve failed for {url}: {message}")]
    ChallengeFailed { url: String, message: String },

    /// The solver succeeded but the embedded payload is unusable. This is a
    /// data-shape error, never retried.
    #[error("malformed payload from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },
}

impl TrackerError {
    /// Whether the retry policy applies to this error class.
    pub fn is_retryable(&self) -> bool {
        match self {
            TrackerError::Transport { .. }
            | TrackerError::UnexpectedStatus { .. }
            | TrackerError::ChallengeFailed { .. } => true,
            TrackerError::Configuration(_) | TrackerError::MalformedResponse { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
