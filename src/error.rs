use thiserror::Error;

/// Failure categories surfaced by the indexing pipeline.
///
/// Extraction-local problems (unreadable file, malformed page, invalid
/// selector) are recovered where they occur and never reach this enum.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Rejected configuration. Raised before any file or network I/O.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The search server could not be reached.
    #[error("search server unreachable at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A request to the search server exceeded the bounded timeout.
    #[error("search server request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// The server answered but never reported itself healthy.
    #[error("search server unavailable: {0}")]
    Unavailable(String),

    /// The admin API key was rejected.
    #[error("search server rejected the API key (HTTP 401)")]
    Auth,

    /// The search server answered with an unexpected error status.
    #[error("search server error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// A document could not be encoded for the wire.
    #[error("failed to encode documents: {0}")]
    Encode(#[from] serde_json::Error),

    /// Bulk import in which not a single document was accepted.
    #[error("all {0} documents were rejected during import")]
    AllRejected(usize),
}

impl IndexError {
    /// Classify a transport error from the HTTP client.
    pub(crate) fn from_request(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err)
        } else {
            Self::Connect {
                url: url.to_string(),
                source: err,
            }
        }
    }

    /// Coarse category reported in the abort summary.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration",
            Self::Connect { .. } | Self::Timeout(_) | Self::Unavailable(_) | Self::Auth => {
                "connectivity"
            }
            Self::Api { .. } | Self::Encode(_) => "sink",
            Self::AllRejected(_) => "import",
        }
    }
}

// ── Tests ──
