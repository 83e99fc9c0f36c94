use thiserror::Error;

/// Runtime failures raised by the market-data and notification collaborators.
///
/// None of these are fatal: a failing candidate, history entry or subscriber is
/// logged and skipped while its siblings keep going.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Transient fetch failure: {0}")]
    TransientFetch(String),

    #[error("Upstream returned HTTP {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("Malformed market data: {0}")]
    MalformedData(String),

    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

impl TrackerError {
    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            TrackerError::TransientFetch(_) => true,
            TrackerError::UpstreamStatus { status, .. } => *status == 429 || *status >= 500,
            TrackerError::MalformedData(_) | TrackerError::Delivery(_) => false,
        }
    }
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TrackerError::TransientFetch(format!("request timed out: {}", err))
        } else if err.is_decode() {
            TrackerError::MalformedData(err.to_string())
        } else {
            TrackerError::TransientFetch(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::MalformedData(err.to_string())
    }
}

/// Startup failures. Any of these aborts the process before scheduling begins.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
