//! Error types for the synchronization core.
//!
//! Uses `thiserror` for typed errors. Reaching the end of an episode is not
//! an error; the control loop reports it as [`crate::LoopExit::Completed`].

use twin_events::InvalidConfig;

/// A call to the simulation server failed.
///
/// Never retried automatically; the control loop stops and hands it to the
/// caller for display.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection, timeout, or body transfer failure.
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    /// The configured request timeout is not a usable duration.
    #[error("invalid request timeout: {0} seconds")]
    Timeout(f64),

    /// The response body did not match the expected schema.
    #[error("could not decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl TransportError {
    /// Endpoint path of the failed call.
    pub fn endpoint(&self) -> &'static str {
        match self {
            TransportError::Request { endpoint, .. }
            | TransportError::Status { endpoint, .. }
            | TransportError::Decode { endpoint, .. } => endpoint,
            TransportError::Timeout(_) => "client",
        }
    }
}

/// Errors loading client settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Episode(#[from] InvalidConfig),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Errors surfaced by [`crate::ControlLoop`] operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] InvalidConfig),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = TransportError::Status {
            endpoint: "/sim/step",
            status: 503,
            body: "engine busy".into(),
        };
        assert_eq!(err.to_string(), "/sim/step returned 503: engine busy");
        assert_eq!(err.endpoint(), "/sim/step");
    }

    #[test]
    fn test_sync_error_wraps_transport() {
        let err: SyncError = TransportError::Status {
            endpoint: "/sim/summary",
            status: 500,
            body: String::new(),
        }
        .into();
        assert!(matches!(err, SyncError::Transport(_)));
    }
}
