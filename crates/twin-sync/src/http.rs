//! HTTP implementation of [`SimEngine`] using `reqwest`.
//!
//! Talks to the simulation server's JSON API:
//!
//! | call      | route                  |
//! |-----------|------------------------|
//! | reset     | `POST /sim/reset`      |
//! | step      | `POST /sim/step`       |
//! | state     | `GET  /sim/state`      |
//! | summary   | `GET  /sim/summary`    |
//! | fast-fwd  | `POST /sim/run_to_finish` |

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use twin_events::{EpisodeConfig, Snapshot, Summary};

use crate::engine::SimEngine;
use crate::error::TransportError;
use crate::settings::ServerSettings;

const RESET: &str = "/sim/reset";
const STEP: &str = "/sim/step";
const STATE: &str = "/sim/state";
const SUMMARY: &str = "/sim/summary";
const RUN_TO_FINISH: &str = "/sim/run_to_finish";

#[derive(Serialize)]
struct StepRequest {
    speed_mult: f64,
}

/// Simulation engine behind an HTTP server.
#[derive(Clone)]
pub struct HttpEngine {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEngine {
    /// Builds a client for the given server.
    pub fn new(settings: &ServerSettings) -> Result<Self, TransportError> {
        let timeout = Duration::try_from_secs_f64(settings.timeout_secs)
            .map_err(|_| TransportError::Timeout(settings.timeout_secs))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| TransportError::Request {
                endpoint: "client",
                source,
            })?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Runs the episode to completion on the server in one call.
    pub async fn run_to_finish(&self) -> Result<Summary, TransportError> {
        self.post_json(RUN_TO_FINISH, &serde_json::json!({})).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
    ) -> Result<T, TransportError> {
        let response = self
            .client
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(|source| TransportError::Request { endpoint, source })?;
        decode(endpoint, response).await
    }

    async fn post_json<B, T>(&self, endpoint: &'static str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(endpoint))
            .json(body)
            .send()
            .await
            .map_err(|source| TransportError::Request { endpoint, source })?;
        decode(endpoint, response).await
    }
}

/// Checks the status and parses the body.
async fn decode<T: DeserializeOwned>(
    endpoint: &'static str,
    response: reqwest::Response,
) -> Result<T, TransportError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| TransportError::Request { endpoint, source })?;

    if !status.is_success() {
        return Err(TransportError::Status {
            endpoint,
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|source| TransportError::Decode { endpoint, source })
}

impl SimEngine for HttpEngine {
    async fn reset(&self, config: &EpisodeConfig) -> Result<Snapshot, TransportError> {
        self.post_json(RESET, config).await
    }

    async fn step(&self, speed_mult: f64) -> Result<Snapshot, TransportError> {
        self.post_json(STEP, &StepRequest { speed_mult }).await
    }

    async fn state(&self) -> Result<Snapshot, TransportError> {
        self.get_json(STATE).await
    }

    async fn summary(&self) -> Result<Summary, TransportError> {
        self.get_json(SUMMARY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let settings = ServerSettings {
            base_url: "http://localhost:8000/".into(),
            ..Default::default()
        };
        let engine = HttpEngine::new(&settings).unwrap();
        assert_eq!(engine.base_url(), "http://localhost:8000");
        assert_eq!(engine.url(STEP), "http://localhost:8000/sim/step");
    }

    #[test]
    fn test_unusable_timeout_is_rejected() {
        for timeout_secs in [f64::INFINITY, f64::NAN, -1.0] {
            let settings = ServerSettings {
                timeout_secs,
                ..Default::default()
            };
            let err = HttpEngine::new(&settings).err();
            assert!(matches!(err, Some(TransportError::Timeout(_))));
        }
    }

    #[test]
    fn test_step_request_body() {
        let body = serde_json::to_string(&StepRequest { speed_mult: 1.5 }).unwrap();
        assert_eq!(body, r#"{"speed_mult":1.5}"#);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let settings = ServerSettings {
            // Port 9 (discard) is closed on test machines
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 1.0,
        };
        let engine = HttpEngine::new(&settings).unwrap();
        let err = engine.summary().await.unwrap_err();
        assert_eq!(err.endpoint(), SUMMARY);
        assert!(matches!(err, TransportError::Request { .. }));
    }
}
