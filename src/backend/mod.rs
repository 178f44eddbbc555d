//! Client for the recommendation backend.
//!
//! The backend owns the actual recommendation algorithm (geocoding, transit
//! time estimation, fairness scoring). This module performs the single
//! `POST {base_url}/recommend` call per tool invocation and normalises the
//! outcome into either the backend's JSON payload or a [`BackendError`].
//!
//! No retries are performed; one failed call is the final outcome.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::error::BackendError;

/// Purpose used when the caller does not specify one.
pub const DEFAULT_PURPOSE: &str = "cafe_talk";

/// Message used when a failed backend response carries no `detail`.
pub const FALLBACK_DETAIL: &str = "Failed to get recommendation";

/// One participant as sent to the backend.
///
/// Values are forwarded as the client sent them; the backend does the
/// type checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    /// Display name, usually a string.
    pub name: Value,
    /// Free-form origin (address, station name, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_text: Option<Value>,
}

/// Body of `POST /recommend`.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendRequest<'a> {
    /// Participants, at least two by the tool schema.
    pub participants: &'a [Participant],
    /// Meeting purpose.
    pub purpose: &'a Value,
}

/// HTTP client bound to one backend base URL.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    recommend_url: String,
}

impl BackendClient {
    /// Creates a client for the given backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            http: builder.build()?,
            recommend_url: format!("{}/recommend", config.base_url.trim_end_matches('/')),
        })
    }

    /// Returns the full URL of the recommendation endpoint.
    #[must_use]
    pub fn recommend_url(&self) -> &str {
        &self.recommend_url
    }

    /// Requests a recommendation.
    ///
    /// # Errors
    ///
    /// - [`BackendError::Rejected`] on a non-2xx status
    /// - [`BackendError::Transport`] if the request or body read fails
    /// - [`BackendError::InvalidBody`] if a 2xx body is not JSON
    pub async fn recommend(
        &self,
        participants: &[Participant],
        purpose: &Value,
    ) -> Result<Value, BackendError> {
        debug!(
            url = %self.recommend_url,
            participants = participants.len(),
            purpose = %purpose,
            "Calling recommendation backend"
        );

        let response = self
            .http
            .post(&self.recommend_url)
            .json(&RecommendRequest {
                participants,
                purpose,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let detail = rejection_detail(&body);
            warn!(status = status.as_u16(), detail = %detail, "Backend rejected request");
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        serde_json::from_str(&body).map_err(BackendError::InvalidBody)
    }
}

/// Extracts a human-readable reason from a failed response body.
///
/// String `detail` values are used as-is; structured ones (such as a list of
/// validation errors) are rendered as compact JSON.
fn rejection_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body)
        .ok()
        .as_ref()
        .and_then(|v| v.get("detail"))
    {
        Some(Value::String(detail)) => detail.clone(),
        Some(Value::Null) | None => FALLBACK_DETAIL.to_string(),
        Some(other) => other.to_string(),
    }
}
