//! HTTP transport for submission attempts.

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::debug;

use crate::error::TransportError;
use crate::submission::{SubmissionOutcome, SubmissionRequest};

/// Fallback detail when the backend reports failure without a message.
const UNKNOWN_ERROR: &str = "Unknown error";

/// Client for the submission endpoint. One POST per attempt.
///
/// The request goes out with a `text/plain` content type so browsers
/// issue it as a CORS simple request with no preflight; the backend
/// reads the body as JSON regardless. Changing this to
/// `application/json` changes observable behavior against the real
/// backend.
#[derive(Debug, Clone)]
pub struct Uploader {
    endpoint_url: String,
    client: reqwest::Client,
}

impl Uploader {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Send one submission and normalize the reply into an outcome.
    ///
    /// Returns `Err` only when the exchange itself fails (connect,
    /// send, body read); a completed exchange always yields a
    /// `SubmissionOutcome`, accepted or not.
    pub async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionOutcome, TransportError> {
        let body = serde_json::to_string(request)?;

        let response = self
            .client
            .post(&self.endpoint_url)
            .header(CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed {
                url: self.endpoint_url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| TransportError::BodyRead(e.to_string()))?;

        debug!(status = %status, bytes = raw.len(), "Submission reply received");
        Ok(interpret_reply(status.is_success(), status.as_u16(), &raw))
    }
}

/// Reply shape the backend aims for. An absent `success` counts as
/// failure.
#[derive(Debug, Deserialize)]
struct BackendReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Normalize a reply body into an outcome.
///
/// Precedence, in order:
/// 1. body parses with `success: true`: accepted;
/// 2. body parses with `success` false or absent: rejected with the
///    backend's `error` or "Unknown error";
/// 3. body does not parse and the status is a failure: rejected with
///    `"{status} - {body}"`;
/// 4. body does not parse and the status is a success: accepted
///    (backends that answer with a bare "OK").
///
/// The backend's reply shape is not trusted; keep the full chain.
fn interpret_reply(status_ok: bool, status: u16, raw: &str) -> SubmissionOutcome {
    match serde_json::from_str::<BackendReply>(raw) {
        Ok(reply) if reply.success => SubmissionOutcome::success(),
        Ok(reply) => {
            SubmissionOutcome::failure(reply.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string()))
        }
        Err(_) if !status_ok => SubmissionOutcome::failure(format!("{status} - {raw}")),
        Err(_) => SubmissionOutcome::success(),
    }
}
