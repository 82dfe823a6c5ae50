//! Analytics event sink.
//!
//! The workflow reports lifecycle events here and never looks at the
//! result: a sink must swallow its own failures, so a broken analytics
//! backend can never interrupt an upload.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Fire-and-forget sink for submission lifecycle events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Record a named lifecycle event.
    async fn notify(&self, event: &str, properties: Value);

    /// Bind subsequent events to a user id.
    async fn identify(&self, distinct_id: &str);

    /// Attach profile fields to the identified user.
    async fn set_profile(&self, properties: Value);
}

/// Sink that drops everything. Default wiring when analytics are
/// disabled.
pub struct NoopSink;

#[async_trait]
impl EventSink for NoopSink {
    async fn notify(&self, _event: &str, _properties: Value) {}
    async fn identify(&self, _distinct_id: &str) {}
    async fn set_profile(&self, _properties: Value) {}
}

/// Sink posting to the Mixpanel ingestion API.
///
/// Events go to `/track`, profile updates to `/engage`, both as the
/// classic base64-wrapped `data` form payload. Super-properties (app
/// version, platform) are merged onto every event. Delivery problems
/// are logged and dropped.
pub struct MixpanelSink {
    token: SecretString,
    api_host: String,
    client: reqwest::Client,
    super_properties: Value,
    distinct_id: RwLock<Option<String>>,
}

impl MixpanelSink {
    pub fn new(token: SecretString) -> Self {
        Self::with_api_host(token, "https://api.mixpanel.com")
    }

    /// Point the sink at a different ingestion host.
    pub fn with_api_host(token: SecretString, api_host: impl Into<String>) -> Self {
        Self {
            token,
            api_host: api_host.into(),
            client: reqwest::Client::new(),
            super_properties: json!({
                "App Version": env!("CARGO_PKG_VERSION"),
                "Platform": "headless",
            }),
            distinct_id: RwLock::new(None),
        }
    }

    async fn post_encoded(&self, path: &str, payload: &Value) {
        let data = general_purpose::STANDARD.encode(payload.to_string());
        let url = format!("{}/{path}", self.api_host);
        match self.client.post(&url).form(&[("data", data)]).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(path, "Analytics payload delivered");
            }
            Ok(resp) => {
                warn!(path, status = %resp.status(), "Analytics endpoint refused payload");
            }
            Err(e) => {
                warn!(path, error = %e, "Analytics delivery failed");
            }
        }
    }
}

#[async_trait]
impl EventSink for MixpanelSink {
    async fn notify(&self, event: &str, properties: Value) {
        let distinct_id = self.distinct_id.read().await.clone();
        let payload = track_payload(
            self.token.expose_secret(),
            distinct_id.as_deref(),
            event,
            properties,
            &self.super_properties,
            Utc::now(),
        );
        self.post_encoded("track", &payload).await;
    }

    async fn identify(&self, distinct_id: &str) {
        *self.distinct_id.write().await = Some(distinct_id.to_string());
    }

    async fn set_profile(&self, properties: Value) {
        let Some(distinct_id) = self.distinct_id.read().await.clone() else {
            warn!("Profile update skipped: no identified user");
            return;
        };
        let payload = engage_payload(self.token.expose_secret(), &distinct_id, properties);
        self.post_encoded("engage", &payload).await;
    }
}

/// Build a `/track` payload: super-properties first, caller properties
/// on top, then the reserved fields.
fn track_payload(
    token: &str,
    distinct_id: Option<&str>,
    event: &str,
    properties: Value,
    super_properties: &Value,
    now: DateTime<Utc>,
) -> Value {
    let mut props = serde_json::Map::new();
    if let Value::Object(base) = super_properties.clone() {
        props.extend(base);
    }
    if let Value::Object(extra) = properties {
        props.extend(extra);
    }
    props.insert("token".to_string(), json!(token));
    props.insert("time".to_string(), json!(now.timestamp()));
    props.insert("Timestamp".to_string(), json!(now.to_rfc3339()));
    if let Some(id) = distinct_id {
        props.insert("distinct_id".to_string(), json!(id));
    }
    json!({ "event": event, "properties": Value::Object(props) })
}

/// Build an `/engage` profile-set payload.
fn engage_payload(token: &str, distinct_id: &str, set: Value) -> Value {
    json!({
        "$token": token,
        "$distinct_id": distinct_id,
        "$set": set,
    })
}
