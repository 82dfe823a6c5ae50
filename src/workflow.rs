//! Submission workflow — one state machine per form instance.
//!
//! The public and admin forms are two independent `UploadForm`
//! instances. Each owns its email text and selected-file slot outright,
//! so concurrent attempts cannot bleed into each other. The in-flight
//! guard is the `Uploading` state itself: no queuing, no cancellation,
//! and no timeout. A request that never settles parks its instance in
//! `Uploading` until the future resolves (known gap).

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analytics::EventSink;
use crate::config::UploadConfig;
use crate::encode;
use crate::error::{Error, Result, ValidationError};
use crate::submission::{SelectedFile, SubmissionOutcome, SubmissionRequest, ValidationResult};
use crate::transport::Uploader;
use crate::validate;

// ── Destination ─────────────────────────────────────────────────────

/// Which sheet an instance submits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Public,
    Admin,
}

impl Destination {
    /// Wire flag: the admin path sets `isAdmin`.
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Short label for logging and event properties.
    pub fn label(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Admin => "admin",
        }
    }
}

// ── Form state ──────────────────────────────────────────────────────

/// Lifecycle state of one form instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    /// Interactive; accepting input and submits.
    Idle,
    /// Pre-flight checks running.
    Validating,
    /// One attempt in flight. Blocks further submits.
    Uploading,
    /// Attempt accepted; resets back to `Idle`.
    Success,
    /// Attempt rejected; re-arms back to `Idle` keeping input.
    Failed,
}

impl FormState {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(self, target: FormState) -> bool {
        use FormState::*;

        matches!(
            (self, target),
            (Idle, Validating)
                // Validation failed: no attempt was made.
                | (Validating, Idle)
                | (Validating, Uploading)
                | (Uploading, Success)
                | (Uploading, Failed)
                // Success resets the form; Failed re-arms it.
                | (Success, Idle)
                | (Failed, Idle)
        )
    }

    /// States in which the submit control is armed.
    pub fn accepts_submit(self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl std::fmt::Display for FormState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Uploading => "uploading",
            Self::Success => "success",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

// ── Upload form ─────────────────────────────────────────────────────

/// One form instance: email field, file slot, and the submission
/// workflow that drives them.
pub struct UploadForm {
    destination: Destination,
    config: Arc<UploadConfig>,
    uploader: Uploader,
    sink: Arc<dyn EventSink>,
    email: String,
    selected_file: Option<SelectedFile>,
    state: FormState,
}

impl UploadForm {
    pub fn new(
        destination: Destination,
        config: Arc<UploadConfig>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let uploader = Uploader::new(&config.endpoint_url);
        Self {
            destination,
            config,
            uploader,
            sink,
            email: String::new(),
            selected_file: None,
            state: FormState::Idle,
        }
    }

    /// The public-facing form.
    pub fn public(config: Arc<UploadConfig>, sink: Arc<dyn EventSink>) -> Self {
        Self::new(Destination::Public, config, sink)
    }

    /// The admin form: posts with the admin flag and holds its success
    /// state for the configured delay before resetting.
    pub fn admin(config: Arc<UploadConfig>, sink: Arc<dyn EventSink>) -> Self {
        Self::new(Destination::Admin, config, sink)
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected_file.as_ref()
    }

    /// Replace the email text. Syntax is checked at submit time.
    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
    }

    /// Whether a submit would pass pre-flight right now.
    pub fn can_submit(&self) -> bool {
        self.state.accepts_submit()
            && self.selected_file.is_some()
            && validate::email_is_valid(self.email.trim())
    }

    /// Offer a candidate file. An accepted candidate replaces the slot
    /// wholesale; a rejected one leaves the current selection untouched.
    pub async fn select_file(&mut self, file: SelectedFile) -> ValidationResult {
        let verdict = validate::check_image(&file, &self.config);
        if verdict.accepted {
            info!(
                destination = self.destination.label(),
                file = %file.name,
                size = file.size_bytes,
                "File selected"
            );
            self.sink
                .notify(
                    "File Selected",
                    json!({
                        "File Name": file.name,
                        "File Size": file.size_bytes,
                        "File Type": file.mime_type,
                        "File Size MB": format!("{:.2}", file.size_bytes as f64 / (1024.0 * 1024.0)),
                        "Destination": self.destination.label(),
                    }),
                )
                .await;
            self.selected_file = Some(file);
        } else {
            warn!(
                destination = self.destination.label(),
                file = %file.name,
                reason = verdict.reason.as_deref().unwrap_or(""),
                "File rejected"
            );
            self.sink
                .notify(
                    "File Validation Failed",
                    json!({
                        "Error": verdict.reason,
                        "File Size": file.size_bytes,
                        "File Type": file.mime_type,
                        "Destination": self.destination.label(),
                    }),
                )
                .await;
        }
        verdict
    }

    /// Clear email and file and return to `Idle`. An in-flight attempt
    /// is never interrupted.
    pub fn reset(&mut self) {
        if self.state == FormState::Uploading {
            warn!(
                destination = self.destination.label(),
                "Reset ignored: attempt in flight"
            );
            return;
        }
        self.email.clear();
        self.selected_file = None;
        self.state = FormState::Idle;
    }

    /// Run one submission attempt: validate, encode, transmit,
    /// interpret, and recover or reset.
    ///
    /// `Err` covers attempts that never completed an exchange
    /// (validation, read, network); a completed exchange returns the
    /// outcome, accepted or not. After a failure of any kind the email
    /// and file are preserved and the form is re-armed for retry.
    pub async fn submit(&mut self) -> Result<SubmissionOutcome> {
        if !self.state.accepts_submit() {
            warn!(
                destination = self.destination.label(),
                state = %self.state,
                "Submit ignored: attempt already in flight"
            );
            return Err(ValidationError::AttemptInFlight.into());
        }

        self.transition(FormState::Validating);
        let (email, file) = match self.preflight() {
            Ok(ok) => ok,
            Err(e) => {
                self.sink
                    .notify(
                        "Form Validation Failed",
                        json!({
                            "Has Email": !self.email.trim().is_empty(),
                            "Has File": self.selected_file.is_some(),
                            "Error": e.to_string(),
                            "Destination": self.destination.label(),
                        }),
                    )
                    .await;
                self.transition(FormState::Idle);
                return Err(e.into());
            }
        };

        self.transition(FormState::Uploading);
        let attempt_id = Uuid::new_v4();
        let started = Instant::now();
        let started_at = chrono::Utc::now();

        info!(
            attempt = %attempt_id,
            destination = self.destination.label(),
            file = %file.name,
            size = file.size_bytes,
            "Upload started"
        );
        self.sink
            .notify(
                "Upload Started",
                json!({
                    "Attempt ID": attempt_id.to_string(),
                    "Email": email,
                    "File Name": file.name,
                    "File Size": file.size_bytes,
                    "File Type": file.mime_type,
                    "Destination": self.destination.label(),
                }),
            )
            .await;
        self.sink.identify(&email).await;
        self.sink
            .set_profile(json!({
                "$email": email,
                "$last_seen": started_at.to_rfc3339(),
                "Last Upload": started_at.to_rfc3339(),
            }))
            .await;

        let encoded = match encode::encode_file(&file).await {
            Ok(encoded) => encoded,
            Err(e) => {
                self.fail_attempt(attempt_id, &email, &file, &e.to_string(), started)
                    .await;
                return Err(e.into());
            }
        };

        let request = SubmissionRequest {
            recipient_email: email.clone(),
            file_name: file.name.clone(),
            file_bytes_encoded: encode::strip_data_uri(&encoded).to_string(),
            mime_type: file.mime_type.clone(),
            destination_flag: self.destination.is_admin(),
        };

        match self.uploader.submit(&request).await {
            Ok(outcome) if outcome.accepted => {
                let elapsed = started.elapsed();
                info!(
                    attempt = %attempt_id,
                    destination = self.destination.label(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Upload completed"
                );
                self.sink
                    .notify(
                        "Upload Completed",
                        json!({
                            "Attempt ID": attempt_id.to_string(),
                            "Email": email,
                            "File Name": file.name,
                            "File Size": file.size_bytes,
                            "File Type": file.mime_type,
                            "Duration (ms)": elapsed.as_millis() as u64,
                            "Duration (s)": format!("{:.2}", elapsed.as_secs_f64()),
                            "Destination": self.destination.label(),
                            "Success": true,
                        }),
                    )
                    .await;
                self.transition(FormState::Success);
                if self.destination.is_admin() {
                    // Hold the success state visible before clearing.
                    tokio::time::sleep(self.config.admin_reset_delay).await;
                }
                self.reset();
                Ok(outcome)
            }
            Ok(outcome) => {
                let detail = outcome
                    .error_detail
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string());
                self.fail_attempt(attempt_id, &email, &file, &detail, started)
                    .await;
                Ok(outcome)
            }
            Err(e) => {
                self.fail_attempt(attempt_id, &email, &file, &e.to_string(), started)
                    .await;
                Err(Error::Transport(e))
            }
        }
    }

    /// Pre-flight: a syntactically valid email and an accepted file
    /// must both be present. Returns working copies so the slot itself
    /// stays untouched for retry.
    fn preflight(&self) -> std::result::Result<(String, SelectedFile), ValidationError> {
        let email = self.email.trim().to_string();
        let Some(file) = self.selected_file.clone() else {
            return Err(ValidationError::MissingInput {
                has_email: !email.is_empty(),
                has_file: false,
            });
        };
        if email.is_empty() {
            return Err(ValidationError::MissingInput {
                has_email: false,
                has_file: true,
            });
        }
        if !validate::email_is_valid(&email) {
            return Err(ValidationError::MalformedEmail { email });
        }
        Ok((email, file))
    }

    /// Shared failure path: event with duration, re-arm keeping input.
    async fn fail_attempt(
        &mut self,
        attempt_id: Uuid,
        email: &str,
        file: &SelectedFile,
        detail: &str,
        started: Instant,
    ) {
        let elapsed = started.elapsed();
        warn!(
            attempt = %attempt_id,
            destination = self.destination.label(),
            elapsed_ms = elapsed.as_millis() as u64,
            error = detail,
            "Upload failed"
        );
        self.sink
            .notify(
                "Upload Failed",
                json!({
                    "Attempt ID": attempt_id.to_string(),
                    "Email": email,
                    "File Name": file.name,
                    "Error Message": detail,
                    "Duration (ms)": elapsed.as_millis() as u64,
                    "Duration (s)": format!("{:.2}", elapsed.as_secs_f64()),
                    "Destination": self.destination.label(),
                    "Success": false,
                }),
            )
            .await;
        self.transition(FormState::Failed);
        // Re-arm for retry; email and file stay put.
        self.transition(FormState::Idle);
    }

    fn transition(&mut self, next: FormState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::Mutex;

    use super::*;

    /// Sink that records everything for assertions.
    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<(String, Value)>>,
        identified: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn notify(&self, event: &str, properties: Value) {
            self.events.lock().await.push((event.to_string(), properties));
        }
        async fn identify(&self, distinct_id: &str) {
            self.identified.lock().await.push(distinct_id.to_string());
        }
        async fn set_profile(&self, _properties: Value) {}
    }

    impl RecordingSink {
        async fn count(&self, name: &str) -> usize {
            self.events
                .lock()
                .await
                .iter()
                .filter(|(n, _)| n == name)
                .count()
        }
    }

    fn form_with_sink(destination: Destination) -> (UploadForm, Arc<RecordingSink>) {
        // Port 9 is unroutable; tests that reach the network expect the
        // send to fail.
        let config = Arc::new(UploadConfig::for_endpoint("http://127.0.0.1:9/submit"));
        let sink = Arc::new(RecordingSink::default());
        let form = UploadForm::new(destination, config, Arc::clone(&sink) as Arc<dyn EventSink>);
        (form, sink)
    }

    fn small_png() -> SelectedFile {
        SelectedFile::from_bytes("shot.png", "image/png", vec![0x89, 0x50, 0x4E, 0x47])
    }

    // ── State machine ───────────────────────────────────────────────

    #[test]
    fn state_transitions_valid() {
        assert!(FormState::Idle.can_transition_to(FormState::Validating));
        assert!(FormState::Validating.can_transition_to(FormState::Uploading));
        assert!(FormState::Validating.can_transition_to(FormState::Idle));
        assert!(FormState::Uploading.can_transition_to(FormState::Success));
        assert!(FormState::Uploading.can_transition_to(FormState::Failed));
        assert!(FormState::Success.can_transition_to(FormState::Idle));
        assert!(FormState::Failed.can_transition_to(FormState::Idle));
    }

    #[test]
    fn state_transitions_invalid() {
        assert!(!FormState::Idle.can_transition_to(FormState::Uploading));
        assert!(!FormState::Uploading.can_transition_to(FormState::Idle));
        assert!(!FormState::Success.can_transition_to(FormState::Uploading));
        assert!(!FormState::Failed.can_transition_to(FormState::Uploading));
        assert!(!FormState::Idle.can_transition_to(FormState::Idle));
    }

    #[test]
    fn only_idle_accepts_submit() {
        assert!(FormState::Idle.accepts_submit());
        assert!(!FormState::Validating.accepts_submit());
        assert!(!FormState::Uploading.accepts_submit());
        assert!(!FormState::Success.accepts_submit());
        assert!(!FormState::Failed.accepts_submit());
    }

    #[test]
    fn destination_flags() {
        assert!(!Destination::Public.is_admin());
        assert!(Destination::Admin.is_admin());
        assert_eq!(Destination::Public.label(), "public");
        assert_eq!(Destination::Admin.label(), "admin");
    }

    // ── Selection ───────────────────────────────────────────────────

    #[tokio::test]
    async fn select_valid_file_fills_slot_and_notifies() {
        let (mut form, sink) = form_with_sink(Destination::Public);
        let verdict = form.select_file(small_png()).await;
        assert!(verdict.accepted);
        assert!(form.selected_file().is_some());
        assert_eq!(sink.count("File Selected").await, 1);
    }

    #[tokio::test]
    async fn select_invalid_file_keeps_previous_selection() {
        let (mut form, sink) = form_with_sink(Destination::Public);
        form.select_file(small_png()).await;

        let pdf = SelectedFile::from_bytes("doc.pdf", "application/pdf", vec![0u8; 10]);
        let verdict = form.select_file(pdf).await;
        assert!(!verdict.accepted);
        assert_eq!(form.selected_file().unwrap().name, "shot.png");
        assert_eq!(sink.count("File Validation Failed").await, 1);
    }

    #[tokio::test]
    async fn select_replaces_slot_wholesale() {
        let (mut form, _sink) = form_with_sink(Destination::Public);
        form.select_file(small_png()).await;
        let other = SelectedFile::from_bytes("new.gif", "image/gif", vec![1, 2]);
        form.select_file(other).await;
        assert_eq!(form.selected_file().unwrap().name, "new.gif");
    }

    #[tokio::test]
    async fn can_submit_needs_both_inputs() {
        let (mut form, _sink) = form_with_sink(Destination::Public);
        assert!(!form.can_submit());

        form.set_email("a@b.c");
        assert!(!form.can_submit());

        form.select_file(small_png()).await;
        assert!(form.can_submit());

        form.set_email("not-an-email");
        assert!(!form.can_submit());
    }

    // ── Pre-flight failures (no network) ────────────────────────────

    #[tokio::test]
    async fn submit_without_email_is_validation_failure() {
        let (mut form, sink) = form_with_sink(Destination::Public);
        form.select_file(small_png()).await;

        let result = form.submit().await;
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::MissingInput {
                has_email: false,
                has_file: true,
            }))
        ));
        assert_eq!(form.state(), FormState::Idle);
        assert_eq!(sink.count("Form Validation Failed").await, 1);
        assert_eq!(sink.count("Upload Started").await, 0);
        // Input preserved for retry.
        assert!(form.selected_file().is_some());
    }

    #[tokio::test]
    async fn submit_without_file_is_validation_failure() {
        let (mut form, sink) = form_with_sink(Destination::Public);
        form.set_email("a@b.c");

        let result = form.submit().await;
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::MissingInput {
                has_email: true,
                has_file: false,
            }))
        ));
        assert_eq!(sink.count("Form Validation Failed").await, 1);
        assert_eq!(form.email(), "a@b.c");
    }

    #[tokio::test]
    async fn submit_with_malformed_email_is_validation_failure() {
        let (mut form, sink) = form_with_sink(Destination::Public);
        form.set_email("nobody-at-nowhere");
        form.select_file(small_png()).await;

        let result = form.submit().await;
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::MalformedEmail { .. }))
        ));
        assert_eq!(form.state(), FormState::Idle);
        assert_eq!(sink.count("Upload Started").await, 0);
    }

    // ── Failure paths through the attempt ───────────────────────────

    #[tokio::test]
    async fn network_failure_re_arms_and_keeps_input() {
        let (mut form, sink) = form_with_sink(Destination::Public);
        form.set_email("a@b.c");
        form.select_file(small_png()).await;

        let result = form.submit().await;
        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(form.state(), FormState::Idle);
        assert_eq!(form.email(), "a@b.c");
        assert!(form.selected_file().is_some());
        assert_eq!(sink.count("Upload Started").await, 1);
        assert_eq!(sink.count("Upload Failed").await, 1);
        assert_eq!(sink.count("Upload Completed").await, 0);
        let identified = sink.identified.lock().await;
        assert_eq!(identified.len(), 1);
        assert_eq!(identified[0], "a@b.c");
    }

    #[tokio::test]
    async fn unreadable_file_joins_failure_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vanishing.png");
        tokio::fs::write(&path, b"bytes").await.unwrap();

        let (mut form, sink) = form_with_sink(Destination::Public);
        form.set_email("a@b.c");
        let file = SelectedFile::from_path(&path).await.unwrap();
        form.select_file(file).await;

        // The file disappears between selection and submit.
        tokio::fs::remove_file(&path).await.unwrap();

        let result = form.submit().await;
        assert!(matches!(result, Err(Error::Encode(_))));
        assert_eq!(form.state(), FormState::Idle);
        assert!(form.selected_file().is_some());
        assert_eq!(sink.count("Upload Failed").await, 1);
    }

    #[tokio::test]
    async fn retry_after_failure_is_allowed() {
        let (mut form, sink) = form_with_sink(Destination::Public);
        form.set_email("a@b.c");
        form.select_file(small_png()).await;

        assert!(form.submit().await.is_err());
        assert!(form.can_submit());
        assert!(form.submit().await.is_err());
        assert_eq!(sink.count("Upload Failed").await, 2);
    }

    // ── Reset ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn reset_clears_inputs() {
        let (mut form, _sink) = form_with_sink(Destination::Public);
        form.set_email("a@b.c");
        form.select_file(small_png()).await;

        form.reset();
        assert_eq!(form.email(), "");
        assert!(form.selected_file().is_none());
        assert_eq!(form.state(), FormState::Idle);
    }
}
