//! Pure validation for emails and candidate image files.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::UploadConfig;
use crate::error::ValidationError;
use crate::submission::{SelectedFile, ValidationResult};

/// `local@domain.tld`: non-empty segments free of whitespace and extra
/// `@`, with at least one dot in the domain part. Deliverability is the
/// backend's problem.
static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Check email syntax only. No DNS, no deliverability.
pub fn email_is_valid(text: &str) -> bool {
    EMAIL_SHAPE.is_match(text)
}

/// Check a candidate file: media type category first, then size.
///
/// The first failing check's reason is returned; later checks do not
/// run. A file exactly at the ceiling is accepted. The configured
/// explicit type allow-list is not consulted here; the category prefix
/// is the gate (see `UploadConfig::allowed_types`).
pub fn check_image(file: &SelectedFile, config: &UploadConfig) -> ValidationResult {
    if !file.mime_type.starts_with("image/") {
        return ValidationResult::reject(
            ValidationError::NotAnImage {
                mime_type: file.mime_type.clone(),
            }
            .to_string(),
        );
    }
    if file.size_bytes > config.max_file_size {
        return ValidationResult::reject(
            ValidationError::TooLarge {
                size_bytes: file.size_bytes,
                limit_bytes: config.max_file_size,
            }
            .to_string(),
        );
    }
    ValidationResult::accept()
}
