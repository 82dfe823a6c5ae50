//! File-to-text encoding for the JSON wire body.

use std::path::Path;

use base64::{Engine as _, engine::general_purpose};

use crate::error::EncodeError;
use crate::submission::SelectedFile;

/// Base64-encode raw bytes with the standard alphabet.
pub fn encode_bytes(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Encode a selected file's contents for transport.
///
/// Reads the contents (from disk for path-backed selections) and
/// propagates read failures to the caller.
pub async fn encode_file(file: &SelectedFile) -> Result<String, EncodeError> {
    let bytes = file.read().await?;
    Ok(encode_bytes(&bytes))
}

/// Read a file from disk and encode it in one step.
pub async fn read_and_encode(path: impl AsRef<Path>) -> Result<String, EncodeError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| EncodeError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(encode_bytes(&bytes))
}

/// Drop a `data:<type>;base64,` head if one is present, returning the
/// bare payload.
pub fn strip_data_uri(encoded: &str) -> &str {
    match encoded.split_once(',') {
        Some((head, payload)) if head.starts_with("data:") => payload,
        _ => encoded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_bytes_round_trips() {
        let original: Vec<u8> = (0..=255).collect();
        let encoded = encode_bytes(&original);
        let decoded = general_purpose::STANDARD.decode(&encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn encode_bytes_empty() {
        assert_eq!(encode_bytes(b""), "");
    }

    #[tokio::test]
    async fn encode_file_memory_round_trips() {
        let file = SelectedFile::from_bytes("a.png", "image/png", vec![0x89, 0x50, 0x4E, 0x47]);
        let encoded = encode_file(&file).await.unwrap();
        let decoded = general_purpose::STANDARD.decode(&encoded).unwrap();
        assert_eq!(decoded, vec![0x89, 0x50, 0x4E, 0x47]);
    }

    #[tokio::test]
    async fn read_and_encode_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        let original = vec![7u8; 100];
        tokio::fs::write(&path, &original).await.unwrap();

        let encoded = read_and_encode(&path).await.unwrap();
        let decoded = general_purpose::STANDARD.decode(&encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[tokio::test]
    async fn read_and_encode_missing_file_propagates() {
        let result = read_and_encode("/nonexistent/blob.bin").await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/blob.bin"));
    }

    #[test]
    fn strip_data_uri_removes_head() {
        assert_eq!(strip_data_uri("data:image/png;base64,AAEC"), "AAEC");
    }

    #[test]
    fn strip_data_uri_leaves_bare_payload() {
        assert_eq!(strip_data_uri("AAEC"), "AAEC");
    }

    #[test]
    fn strip_data_uri_leaves_payload_with_comma() {
        // Only a data: head is stripped; commas inside a bare payload
        // are not a data URI (base64 never contains one anyway).
        assert_eq!(strip_data_uri("AA,EC"), "AA,EC");
    }
}
