//! Inline media payloads travel as standard base64

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{AppError, Result};

pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode `bytesBase64Encoded`, tolerating a `data:` URL prefix and line breaks
pub fn decode(payload: &str) -> Result<Vec<u8>> {
    let body = match payload.split_once(',') {
        Some((scheme, rest)) if scheme.starts_with("data:") => rest,
        _ => payload,
    };

    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    STANDARD
        .decode(compact)
        .map_err(|e| AppError::Upstream(format!("Invalid base64 payload: {}", e)))
}
