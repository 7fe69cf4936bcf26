//! Pipeline stages for card analysis and translation.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap a backend
//! (e.g. point extraction at a compatible proxy) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! photo ──▶ transcode ──▶ extract ──▶ overlay
//! (bytes)   (JPEG copy)   (record)    (English image)
//!                 ocr ────────────▶ (raw text, alternate path)
//! ```
//!
//! 1. [`transcode`] — decode, downscale to the longest-edge bound, re-encode
//!    as JPEG; pure and synchronous, only the extraction copy is resized
//! 2. [`extract`]  — chat-completion call returning the structured record;
//!    tolerates string-wrapped and native-object JSON payloads
//! 3. [`ocr`]      — submit-then-poll text recognition, the alternate
//!    backend; the only stage with an internal wait loop
//! 4. [`overlay`]  — image-edit call producing the English-relabelled image
//!
//! Stages 2–4 are the only network-bound work. None of them retries: a
//! failure maps to its stage's [`crate::error::CardScanError`] variant and
//! propagates.

pub mod extract;
pub mod ocr;
pub mod overlay;
pub mod transcode;

/// Build a one-shot HTTP client with the configured per-call timeout.
///
/// Construction failure is reported as a plain string so each stage can
/// wrap it in its own error variant.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| format!("HTTP client construction failed: {e}"))
}

/// Pull a human-readable message out of an API error body.
///
/// Both OpenAI-style endpoints wrap failures as
/// `{"error": {"message": "...", "type": "..."}}`. Returns `None` when the
/// body is not in that shape, in which case callers fall back to the raw
/// body text.
pub(crate) fn api_error_detail(body: &str) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: ApiError,
    }

    #[derive(serde::Deserialize)]
    struct ApiError {
        message: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match (parsed.error.kind, parsed.error.message) {
        (Some(kind), Some(message)) => Some(format!("{kind}: {message}")),
        (None, Some(message)) => Some(message),
        (Some(kind), None) => Some(kind),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_detail_extracts_type_and_message() {
        let body = r#"{"error":{"message":"billing hard limit reached","type":"insufficient_quota"}}"#;
        assert_eq!(
            api_error_detail(body).as_deref(),
            Some("insufficient_quota: billing hard limit reached")
        );
    }

    #[test]
    fn api_error_detail_rejects_other_shapes() {
        assert_eq!(api_error_detail("not json"), None);
        assert_eq!(api_error_detail(r#"{"status":"failed"}"#), None);
    }
}
