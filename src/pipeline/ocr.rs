//! Submit-then-poll text recognition — the alternate extraction backend.
//!
//! The read API is asynchronous on the server side: submission returns
//! `202 Accepted` with an `Operation-Location` header naming the job, and
//! the client polls that URL until the job reaches a terminal state.
//!
//! The poll loop is an explicit bounded state machine:
//!
//! ```text
//! Submitted ──▶ Running ──▶ Succeeded (flattened text)
//!                   │  ╲──▶ Failed    (OcrJob error)
//!                   ╰─────▶ TimedOut  (poll budget exhausted)
//! ```
//!
//! Two independent bounds apply: the caller's cancellation future is
//! honoured at every poll boundary, and the hard `max_polls` cap holds
//! regardless of cancellation. The response document is deserialized into
//! a typed schema — no dynamic field probing.

use crate::config::OcrConfig;
use crate::error::CardScanError;
use crate::pipeline::http_client;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Returned instead of an error when the backend affirmatively reports a
/// readable image with zero text regions.
pub const NO_TEXT_DETECTED: &str = "No text content detected in the image.";

/// Client for the submit-then-poll OCR backend.
pub struct ReadOcrClient<'a> {
    config: &'a OcrConfig,
    /// Per-HTTP-call timeout, shared with the other clients.
    timeout_secs: u64,
}

impl<'a> ReadOcrClient<'a> {
    pub fn new(config: &'a OcrConfig, timeout_secs: u64) -> Self {
        Self {
            config,
            timeout_secs,
        }
    }

    /// Recognize printed text in `image`, polling until the job completes.
    ///
    /// Returns the newline-joined text of all detected lines, or
    /// [`NO_TEXT_DETECTED`] when the job succeeds with no text regions.
    pub async fn recognize(&self, image: &[u8]) -> Result<String, CardScanError> {
        self.recognize_with_cancel(image, std::future::pending())
            .await
    }

    /// Like [`recognize`](Self::recognize), but aborts with
    /// [`CardScanError::Cancelled`] if `cancel` resolves first. The signal
    /// is checked at each poll boundary; the hard poll cap applies either
    /// way.
    pub async fn recognize_with_cancel<F>(
        &self,
        image: &[u8],
        cancel: F,
    ) -> Result<String, CardScanError>
    where
        F: Future<Output = ()>,
    {
        let client = http_client(self.timeout_secs)
            .map_err(|detail| CardScanError::Submission { detail })?;
        let location = self.submit(&client, image).await?;
        info!("ocr: job accepted at {location}");

        tokio::pin!(cancel);
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        for poll in 1..=self.config.max_polls {
            tokio::select! {
                _ = &mut cancel => {
                    warn!("ocr: cancelled after {} polls", poll - 1);
                    return Err(CardScanError::Cancelled);
                }
                _ = sleep(interval) => {}
            }

            let operation = self.fetch_operation(&client, &location).await?;
            debug!("ocr: poll {poll}/{} -> {:?}", self.config.max_polls, operation.status);

            match operation.status {
                ReadStatus::Succeeded => {
                    let text = operation
                        .analyze_result
                        .map(|r| flatten_read_results(&r))
                        .unwrap_or_else(|| NO_TEXT_DETECTED.to_string());
                    return Ok(text);
                }
                ReadStatus::Failed => {
                    let error = operation.error.unwrap_or_default();
                    return Err(CardScanError::OcrJob {
                        code: error.code,
                        message: error.message,
                    });
                }
                ReadStatus::NotStarted | ReadStatus::Running => continue,
            }
        }

        Err(CardScanError::OcrTimeout {
            polls: self.config.max_polls,
            interval_ms: self.config.poll_interval_ms,
        })
    }

    /// Submit the image and return the job-location URL from the response
    /// header. Fails with [`CardScanError::Submission`] before any poll is
    /// attempted when the endpoint rejects the call or omits the header.
    async fn submit(
        &self,
        client: &reqwest::Client,
        image: &[u8],
    ) -> Result<String, CardScanError> {
        let url = format!(
            "{}/vision/v3.2/read/analyze",
            self.config.endpoint.trim_end_matches('/')
        );

        let response = client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| CardScanError::Submission {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CardScanError::Submission {
                detail: format!("HTTP {status}: {body}"),
            });
        }

        response
            .headers()
            .get("Operation-Location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| CardScanError::Submission {
                detail: "response did not include an Operation-Location header".into(),
            })
    }

    async fn fetch_operation(
        &self,
        client: &reqwest::Client,
        location: &str,
    ) -> Result<ReadOperation, CardScanError> {
        let response = client
            .get(location)
            .header("Ocp-Apim-Subscription-Key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| CardScanError::OcrJob {
                code: "transport".into(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(CardScanError::OcrJob {
                code: format!("HTTP {}", status.as_u16()),
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|e| CardScanError::OcrJob {
            code: "malformed-status".into(),
            message: format!("{e}"),
        })
    }
}

// ── Typed response schema ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct ReadOperation {
    pub status: ReadStatus,
    #[serde(rename = "analyzeResult")]
    pub analyze_result: Option<AnalyzeResult>,
    #[serde(default)]
    pub error: Option<ReadJobError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum ReadStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeResult {
    #[serde(rename = "readResults", default)]
    pub read_results: Vec<ReadResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReadResult {
    #[serde(default)]
    pub lines: Vec<ReadLine>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReadLine {
    #[serde(default)]
    pub words: Vec<ReadWord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReadWord {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReadJobError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl Default for ReadJobError {
    fn default() -> Self {
        Self {
            code: "unknown".into(),
            message: "the backend reported failure without an error document".into(),
        }
    }
}

/// Flatten the page → line → word structure into one string.
///
/// Word fragments within a line are concatenated without separators — the
/// source text boundaries, not natural word spacing, define the output.
/// Lines are joined with `\n` across all pages.
fn flatten_read_results(result: &AnalyzeResult) -> String {
    let mut lines = Vec::new();
    for page in &result.read_results {
        for line in &page.lines {
            let text: String = line.words.iter().map(|w| w.text.as_str()).collect();
            if !text.is_empty() {
                lines.push(text);
            }
        }
    }
    if lines.is_empty() {
        NO_TEXT_DETECTED.to_string()
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze_result(json: &str) -> AnalyzeResult {
        serde_json::from_str(json).expect("fixture parses")
    }

    #[test]
    fn words_concatenate_without_separators() {
        let result = analyze_result(
            r#"{"readResults":[{"lines":[
                {"words":[{"text":"ゴムゴム"},{"text":"の"},{"text":"実"}]},
                {"words":[{"text":"リーダー"}]}
            ]}]}"#,
        );
        assert_eq!(flatten_read_results(&result), "ゴムゴムの実\nリーダー");
    }

    #[test]
    fn lines_join_across_pages() {
        let result = analyze_result(
            r#"{"readResults":[
                {"lines":[{"words":[{"text":"ONE"}]}]},
                {"lines":[{"words":[{"text":"PIECE"}]}]}
            ]}"#,
        );
        assert_eq!(flatten_read_results(&result), "ONE\nPIECE");
    }

    #[test]
    fn zero_text_regions_yield_the_sentinel() {
        let result = analyze_result(r#"{"readResults":[{"lines":[]}]}"#);
        assert_eq!(flatten_read_results(&result), NO_TEXT_DETECTED);
    }

    #[test]
    fn status_document_deserializes() {
        let op: ReadOperation = serde_json::from_str(
            r#"{"status":"running","createdDateTime":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(op.status, ReadStatus::Running);
        assert!(op.analyze_result.is_none());

        let op: ReadOperation = serde_json::from_str(
            r#"{"status":"failed","error":{"code":"InvalidImage","message":"too small"}}"#,
        )
        .unwrap();
        assert_eq!(op.status, ReadStatus::Failed);
        assert_eq!(op.error.unwrap().code, "InvalidImage");
    }
}
