//! Error types for the cardscan library.
//!
//! One enum covers the whole pipeline. Each variant corresponds to exactly
//! one failing stage, so callers can branch on the variant (or on
//! [`CardScanError::stage`]) without string-matching messages:
//!
//! * [`CardScanError::Decode`] — the input bytes are not a readable raster
//!   image. Not retryable; the caller must supply a valid photograph.
//! * [`CardScanError::Extraction`] / [`CardScanError::Overlay`] /
//!   [`CardScanError::Submission`] / [`CardScanError::OcrJob`] — an upstream
//!   API rejected the call or returned malformed data. The caller may retry
//!   with backoff; this library never retries internally.
//! * [`CardScanError::OcrTimeout`] — the poll budget was exhausted. The job
//!   cannot be resumed; resubmit the image as a fresh job.
//!
//! A stage failure aborts the remaining stages. No stage substitutes a
//! default [`crate::card::CardRecord`] for an error — partial reads are
//! expressed through absent fields and the confidence vector, never through
//! a swallowed failure.

use thiserror::Error;

/// The pipeline stage an error originated in.
///
/// Returned by [`CardScanError::stage`] so callers that log or surface
/// failures can name the stage without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Decoding / downscaling / re-encoding the input image.
    Transcode,
    /// Structured extraction via the chat-completion endpoint.
    Extract,
    /// OCR job submission and polling (alternate backend).
    Ocr,
    /// English overlay generation via the image-edit endpoint.
    Overlay,
    /// Artifact upload or metadata persistence.
    Store,
    /// Configuration validation.
    Config,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Transcode => "transcode",
            PipelineStage::Extract => "extract",
            PipelineStage::Ocr => "ocr",
            PipelineStage::Overlay => "overlay",
            PipelineStage::Store => "store",
            PipelineStage::Config => "config",
        };
        f.write_str(name)
    }
}

/// All errors returned by the cardscan library.
#[derive(Debug, Error)]
pub enum CardScanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The input bytes could not be decoded as a raster image.
    #[error("Could not decode the input image: {detail}\nSupply a valid JPEG, PNG, or WebP photograph.")]
    Decode { detail: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The chat-completion endpoint rejected the call or returned a payload
    /// that does not decode to a card record.
    #[error("Card extraction failed: {detail}")]
    Extraction { detail: String },

    // ── OCR errors (alternate backend) ────────────────────────────────────
    /// OCR job submission failed or the job-location header was missing.
    #[error("OCR submission rejected: {detail}")]
    Submission { detail: String },

    /// The OCR backend reported the job as failed.
    #[error("OCR job failed ({code}): {message}")]
    OcrJob { code: String, message: String },

    /// The job never reached a terminal state within the poll budget.
    ///
    /// The old job handle is dead at this point — resubmit the image as a
    /// fresh job rather than polling further.
    #[error("OCR job still running after {polls} polls at {interval_ms}ms intervals\nResubmit the image as a new job.")]
    OcrTimeout { polls: u32, interval_ms: u64 },

    /// The caller's cancellation signal fired before the job finished.
    #[error("OCR polling cancelled before the job reached a terminal state")]
    Cancelled,

    // ── Overlay errors ────────────────────────────────────────────────────
    /// The image-edit endpoint rejected the call or returned no image data.
    #[error("Overlay generation failed: {detail}")]
    Overlay { detail: String },

    // ── Storage errors ────────────────────────────────────────────────────
    /// An image artifact could not be uploaded.
    #[error("Failed to upload '{filename}': {detail}")]
    Upload { filename: String, detail: String },

    /// Card metadata could not be persisted.
    #[error("Failed to persist card metadata: {detail}")]
    Persist { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CardScanError {
    /// The stage this error originated in.
    pub fn stage(&self) -> PipelineStage {
        match self {
            CardScanError::Decode { .. } => PipelineStage::Transcode,
            CardScanError::Extraction { .. } => PipelineStage::Extract,
            CardScanError::Submission { .. }
            | CardScanError::OcrJob { .. }
            | CardScanError::OcrTimeout { .. }
            | CardScanError::Cancelled => PipelineStage::Ocr,
            CardScanError::Overlay { .. } => PipelineStage::Overlay,
            CardScanError::Upload { .. } | CardScanError::Persist { .. } => PipelineStage::Store,
            CardScanError::InvalidConfig(_) => PipelineStage::Config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_display_names_the_problem() {
        let e = CardScanError::Decode {
            detail: "unsupported format".into(),
        };
        assert!(e.to_string().contains("unsupported format"));
    }

    #[test]
    fn ocr_timeout_display_carries_budget() {
        let e = CardScanError::OcrTimeout {
            polls: 30,
            interval_ms: 1000,
        };
        let msg = e.to_string();
        assert!(msg.contains("30 polls"), "got: {msg}");
        assert!(msg.contains("1000ms"), "got: {msg}");
    }

    #[test]
    fn ocr_job_display_carries_upstream_code() {
        let e = CardScanError::OcrJob {
            code: "InvalidImage".into(),
            message: "image dimensions out of range".into(),
        };
        assert!(e.to_string().contains("InvalidImage"));
    }

    #[test]
    fn stage_mapping_is_total() {
        assert_eq!(
            CardScanError::Decode {
                detail: String::new()
            }
            .stage(),
            PipelineStage::Transcode
        );
        assert_eq!(
            CardScanError::Submission {
                detail: String::new()
            }
            .stage(),
            PipelineStage::Ocr
        );
        assert_eq!(
            CardScanError::Upload {
                filename: "a.jpg".into(),
                detail: String::new()
            }
            .stage(),
            PipelineStage::Store
        );
        assert_eq!(PipelineStage::Overlay.to_string(), "overlay");
    }
}
