//! # cardscan
//!
//! Analyse trading-card photographs and produce English-translated overlay
//! images using vision models.
//!
//! ## Why this crate?
//!
//! Reading a Japanese trading card with classical OCR gives you a wall of
//! unlabelled text — no notion of which string is the name, the cost, or a
//! trigger effect. This crate instead sends the photo to a vision model
//! with a strict output schema and gets back one typed [`CardRecord`],
//! then asks an image-edit model for an English-relabelled copy of the
//! card, and hands both to a pluggable storage collaborator.
//!
//! ## Pipeline Overview
//!
//! ```text
//! photo
//!  │
//!  ├─ 1. Transcode  downscale a copy to the long-edge bound, re-encode JPEG
//!  ├─ 2. Extract    vision chat-completion → CardRecord (schema-constrained)
//!  ├─ 3. Overlay    image-edit call → English-relabelled image
//!  └─ 4. Persist    upload both images + store metadata via CardStore
//! ```
//!
//! An alternate backend ([`recognize_text`]) submits the photo to an
//! asynchronous OCR service and polls a bounded number of times for the raw
//! line text — useful when only a transcript is needed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cardscan::{process, FsStore, ScanConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScanConfig::builder(std::env::var("OPENAI_API_KEY")?)
//!         .build()?;
//!     let store = FsStore::new("./cards");
//!     let photo = std::fs::read("luffy.jpg")?;
//!
//!     let result = process(&photo, "image/jpeg", &config, &store).await?;
//!     println!("{} (cost {:?})", result.card.display_name(), result.card.cost);
//!     Ok(())
//! }
//! ```
//!
//! ## Cost levers
//!
//! | Knob | Default | Effect |
//! |------|---------|--------|
//! | `max_long_edge` | 1024 px | Extraction upload size / image tokens |
//! | `jpeg_quality`  | 85      | Extraction upload size |
//! | `max_tokens`    | 500     | Extraction output ceiling |
//! | `overlay_tier`  | auto    | Overlay generation price and fidelity |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod card;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod process;
pub mod prompts;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use card::{
    BoundingBox, CardProcessingResult, CardRecord, ConfidenceScores, ExtractionMethod,
    TranslatedImage,
};
pub use config::{OcrConfig, OverlayTier, ScanConfig, ScanConfigBuilder, DEFAULT_API_BASE_URL};
pub use error::{CardScanError, PipelineStage};
pub use pipeline::ocr::{ReadOcrClient, NO_TEXT_DETECTED};
pub use process::{analyze, process, process_many, recognize_text};
pub use storage::{CardMetadata, CardStore, FsStore, MemoryStore};
