//! Pipeline orchestration entry points.
//!
//! [`process`] is the primary entry point: it runs the four stages in
//! order — transcode, extract, overlay, persist — as one logical unit of
//! work. No stage is skipped, no stage is retried, and a failure in any
//! stage aborts the rest; the error variant names the failing stage
//! ([`CardScanError::stage`]).
//!
//! Independent invocations share no mutable state: each owns its image
//! buffers and produces its own record, so callers may run many cards
//! concurrently without coordination.

use crate::card::{CardProcessingResult, CardRecord};
use crate::config::ScanConfig;
use crate::error::CardScanError;
use crate::pipeline::extract::ExtractionClient;
use crate::pipeline::ocr::ReadOcrClient;
use crate::pipeline::overlay::OverlayClient;
use crate::pipeline::transcode::transcode;
use crate::storage::CardStore;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

/// Run the full pipeline for one card photograph.
///
/// `content_type` describes `image_bytes` (`image/jpeg` or `image/png`);
/// it is forwarded to the overlay endpoint and the storage collaborator.
/// Only the copy sent for extraction is downscaled — the original bytes go
/// to overlay generation and storage untouched.
///
/// # Errors
/// The first failing stage's error, with all later stages skipped. In
/// particular the storage collaborator is never invoked when extraction or
/// overlay generation failed.
pub async fn process(
    image_bytes: &[u8],
    content_type: &str,
    config: &ScanConfig,
    store: &dyn CardStore,
) -> Result<CardProcessingResult, CardScanError> {
    info!("processing card photo ({} bytes)", image_bytes.len());

    // ── Stage 1: transcode the extraction copy ───────────────────────────
    let jpeg = transcode(image_bytes, config.max_long_edge, config.jpeg_quality)?;

    // ── Stage 2: structured extraction ───────────────────────────────────
    let card = ExtractionClient::new(config).extract(&jpeg).await?;

    // ── Stage 3: overlay from the original bytes ─────────────────────────
    let overlay = OverlayClient::new(config)
        .generate(image_bytes, content_type, &card, None)
        .await?;

    // ── Stage 4: upload artifacts, persist metadata ──────────────────────
    let original_name = if content_type == "image/png" {
        "original.png"
    } else {
        "original.jpg"
    };
    let original_url = store
        .upload_image(image_bytes, original_name, content_type)
        .await?;
    let translated_url = store
        .upload_image(&overlay.bytes, "translated.png", &overlay.content_type)
        .await?;
    let metadata = store
        .store_metadata(&card, &original_url, &translated_url)
        .await?;

    info!(
        "processed '{}' -> {} / {}",
        card.display_name(),
        original_url,
        translated_url
    );

    Ok(CardProcessingResult {
        card,
        overlay,
        metadata,
    })
}

/// Run the full pipeline over many independent photographs with bounded
/// concurrency.
///
/// The stages of one card stay strictly sequential; only distinct cards
/// overlap, since invocations share no mutable state. Results are returned
/// in input order, and one card's failure never aborts the others.
pub async fn process_many(
    images: &[(Vec<u8>, String)],
    config: &ScanConfig,
    store: &dyn CardStore,
    concurrency: usize,
) -> Vec<Result<CardProcessingResult, CardScanError>> {
    let mut results: Vec<(usize, Result<CardProcessingResult, CardScanError>)> =
        stream::iter(images.iter().enumerate().map(|(idx, (bytes, content_type))| {
            async move {
                let result = process(bytes, content_type, config, store).await;
                if let Err(ref e) = result {
                    warn!("card {idx}: {} stage failed: {e}", e.stage());
                }
                (idx, result)
            }
        }))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    results.sort_by_key(|(idx, _)| *idx);
    results.into_iter().map(|(_, result)| result).collect()
}

/// Analyze a card photograph without generating an overlay or persisting
/// anything: transcode + extract only.
pub async fn analyze(image_bytes: &[u8], config: &ScanConfig) -> Result<CardRecord, CardScanError> {
    let jpeg = transcode(image_bytes, config.max_long_edge, config.jpeg_quality)?;
    ExtractionClient::new(config).extract(&jpeg).await
}

/// Recognize printed text via the alternate submit-then-poll OCR backend.
///
/// Returns the newline-joined line text, or the
/// [`NO_TEXT_DETECTED`](crate::pipeline::ocr::NO_TEXT_DETECTED) sentinel
/// for an image with no readable text. Requires
/// [`ScanConfig::ocr`](crate::config::ScanConfig) to be configured.
pub async fn recognize_text(
    image_bytes: &[u8],
    config: &ScanConfig,
) -> Result<String, CardScanError> {
    let ocr = config.ocr.as_ref().ok_or_else(|| {
        CardScanError::InvalidConfig("no OCR backend configured (ScanConfig::ocr is None)".into())
    })?;
    ReadOcrClient::new(ocr, config.api_timeout_secs)
        .recognize(image_bytes)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    // Network-path behaviour is covered by the integration tests in
    // tests/pipeline.rs; here we check the orchestrator's early aborts.

    #[tokio::test]
    async fn invalid_image_aborts_before_any_network_or_storage_call() {
        let config = ScanConfig::builder("sk-test").build().unwrap();
        let store = MemoryStore::new();
        let err = process(b"not an image", "image/jpeg", &config, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, CardScanError::Decode { .. }));
        assert_eq!(store.upload_count(), 0);
    }

    #[tokio::test]
    async fn process_many_keeps_input_order_and_isolates_failures() {
        let config = ScanConfig::builder("sk-test").build().unwrap();
        let store = MemoryStore::new();
        let images = vec![
            (b"bad one".to_vec(), "image/jpeg".to_string()),
            (b"bad two".to_vec(), "image/jpeg".to_string()),
        ];
        let results = process_many(&images, &config, &store, 4).await;
        assert_eq!(results.len(), 2);
        for result in results {
            assert!(matches!(result, Err(CardScanError::Decode { .. })));
        }
        assert_eq!(store.upload_count(), 0);
    }

    #[tokio::test]
    async fn recognize_text_requires_ocr_config() {
        let config = ScanConfig::builder("sk-test").build().unwrap();
        let err = recognize_text(b"irrelevant", &config).await.unwrap_err();
        assert!(matches!(err, CardScanError::InvalidConfig(_)));
    }
}
