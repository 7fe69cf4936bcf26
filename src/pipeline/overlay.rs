//! Overlay generation: original card photo → English-relabelled image via
//! an image-edit endpoint.
//!
//! This stage works from the **original** bytes, never the downscaled
//! extraction copy — the edit model needs full resolution to redraw small
//! rules text legibly. The request is a multipart form (model, prompt,
//! size tier, image, optional mask); the response carries the edited image
//! as base64, decoded here to raw bytes.
//!
//! The output tier is the cost lever: see
//! [`OverlayTier`](crate::config::OverlayTier) for the trade-off table.

use crate::card::{CardRecord, TranslatedImage};
use crate::config::ScanConfig;
use crate::error::CardScanError;
use crate::pipeline::{api_error_detail, http_client};
use crate::prompts;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

/// Client for the image-edit endpoint.
pub struct OverlayClient<'a> {
    config: &'a ScanConfig,
}

impl<'a> OverlayClient<'a> {
    pub fn new(config: &'a ScanConfig) -> Self {
        Self { config }
    }

    /// Generate the English overlay for one card.
    ///
    /// `mask`, when given, must be a PNG that is transparent wherever text
    /// may be replaced; without it the whole image is editable. The edit
    /// model always returns PNG data.
    pub async fn generate(
        &self,
        original: &[u8],
        content_type: &str,
        card: &CardRecord,
        mask: Option<&[u8]>,
    ) -> Result<TranslatedImage, CardScanError> {
        let client = http_client(self.config.api_timeout_secs)
            .map_err(|detail| CardScanError::Overlay { detail })?;
        let url = format!("{}/images/edits", self.config.api_base_url);

        let filename = if content_type == "image/png" {
            "card.png"
        } else {
            "card.jpg"
        };
        let image_part = Part::bytes(original.to_vec())
            .file_name(filename)
            .mime_str(content_type)
            .map_err(|e| CardScanError::Overlay {
                detail: format!("invalid image content type '{content_type}': {e}"),
            })?;

        let mut form = Form::new()
            .text("model", self.config.image_model.clone())
            .text("prompt", prompts::overlay_prompt(card))
            .text("size", self.config.overlay_tier.as_size_param())
            .part("image", image_part);

        if let Some(mask_png) = mask {
            let mask_part = Part::bytes(mask_png.to_vec())
                .file_name("mask.png")
                .mime_str("image/png")
                .map_err(|e| CardScanError::Overlay {
                    detail: format!("invalid mask: {e}"),
                })?;
            form = form.part("mask", mask_part);
        }

        debug!(
            "overlay: {} bytes to model {} at tier {}",
            original.len(),
            self.config.image_model,
            self.config.overlay_tier.as_size_param()
        );

        let response = client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CardScanError::Overlay {
                detail: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(CardScanError::Overlay {
                detail: format!(
                    "HTTP {status}: {}",
                    api_error_detail(&text).unwrap_or(text)
                ),
            });
        }

        let bytes = decode_edit_response(&text)?;
        info!("overlay: received {} bytes", bytes.len());
        Ok(TranslatedImage {
            bytes,
            content_type: "image/png".to_string(),
        })
    }
}

/// Decode the base64 image payload out of an image-edit response body.
fn decode_edit_response(body: &str) -> Result<Vec<u8>, CardScanError> {
    #[derive(Deserialize)]
    struct EditResponse {
        #[serde(default)]
        data: Vec<EditDatum>,
    }

    #[derive(Deserialize)]
    struct EditDatum {
        #[serde(default)]
        b64_json: Option<String>,
    }

    let parsed: EditResponse = serde_json::from_str(body).map_err(|e| CardScanError::Overlay {
        detail: format!("malformed edit response: {e}"),
    })?;

    let b64 = parsed
        .data
        .into_iter()
        .next()
        .and_then(|d| d.b64_json)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| CardScanError::Overlay {
            detail: "response contained no image data".into(),
        })?;

    BASE64.decode(b64.trim()).map_err(|e| CardScanError::Overlay {
        detail: format!("image payload is not valid base64: {e}"),
    })
}
