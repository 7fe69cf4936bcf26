//! Configuration types for the card pipeline.
//!
//! Every knob lives in one [`ScanConfig`] built via its
//! [`ScanConfigBuilder`]. A config is immutable for the lifetime of the
//! components constructed from it: clients borrow it and never write back,
//! so concurrent pipeline invocations can share one instance freely.
//!
//! All knobs are pure tuning parameters — endpoint URLs, credentials, model
//! identifiers, token/temperature budgets, and the image size/quality levers.
//! None of them changes pipeline behaviour beyond what the component
//! contracts describe.

use crate::error::CardScanError;
use std::fmt;

/// Default chat-completion endpoint base.
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Configuration for a card analysis pipeline.
///
/// # Example
/// ```rust
/// use cardscan::ScanConfig;
///
/// let config = ScanConfig::builder("sk-test")
///     .model("gpt-4o-mini")
///     .max_long_edge(1024)
///     .jpeg_quality(85)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ScanConfig {
    /// API key for the chat-completion and image-edit endpoints.
    pub api_key: String,

    /// Base URL for the chat-completion and image-edit endpoints.
    /// Default: [`DEFAULT_API_BASE_URL`]. Overridable for proxies and tests.
    pub api_base_url: String,

    /// Vision model used for structured extraction. Default: `gpt-4o-mini`.
    ///
    /// The extraction task is reading, not reasoning — the cost-optimized
    /// tier reads card text as reliably as the flagship models at a fraction
    /// of the price.
    pub model: String,

    /// Model used for overlay generation. Default: `gpt-image-1`.
    pub image_model: String,

    /// Maximum tokens the extraction model may generate. Default: 500.
    ///
    /// A full card record serializes to well under 400 tokens; 500 leaves
    /// headroom for dense effect text while keeping a hard cost ceiling.
    pub max_tokens: u32,

    /// Sampling temperature for extraction. Default: 0.2, clamped to 0–2.
    ///
    /// Low temperature keeps the model faithful to what is printed on the
    /// card instead of inventing plausible-sounding values.
    pub temperature: f32,

    /// Longest-edge bound for the copy sent to extraction. Default: 1024.
    ///
    /// The photo kept for storage and overlay generation is never resized;
    /// only the extraction payload is, to bound upload size and per-image
    /// token cost. Images already within the bound are sent as-is.
    pub max_long_edge: u32,

    /// JPEG re-encode quality for the extraction copy, 1–100. Default: 85.
    pub jpeg_quality: u8,

    /// Output resolution tier for overlay generation. Default: Auto.
    pub overlay_tier: OverlayTier,

    /// Per-HTTP-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Alternate OCR backend. `None` disables the OCR path entirely.
    pub ocr: Option<OcrConfig>,
}

/// Configuration for the submit-then-poll OCR backend.
#[derive(Clone)]
pub struct OcrConfig {
    /// Service endpoint base, e.g. `https://myresource.cognitiveservices.azure.com`.
    pub endpoint: String,

    /// Subscription key sent with every request.
    pub api_key: String,

    /// Delay between successive status polls in milliseconds. Default: 1000.
    pub poll_interval_ms: u64,

    /// Maximum number of status polls before giving up. Default: 30.
    ///
    /// Worst-case wall-clock spent polling is
    /// `poll_interval_ms * max_polls`; the read operation on a single card
    /// photo typically completes within the first few polls.
    pub max_polls: u32,
}

impl OcrConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            poll_interval_ms: 1000,
            max_polls: 30,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model: "gpt-4o-mini".to_string(),
            image_model: "gpt-image-1".to_string(),
            max_tokens: 500,
            temperature: 0.2,
            max_long_edge: 1024,
            jpeg_quality: 85,
            overlay_tier: OverlayTier::default(),
            api_timeout_secs: 60,
            ocr: None,
        }
    }
}

// Credentials must never leak into logs, so Debug is written by hand and
// prints key lengths only.
impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("api_key", &format!("<{} bytes>", self.api_key.len()))
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("image_model", &self.image_model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("max_long_edge", &self.max_long_edge)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("overlay_tier", &self.overlay_tier)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("ocr", &self.ocr.as_ref().map(|o| o.endpoint.as_str()))
            .finish()
    }
}

impl ScanConfig {
    /// Create a new builder seeded with the given API key.
    pub fn builder(api_key: impl Into<String>) -> ScanConfigBuilder {
        ScanConfigBuilder {
            config: ScanConfig {
                api_key: api_key.into(),
                ..Self::default()
            },
        }
    }
}

/// Builder for [`ScanConfig`].
#[derive(Debug)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.config.image_model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_long_edge(mut self, px: u32) -> Self {
        self.config.max_long_edge = px;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q;
        self
    }

    pub fn overlay_tier(mut self, tier: OverlayTier) -> Self {
        self.config.overlay_tier = tier;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn ocr(mut self, ocr: OcrConfig) -> Self {
        self.config.ocr = Some(ocr);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ScanConfig, CardScanError> {
        let c = &self.config;
        if c.api_key.trim().is_empty() {
            return Err(CardScanError::InvalidConfig("API key is empty".into()));
        }
        if c.jpeg_quality == 0 || c.jpeg_quality > 100 {
            return Err(CardScanError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.max_long_edge < 64 {
            return Err(CardScanError::InvalidConfig(format!(
                "max_long_edge must be ≥ 64 px, got {}",
                c.max_long_edge
            )));
        }
        if let Some(ref ocr) = c.ocr {
            if ocr.max_polls == 0 {
                return Err(CardScanError::InvalidConfig(
                    "OCR max_polls must be ≥ 1".into(),
                ));
            }
            if ocr.endpoint.trim().is_empty() {
                return Err(CardScanError::InvalidConfig("OCR endpoint is empty".into()));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Output resolution tier for the overlay image — the cost/quality lever.
///
/// Smaller tiers cost less per generation but lose small-text fidelity.
/// `Auto` lets the backend pick a size matching the input aspect ratio,
/// which suits the portrait layout of card photographs.
///
/// | Tier   | Output size | Use case |
/// |--------|-------------|----------|
/// | Small  | 256×256     | Thumbnails, previews |
/// | Medium | 512×512     | Collection galleries |
/// | Large  | 1024×1024   | Readable rules text |
/// | Auto   | backend-chosen | Default — preserves aspect ratio |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayTier {
    Small,
    Medium,
    Large,
    #[default]
    Auto,
}

impl OverlayTier {
    /// The `size` form-field value the image-edit endpoint expects.
    pub fn as_size_param(&self) -> &'static str {
        match self {
            OverlayTier::Small => "256x256",
            OverlayTier::Medium => "512x512",
            OverlayTier::Large => "1024x1024",
            OverlayTier::Auto => "auto",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = ScanConfig::builder("sk-test").build().unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_tokens, 500);
        assert_eq!(config.max_long_edge, 1024);
        assert_eq!(config.jpeg_quality, 85);
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert!(config.ocr.is_none());
    }

    #[test]
    fn temperature_is_clamped() {
        let config = ScanConfig::builder("sk-test")
            .temperature(5.0)
            .build()
            .unwrap();
        assert!((config.temperature - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_zero_jpeg_quality() {
        let err = ScanConfig::builder("sk-test")
            .jpeg_quality(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("JPEG quality"));
    }

    #[test]
    fn rejects_empty_api_key() {
        assert!(ScanConfig::builder("  ").build().is_err());
    }

    #[test]
    fn rejects_zero_poll_budget() {
        let mut ocr = OcrConfig::new("https://ocr.example", "key");
        ocr.max_polls = 0;
        let err = ScanConfig::builder("sk-test").ocr(ocr).build().unwrap_err();
        assert!(err.to_string().contains("max_polls"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = ScanConfig::builder("sk-secret-value").build().unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret-value"));
    }

    #[test]
    fn overlay_tier_size_params() {
        assert_eq!(OverlayTier::Large.as_size_param(), "1024x1024");
        assert_eq!(OverlayTier::Auto.as_size_param(), "auto");
    }
}
