//! Structured extraction: card JPEG → [`CardRecord`] via a chat-completion
//! vision endpoint.
//!
//! The request is a fixed two-message exchange — system instruction plus a
//! user turn carrying the schema text and the image as an inline base64
//! data URI — with a bounded output budget and low temperature. All prompt
//! engineering lives in [`crate::prompts`]; this module only speaks the
//! wire protocol.
//!
//! ## Dual response shape
//!
//! Depending on backend and model version, `message.content` arrives either
//! as a JSON **string** containing escaped JSON, or as a **native JSON
//! object**. [`parse_completion`] inspects the value kind before
//! deserializing and unifies both into the same strict [`CardRecord`] —
//! the two shapes must decode field-for-field identically.

use crate::card::{CardRecord, ExtractionMethod};
use crate::config::ScanConfig;
use crate::error::CardScanError;
use crate::pipeline::{api_error_detail, http_client};
use crate::prompts;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

/// Client for the structured-extraction endpoint.
///
/// Borrows the config; owns nothing else. Each call builds and drops its
/// own HTTP client, so no connection outlives the operation.
pub struct ExtractionClient<'a> {
    config: &'a ScanConfig,
}

impl<'a> ExtractionClient<'a> {
    pub fn new(config: &'a ScanConfig) -> Self {
        Self { config }
    }

    /// Extract a card record from a (transcoded) JPEG.
    ///
    /// Stamps `captured_at` and the extraction-method tag on success. No
    /// retries — a retry policy, if wanted, belongs to the caller.
    pub async fn extract(&self, jpeg: &[u8]) -> Result<CardRecord, CardScanError> {
        let client = http_client(self.config.api_timeout_secs)
            .map_err(|detail| CardScanError::Extraction { detail })?;
        let url = format!("{}/chat/completions", self.config.api_base_url);

        let image_uri = format!("data:image/jpeg;base64,{}", BASE64.encode(jpeg));
        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": prompts::SYSTEM_PROMPT},
                {"role": "user", "content": [
                    {"type": "text", "text": prompts::USER_PROMPT},
                    {"type": "image_url", "image_url": {"url": image_uri}}
                ]}
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "response_format": {"type": "json_object"}
        });

        debug!(
            "extract: {} bytes of JPEG to model {}",
            jpeg.len(),
            self.config.model
        );

        let response = client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CardScanError::Extraction {
                detail: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(CardScanError::Extraction {
                detail: format!(
                    "HTTP {status}: {}",
                    api_error_detail(&text).unwrap_or(text)
                ),
            });
        }

        let mut record = parse_completion(&text)?;
        record.extraction_method = ExtractionMethod::OpenAiVision;
        record.captured_at = Some(Utc::now());
        info!("extract: read card '{}'", record.display_name());
        Ok(record)
    }
}

/// Parse a chat-completion response body into a [`CardRecord`].
///
/// Handles both content shapes (string-wrapped JSON and native object).
fn parse_completion(body: &str) -> Result<CardRecord, CardScanError> {
    #[derive(Deserialize)]
    struct Completion {
        choices: Vec<Choice>,
    }

    #[derive(Deserialize)]
    struct Choice {
        message: ChoiceMessage,
    }

    #[derive(Deserialize)]
    struct ChoiceMessage {
        content: Value,
    }

    let completion: Completion =
        serde_json::from_str(body).map_err(|e| CardScanError::Extraction {
            detail: format!("malformed completion response: {e}"),
        })?;

    let content = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CardScanError::Extraction {
            detail: "completion response contained no choices".into(),
        })?
        .message
        .content;

    match content {
        Value::String(raw) => serde_json::from_str(&raw).map_err(|e| CardScanError::Extraction {
            detail: format!("card JSON (string-wrapped) did not match the schema: {e}"),
        }),
        content @ Value::Object(_) => {
            serde_json::from_value(content).map_err(|e| CardScanError::Extraction {
                detail: format!("card JSON did not match the schema: {e}"),
            })
        }
        other => Err(CardScanError::Extraction {
            detail: format!("unexpected content kind in completion: {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD_JSON: &str = r#"{"name_en":"Monkey D. Luffy","name_jp":"モンキー・D・ルフィ","type":"Leader","cost":4,"power":6000,"confidences":{"name":0.97}}"#;

    fn completion_with(content: Value) -> String {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
    }

    #[test]
    fn parses_string_wrapped_payload() {
        let body = completion_with(Value::String(CARD_JSON.to_string()));
        let record = parse_completion(&body).unwrap();
        assert_eq!(record.name_english.as_deref(), Some("Monkey D. Luffy"));
        assert_eq!(record.cost, Some(4));
        assert_eq!(record.power, Some(6000));
    }

    #[test]
    fn parses_native_object_payload() {
        let body = completion_with(serde_json::from_str(CARD_JSON).unwrap());
        let record = parse_completion(&body).unwrap();
        assert_eq!(record.name_english.as_deref(), Some("Monkey D. Luffy"));
        assert_eq!(record.power, Some(6000));
    }

    #[test]
    fn both_shapes_decode_identically() {
        let wrapped = parse_completion(&completion_with(Value::String(CARD_JSON.into()))).unwrap();
        let native =
            parse_completion(&completion_with(serde_json::from_str(CARD_JSON).unwrap())).unwrap();
        assert_eq!(wrapped, native);
    }

    #[test]
    fn rejects_empty_choices() {
        let err = parse_completion(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, CardScanError::Extraction { .. }));
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn rejects_non_json_content_string() {
        let body = completion_with(Value::String("I cannot read this card.".into()));
        assert!(parse_completion(&body).is_err());
    }

    #[test]
    fn rejects_numeric_content() {
        let body = completion_with(json!(42));
        let err = parse_completion(&body).unwrap_err();
        assert!(err.to_string().contains("unexpected content kind"));
    }
}
