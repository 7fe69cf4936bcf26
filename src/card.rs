//! The card data model.
//!
//! [`CardRecord`] is the structured result of reading one card photograph.
//! Its serde field names are the authoritative wire contract shared with
//! [`crate::prompts::USER_PROMPT`]: the extraction backend is instructed to
//! emit exactly these keys, so the prompt schema and this struct must change
//! in lockstep.
//!
//! A record is immutable once the extraction client returns it. Every field
//! the model could not read stays `None` — absence, not an empty string, is
//! the "unreadable" signal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured attributes extracted from a single card image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CardRecord {
    /// Printed (Japanese) card name.
    #[serde(rename = "name_jp", default)]
    pub name_japanese: Option<String>,

    /// Official English card name, when the model knows it.
    #[serde(rename = "name_en", default)]
    pub name_english: Option<String>,

    /// Card category: `Leader`, `Character`, `Event`, or `Stage`.
    #[serde(rename = "type", default)]
    pub card_type: Option<String>,

    /// Card colour (`Red`, `Green`, `Blue`, `Purple`, `Black`, `Yellow`,
    /// `Dual`, or `Unknown`).
    #[serde(default)]
    pub color: Option<String>,

    /// Cost to play the card. Never negative when present.
    #[serde(default)]
    pub cost: Option<u32>,

    /// Power value. Never negative when present.
    #[serde(default)]
    pub power: Option<u32>,

    /// Combat attribute (`Slash`, `Strike`, `Special`, `Ranged`, `Wisdom`).
    #[serde(default)]
    pub attribute: Option<String>,

    /// Trait line, in printed order.
    #[serde(default)]
    pub traits: Option<Vec<String>>,

    #[serde(rename = "effect_main_jp", default)]
    pub effect_main_japanese: Option<String>,
    #[serde(rename = "effect_main_en", default)]
    pub effect_main_english: Option<String>,

    #[serde(rename = "effect_counter_jp", default)]
    pub effect_counter_japanese: Option<String>,
    #[serde(rename = "effect_counter_en", default)]
    pub effect_counter_english: Option<String>,

    #[serde(rename = "effect_trigger_jp", default)]
    pub effect_trigger_japanese: Option<String>,
    #[serde(rename = "effect_trigger_en", default)]
    pub effect_trigger_english: Option<String>,

    /// Set/expansion code, e.g. `OP01`.
    #[serde(default)]
    pub set_code: Option<String>,

    /// Collector number within the set, e.g. `OP01-003`.
    #[serde(default)]
    pub collector_number: Option<String>,

    /// Rarity code (`C`, `U`, `R`, `SR`, `L`, `SEC`, `P`, `SP`).
    #[serde(default)]
    pub rarity: Option<String>,

    /// Illustrator credit, when printed on the card.
    #[serde(default)]
    pub artist: Option<String>,

    #[serde(default)]
    pub copyright_footer: Option<String>,

    /// Free-text observations from the model.
    #[serde(default)]
    pub notes: Option<String>,

    /// Advisory text-region locations on the source image. Never validated
    /// against the image dimensions by this crate.
    #[serde(rename = "bbox_text_regions", default)]
    pub text_regions: Option<Vec<BoundingBox>>,

    /// Per-field-group certainty scores in `[0, 1]`.
    #[serde(default)]
    pub confidences: ConfidenceScores,

    /// Which backend produced this record. Not part of the prompt schema;
    /// stamped by the client after parsing.
    #[serde(default)]
    pub extraction_method: ExtractionMethod,

    /// When extraction completed (UTC). Stamped once by the extraction
    /// client, never mutated afterwards.
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
}

impl CardRecord {
    /// Primary display name: English if known, else Japanese, else `Unknown`.
    pub fn display_name(&self) -> &str {
        self.name_english
            .as_deref()
            .or(self.name_japanese.as_deref())
            .unwrap_or("Unknown")
    }
}

/// A labelled, normalized rectangle locating a text region on the source
/// image (`x`, `y`, `w`, `h` all in `[0, 1]` relative coordinates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub label: String,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "w")]
    pub width: f32,
    #[serde(rename = "h")]
    pub height: f32,
}

/// Optional certainty scores, one per extracted field group.
///
/// The scores are carried opaquely: nothing in the pipeline branches on
/// them, and a missing score means the backend offered no opinion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConfidenceScores {
    #[serde(default)]
    pub name: Option<f32>,
    #[serde(rename = "type", default)]
    pub card_type: Option<f32>,
    #[serde(default)]
    pub cost: Option<f32>,
    #[serde(default)]
    pub color: Option<f32>,
    #[serde(default)]
    pub effects: Option<f32>,
    #[serde(default)]
    pub set_code: Option<f32>,
    #[serde(default)]
    pub collector_number: Option<f32>,
    #[serde(default)]
    pub rarity: Option<f32>,
}

/// Which backend produced a [`CardRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExtractionMethod {
    /// Chat-completion vision extraction (the primary path).
    #[default]
    #[serde(rename = "openai-vision")]
    OpenAiVision,
    /// Submit-then-poll OCR (the alternate path; raw text only).
    #[serde(rename = "azure-read-ocr")]
    AzureReadOcr,
}

/// The English-relabelled version of the original card image.
///
/// Produced once per pipeline run; ownership moves to the storage
/// collaborator on persist.
#[derive(Debug, Clone)]
pub struct TranslatedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// The pipeline's sole externally observable output.
///
/// Only constructed after every stage succeeded — a failure in any stage
/// discards all partial work and propagates the error instead.
#[derive(Debug, Clone)]
pub struct CardProcessingResult {
    pub card: CardRecord,
    pub overlay: TranslatedImage,
    pub metadata: crate::storage::CardMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_deserialize_to_none() {
        let record: CardRecord = serde_json::from_str("{}").expect("empty object is valid");
        assert_eq!(record.name_japanese, None);
        assert_eq!(record.cost, None);
        assert_eq!(record.traits, None);
        assert_eq!(record.confidences, ConfidenceScores::default());
        assert_eq!(record.extraction_method, ExtractionMethod::OpenAiVision);
        assert!(record.captured_at.is_none());
    }

    #[test]
    fn schema_keys_round_trip() {
        let json = r#"{
            "name_jp": "モンキー・D・ルフィ",
            "name_en": "Monkey D. Luffy",
            "type": "Leader",
            "color": "Red",
            "cost": 4,
            "power": 6000,
            "attribute": "Strike",
            "traits": ["Straw Hat Crew", "Supernovas"],
            "effect_main_jp": "【起動メイン】\n自分のライフを1枚手札に加える。",
            "set_code": "OP01",
            "collector_number": "OP01-003",
            "rarity": "L",
            "bbox_text_regions": [{"label": "name", "x": 0.1, "y": 0.02, "w": 0.6, "h": 0.05}],
            "confidences": {"name": 0.98, "type": 0.95, "cost": 0.9}
        }"#;
        let record: CardRecord = serde_json::from_str(json).expect("schema payload parses");
        assert_eq!(record.display_name(), "Monkey D. Luffy");
        assert_eq!(record.card_type.as_deref(), Some("Leader"));
        assert_eq!(record.cost, Some(4));
        assert_eq!(record.power, Some(6000));
        assert_eq!(
            record.traits.as_deref(),
            Some(&["Straw Hat Crew".to_string(), "Supernovas".to_string()][..])
        );
        // Multi-line effect text keeps its embedded newline.
        assert!(record
            .effect_main_japanese
            .as_deref()
            .unwrap()
            .contains('\n'));
        let region = &record.text_regions.as_deref().unwrap()[0];
        assert_eq!(region.label, "name");
        assert!((region.width - 0.6).abs() < f32::EPSILON);
        assert_eq!(record.confidences.name, Some(0.98));
    }

    #[test]
    fn display_name_falls_back_to_japanese_then_unknown() {
        let mut record = CardRecord {
            name_japanese: Some("ゾロ".into()),
            ..CardRecord::default()
        };
        assert_eq!(record.display_name(), "ゾロ");
        record.name_japanese = None;
        assert_eq!(record.display_name(), "Unknown");
    }

    #[test]
    fn extraction_method_serializes_as_tag() {
        assert_eq!(
            serde_json::to_string(&ExtractionMethod::AzureReadOcr).unwrap(),
            "\"azure-read-ocr\""
        );
    }
}
