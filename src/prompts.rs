//! Prompt text for the extraction and overlay backends.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the user prompt embeds the JSON schema
//!    that [`crate::card::CardRecord`] deserializes; keeping both in one
//!    crate (and testing their agreement below) prevents silent drift.
//!
//! 2. **Testability** — unit tests can inspect prompts directly without
//!    calling a real backend.

use crate::card::CardRecord;

/// System instruction for the structured-extraction call.
pub const SYSTEM_PROMPT: &str = r#"You are an expert trading-card collector and analyst. You will be shown a photograph of a single trading card from the One Piece card game. Read every printed element you can see: names, type line, colour, cost, power, attribute icon, traits, effect boxes, set code, collector number, rarity mark, and artist credit.

Guidelines:
1. Report only what is printed on the card. Leave a field null when the text is not visible or not legible.
2. Transcribe Japanese text exactly, character for character.
3. Provide English translations only where you are confident in them.
4. Score each confidence value between 0 and 1; use lower scores for fields you had to squint at."#;

/// User instruction for the structured-extraction call.
///
/// The SCHEMA block is the authoritative contract for
/// [`CardRecord`]'s field names and types — change them together.
pub const USER_PROMPT: &str = r#"Extract all visible details from the attached image and output ONLY a single valid JSON object conforming to the SCHEMA.
Keep line breaks in rules text as \n; normalize whitespace; no extra keys, no comments, no markdown.
IMPORTANT: Return ONLY the JSON object, no additional text, no explanations.

SCHEMA:
{
  "name_jp": "string or null",
  "name_en": "string or null",
  "type": "Event or Character or Leader or Stage or null",
  "color": "Red or Green or Blue or Purple or Black or Yellow or Dual or Unknown or null",
  "cost": "number or null",
  "power": "number or null",
  "attribute": "Slash or Strike or Special or Ranged or Wisdom or Unknown or null",
  "traits": ["string"] or null,
  "effect_main_jp": "string or null",
  "effect_main_en": "string or null",
  "effect_counter_jp": "string or null",
  "effect_counter_en": "string or null",
  "effect_trigger_jp": "string or null",
  "effect_trigger_en": "string or null",
  "set_code": "string or null",
  "collector_number": "string or null",
  "rarity": "C or U or R or SR or L or SEC or P or SP or Unknown or null",
  "artist": "string or null",
  "copyright_footer": "string or null",
  "notes": "string or null",
  "bbox_text_regions": [
     {"label":"name","x":0,"y":0,"w":0,"h":0},
     {"label":"main_text","x":0,"y":0,"w":0,"h":0}
  ] or null,
  "confidences": {
    "name": "number or null",
    "type": "number or null",
    "cost": "number or null",
    "color": "number or null",
    "effects": "number or null",
    "set_code": "number or null",
    "collector_number": "number or null",
    "rarity": "number or null"
  }
}"#;

/// Fixed instruction for the image-edit overlay call.
const OVERLAY_INSTRUCTION: &str = "Replace all Japanese text in this trading card with accurate English equivalents. \
     Preserve the original layout, borders, art, icons, symbols, and numeric values. \
     Use clean, readable typography and align text to the existing boxes.";

/// Build the overlay prompt for one card.
///
/// The instruction itself is fixed; known translations from the extraction
/// step are appended as context so the edit model reuses them instead of
/// re-translating from pixels.
pub fn overlay_prompt(card: &CardRecord) -> String {
    let mut prompt = String::from(OVERLAY_INSTRUCTION);
    if let Some(name) = card.name_english.as_deref() {
        prompt.push_str(&format!(" The card name is \"{name}\"."));
    }
    if let Some(effect) = card.effect_main_english.as_deref() {
        prompt.push_str(&format!(" Main effect text: \"{effect}\"."));
    }
    if let Some(counter) = card.effect_counter_english.as_deref() {
        prompt.push_str(&format!(" Counter effect text: \"{counter}\"."));
    }
    if let Some(trigger) = card.effect_trigger_english.as_deref() {
        prompt.push_str(&format!(" Trigger effect text: \"{trigger}\"."));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every serde key of `CardRecord` must appear in the schema block, and
    /// the schema must carry the formatting rules the parser relies on.
    #[test]
    fn user_prompt_schema_matches_card_record() {
        let keys = [
            "name_jp",
            "name_en",
            "\"type\"",
            "color",
            "cost",
            "power",
            "attribute",
            "traits",
            "effect_main_jp",
            "effect_main_en",
            "effect_counter_jp",
            "effect_counter_en",
            "effect_trigger_jp",
            "effect_trigger_en",
            "set_code",
            "collector_number",
            "rarity",
            "artist",
            "copyright_footer",
            "notes",
            "bbox_text_regions",
            "confidences",
        ];
        for key in keys {
            assert!(USER_PROMPT.contains(key), "schema is missing {key}");
        }
        assert!(USER_PROMPT.contains("no extra keys"));
        assert!(USER_PROMPT.contains(r"\n"));
    }

    #[test]
    fn overlay_prompt_embeds_known_translations() {
        let card = CardRecord {
            name_english: Some("Monkey D. Luffy".into()),
            effect_main_english: Some("Draw 1 card.".into()),
            ..CardRecord::default()
        };
        let prompt = overlay_prompt(&card);
        assert!(prompt.contains("Monkey D. Luffy"));
        assert!(prompt.contains("Draw 1 card."));
        assert!(prompt.starts_with("Replace all Japanese text"));
    }

    #[test]
    fn overlay_prompt_without_translations_is_just_the_instruction() {
        let prompt = overlay_prompt(&CardRecord::default());
        assert_eq!(prompt, OVERLAY_INSTRUCTION);
    }
}
