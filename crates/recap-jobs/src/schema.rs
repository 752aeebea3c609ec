//! Theme generation contract: schema derivation and response validation.
//!
//! The generation backend is asked for structured output constrained to the
//! [`ThemeDraft`] JSON Schema. Responses are validated here against the
//! contract's semantic rules (id membership, takeaway bounds, single-glyph
//! emoji) on top of shape-level deserialization. A response either becomes a
//! [`Theme`] or is rejected whole — fields are never coerced or defaulted.

use schemars::schema_for;
use serde_json::Value as JsonValue;

use recap_core::{defaults, Error, Result, Theme, ThemeDraft};

/// JSON Schema for the theme wire shape, sent with every generation request.
pub fn theme_schema() -> JsonValue {
    serde_json::to_value(schema_for!(ThemeDraft)).expect("ThemeDraft schema is serializable")
}

/// One theme's progress through generation.
///
/// `Pending` → (`Validated` | `Dropped`); a schema-invalid response is
/// retried once with the same input before the theme is dropped.
#[derive(Debug)]
pub enum ThemeGeneration {
    /// Not yet attempted.
    Pending,
    /// Response conformed; the theme enters the digest.
    Validated(Theme),
    /// Response failed validation after the retry; excluded from the digest.
    Dropped { reason: String },
}

impl ThemeGeneration {
    /// True once this theme has a validated result.
    pub fn is_validated(&self) -> bool {
        matches!(self, ThemeGeneration::Validated(_))
    }
}

/// Validate a raw generation response against the theme contract.
///
/// `allowed_ids` are the representative message ids the backend was shown,
/// in chronological order. The response's `messages_id` must be a
/// (large-enough) subset of them; the validated theme's ids are normalized
/// back to chronological order.
pub fn validate_draft(raw: &str, allowed_ids: &[i64]) -> Result<Theme> {
    let draft: ThemeDraft = serde_json::from_str(raw)
        .map_err(|e| Error::GenerationSchema(format!("Response does not parse: {e}")))?;

    if draft.messages_id.is_empty() {
        return Err(Error::GenerationSchema("messages_id is empty".to_string()));
    }
    if let Some(unknown) = draft
        .messages_id
        .iter()
        .find(|id| !allowed_ids.contains(id))
        .copied()
    {
        return Err(Error::GenerationSchema(format!(
            "messages_id references unknown message {unknown}"
        )));
    }

    // Normalize to chronological order and drop duplicate echoes.
    let message_ids: Vec<i64> = allowed_ids
        .iter()
        .copied()
        .filter(|id| draft.messages_id.contains(id))
        .collect();
    if message_ids.len() < defaults::REPRESENTATIVES_MIN
        || message_ids.len() > defaults::REPRESENTATIVES_MAX
    {
        return Err(Error::GenerationSchema(format!(
            "{} distinct message ids, need {}-{}",
            message_ids.len(),
            defaults::REPRESENTATIVES_MIN,
            defaults::REPRESENTATIVES_MAX
        )));
    }

    let name = draft.name.trim();
    if name.is_empty() {
        return Err(Error::GenerationSchema("name is empty".to_string()));
    }

    validate_emoji(&draft.emoji)?;

    let takeaway_count = draft.key_takeaways.len();
    if !(defaults::KEY_TAKEAWAYS_MIN..=defaults::KEY_TAKEAWAYS_MAX).contains(&takeaway_count) {
        return Err(Error::GenerationSchema(format!(
            "{takeaway_count} key takeaways, need {}-{}",
            defaults::KEY_TAKEAWAYS_MIN,
            defaults::KEY_TAKEAWAYS_MAX
        )));
    }
    if draft.key_takeaways.iter().any(|t| t.trim().is_empty()) {
        return Err(Error::GenerationSchema(
            "key takeaway is empty".to_string(),
        ));
    }

    Ok(Theme {
        message_ids,
        name: name.to_string(),
        emoji: draft.emoji,
        key_takeaways: draft.key_takeaways,
    })
}

/// A single emoji glyph: non-empty, no ASCII, and short enough that it can
/// only be one glyph (multi-scalar sequences like ZWJ families still pass).
fn validate_emoji(emoji: &str) -> Result<()> {
    if emoji.is_empty() {
        return Err(Error::GenerationSchema("emoji is empty".to_string()));
    }
    let scalar_count = emoji.chars().count();
    if scalar_count > 8 || emoji.chars().any(|c| c.is_ascii()) {
        return Err(Error::GenerationSchema(format!(
            "emoji {emoji:?} is not a single glyph"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALLOWED: &[i64] = &[10, 20, 30];

    fn valid_raw() -> String {
        serde_json::json!({
            "messages_id": [10, 20, 30],
            "name": "Weekend hiking plans",
            "emoji": "🥾",
            "key_takeaways": ["Saturday works for everyone", "Trail still undecided"],
        })
        .to_string()
    }

    #[test]
    fn test_theme_schema_declares_required_fields() {
        let schema = theme_schema();
        let required = schema["required"]
            .as_array()
            .expect("schema has required list");
        for field in ["messages_id", "name", "emoji", "key_takeaways"] {
            assert!(
                required.iter().any(|v| v == field),
                "{field} missing from required fields"
            );
        }
    }

    #[test]
    fn test_validate_accepts_conforming_draft() {
        let theme = validate_draft(&valid_raw(), ALLOWED).unwrap();
        assert_eq!(theme.message_ids, vec![10, 20, 30]);
        assert_eq!(theme.name, "Weekend hiking plans");
        assert_eq!(theme.emoji, "🥾");
    }

    #[test]
    fn test_validate_normalizes_id_order() {
        let raw = serde_json::json!({
            "messages_id": [30, 10, 20],
            "name": "x",
            "emoji": "🎯",
            "key_takeaways": ["a", "b"],
        })
        .to_string();
        let theme = validate_draft(&raw, ALLOWED).unwrap();
        assert_eq!(theme.message_ids, vec![10, 20, 30]);
    }

    #[test]
    fn test_validate_rejects_missing_emoji() {
        let raw = r#"{"messages_id": [10, 20, 30], "name": "x", "key_takeaways": ["a", "b"]}"#;
        let err = validate_draft(raw, ALLOWED).unwrap_err();
        assert!(matches!(err, Error::GenerationSchema(_)));
    }

    #[test]
    fn test_validate_rejects_ascii_emoji() {
        let raw = serde_json::json!({
            "messages_id": [10, 20, 30],
            "name": "x",
            "emoji": ":)",
            "key_takeaways": ["a", "b"],
        })
        .to_string();
        assert!(validate_draft(&raw, ALLOWED).is_err());
    }

    #[test]
    fn test_validate_accepts_zwj_emoji() {
        let raw = serde_json::json!({
            "messages_id": [10, 20, 30],
            "name": "x",
            "emoji": "👨‍👩‍👧",
            "key_takeaways": ["a", "b"],
        })
        .to_string();
        assert!(validate_draft(&raw, ALLOWED).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_message_id() {
        let raw = serde_json::json!({
            "messages_id": [10, 20, 99],
            "name": "x",
            "emoji": "🎯",
            "key_takeaways": ["a", "b"],
        })
        .to_string();
        let err = validate_draft(&raw, ALLOWED).unwrap_err();
        assert!(err.to_string().contains("99"));
    }

    #[test]
    fn test_validate_rejects_too_few_ids() {
        let raw = serde_json::json!({
            "messages_id": [10, 20],
            "name": "x",
            "emoji": "🎯",
            "key_takeaways": ["a", "b"],
        })
        .to_string();
        assert!(validate_draft(&raw, ALLOWED).is_err());
    }

    #[test]
    fn test_validate_rejects_takeaway_count_out_of_bounds() {
        for takeaways in [
            serde_json::json!(["only one"]),
            serde_json::json!(["1", "2", "3", "4", "5"]),
        ] {
            let raw = serde_json::json!({
                "messages_id": [10, 20, 30],
                "name": "x",
                "emoji": "🎯",
                "key_takeaways": takeaways,
            })
            .to_string();
            assert!(validate_draft(&raw, ALLOWED).is_err());
        }
    }

    #[test]
    fn test_validate_rejects_non_json() {
        let err = validate_draft("not json at all", ALLOWED).unwrap_err();
        assert!(matches!(err, Error::GenerationSchema(_)));
    }

    #[test]
    fn test_theme_generation_states() {
        assert!(!ThemeGeneration::Pending.is_validated());
        assert!(!ThemeGeneration::Dropped {
            reason: "x".to_string()
        }
        .is_validated());

        let theme = validate_draft(&valid_raw(), ALLOWED).unwrap();
        assert!(ThemeGeneration::Validated(theme).is_validated());
    }
}
