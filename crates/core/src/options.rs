//! Presentation options: optional stylistic knobs for a collage.
//!
//! Every field is optional and absence means "provider default". Enum-like
//! fields are kept as free strings so that new values submitted by newer
//! clients still flow through to the prompt verbatim.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sentinel values
// ---------------------------------------------------------------------------

/// Form value meaning "no preference" for every enum-like field.
pub const VALUE_DEFAULT: &str = "default";

/// Form value meaning "no border" for [`PresentationOptions::border_style`].
pub const BORDER_NONE: &str = "none";

// ---------------------------------------------------------------------------
// PresentationOptions
// ---------------------------------------------------------------------------

/// Flat record of independent presentation knobs.
///
/// `label_placement` and `typography` only matter while labels are shown;
/// the prompt compiler ignores them when `show_labels == Some(false)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_palette: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typography: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_labels: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_placement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spacing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decorative_elements: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_style: Option<String>,
}

impl PresentationOptions {
    /// Whether labels are shown. Labels are on unless explicitly disabled.
    pub fn labels_shown(&self) -> bool {
        self.show_labels != Some(false)
    }

    /// Whether no field carries a value.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Drop sentinel and default values, returning `None` when nothing is left.
    ///
    /// - string fields: trimmed; empty and `"default"` become absent
    /// - `border_style`: `"none"` also becomes absent
    /// - `show_labels = true`, `texture = false`, `decorative_elements = false`
    ///   are the defaults and become absent
    pub fn normalized(self) -> Option<Self> {
        let normalized = Self {
            color_palette: clean_choice(self.color_palette, &[]),
            mood: clean_choice(self.mood, &[]),
            typography: clean_choice(self.typography, &[]),
            show_labels: self.show_labels.filter(|shown| !shown),
            label_placement: clean_choice(self.label_placement, &[]),
            layout: clean_choice(self.layout, &[]),
            spacing: clean_choice(self.spacing, &[]),
            background: clean_choice(self.background, &[]),
            texture: self.texture.filter(|on| *on),
            decorative_elements: self.decorative_elements.filter(|on| *on),
            border_style: clean_choice(self.border_style, &[BORDER_NONE]),
        };

        if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        }
    }
}

/// Trim a choice and discard it if it is empty, `"default"`, or one of the
/// extra sentinels.
fn clean_choice(value: Option<String>, extra_sentinels: &[&str]) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == VALUE_DEFAULT || extra_sentinels.contains(&trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_shown_by_default() {
        assert!(PresentationOptions::default().labels_shown());
        let hidden = PresentationOptions {
            show_labels: Some(false),
            ..Default::default()
        };
        assert!(!hidden.labels_shown());
    }

    #[test]
    fn normalized_drops_sentinels_and_defaults() {
        let opts = PresentationOptions {
            color_palette: Some("default".into()),
            mood: Some("  ".into()),
            show_labels: Some(true),
            texture: Some(false),
            decorative_elements: Some(false),
            border_style: Some("none".into()),
            ..Default::default()
        };
        assert_eq!(opts.normalized(), None);
    }

    #[test]
    fn normalized_keeps_real_choices() {
        let opts = PresentationOptions {
            color_palette: Some(" pastel ".into()),
            show_labels: Some(false),
            texture: Some(true),
            border_style: Some("polaroid".into()),
            ..Default::default()
        };
        let normalized = opts.normalized().expect("options should survive");
        assert_eq!(normalized.color_palette.as_deref(), Some("pastel"));
        assert_eq!(normalized.show_labels, Some(false));
        assert_eq!(normalized.texture, Some(true));
        assert_eq!(normalized.border_style.as_deref(), Some("polaroid"));
        assert_eq!(normalized.mood, None);
    }

    #[test]
    fn unknown_fields_deserialize_leniently() {
        let opts: PresentationOptions =
            serde_json::from_value(serde_json::json!({ "mood": "cosmic", "layout": "grid" }))
                .expect("partial options should deserialize");
        assert_eq!(opts.mood.as_deref(), Some("cosmic"));
        assert_eq!(opts.layout.as_deref(), Some("grid"));
        assert_eq!(opts.spacing, None);
    }

    #[test]
    fn serialization_omits_absent_fields() {
        let opts = PresentationOptions {
            mood: Some("edgy".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&opts).unwrap();
        assert_eq!(json, serde_json::json!({ "mood": "edgy" }));
    }
}
