//! Domain types for the caption-to-image pipeline.
//!
//! Field names mirror the CSV column headers one-to-one so every record
//! serializes and deserializes through serde without renames.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for one input row (the `image_id` column).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(pub String);

impl ImageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ImageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ImageId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Optional-column handling
// ---------------------------------------------------------------------------

/// Spellings that tabular tools write for a missing value.
const ABSENT_SENTINELS: &[&str] = &["nan", "none", "null"];

/// Collapse blank and sentinel strings to `None`.
pub fn present(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty()
        || ABSENT_SENTINELS
            .iter()
            .any(|s| trimmed.eq_ignore_ascii_case(s))
    {
        None
    } else {
        Some(value)
    }
}

/// serde helper for optional manifest columns: `""`, `NaN`, `None` and `null`
/// all read as absent.
pub fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(present))
}

/// Trim whitespace and remove one layer of matching enclosing quotes.
pub fn strip_enclosing_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('\u{201c}', '\u{201d}')] {
        if trimmed.len() >= open.len_utf8() + close.len_utf8()
            && trimmed.starts_with(open)
            && trimmed.ends_with(close)
        {
            let inner = &trimmed[open.len_utf8()..trimmed.len() - close.len_utf8()];
            return inner.trim();
        }
    }
    trimmed
}

// ---------------------------------------------------------------------------
// Input rows
// ---------------------------------------------------------------------------

/// One row of the input CSV (`image_id, context, description`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkUnit {
    pub image_id: ImageId,
    pub context: String,
    pub description: String,
}

impl WorkUnit {
    /// Trimmed id and context; description trimmed and unquoted.
    pub fn normalized(self) -> Self {
        Self {
            image_id: ImageId::from(self.image_id.0.trim()),
            context: self.context.trim().to_string(),
            description: strip_enclosing_quotes(&self.description).to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Manifest records
// ---------------------------------------------------------------------------

/// A row of the enhanced-descriptions manifest.
///
/// `enhanced_description` absent means enhancement has not succeeded yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancementRecord {
    pub image_id: ImageId,
    pub context: String,
    pub original_description: String,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub enhanced_description: Option<String>,
}

impl EnhancementRecord {
    /// A fresh, not-yet-enhanced record for `unit`.
    pub fn pending(unit: &WorkUnit) -> Self {
        Self {
            image_id: unit.image_id.clone(),
            context: unit.context.clone(),
            original_description: unit.description.clone(),
            enhanced_description: None,
        }
    }

    pub fn is_enhanced(&self) -> bool {
        self.enhanced_description.is_some()
    }

    /// The text handed to image generation: enhanced if present, else original.
    pub fn prompt_text(&self) -> &str {
        self.enhanced_description
            .as_deref()
            .unwrap_or(&self.original_description)
    }
}

/// A row of the images manifest.
///
/// `file_name` is relative to the output directory, forward-slash separated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRecord {
    pub image_id: ImageId,
    pub context: String,
    pub original_description: String,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub enhanced_description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub file_name: Option<String>,
}

impl RenderRecord {
    /// Record for `source` pointing at `file_name` (or at nothing yet).
    pub fn from_enhancement(source: &EnhancementRecord, file_name: Option<String>) -> Self {
        Self {
            image_id: source.image_id.clone(),
            context: source.context.clone(),
            original_description: source.original_description.clone(),
            enhanced_description: source.enhanced_description.clone(),
            file_name,
        }
    }
}

// ---------------------------------------------------------------------------
// Render parameters
// ---------------------------------------------------------------------------

/// Parameters forwarded to the image-generation capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    pub engine: String,
    pub steps: u32,
    pub cfg_scale: f32,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub sampler: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_preset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_guidance_preset: Option<String>,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            engine: "stable-diffusion-xl-1024-v1-0".to_string(),
            steps: 30,
            cfg_scale: 7.0,
            width: 1024,
            height: 1024,
            samples: 1,
            sampler: "K_DPMPP_2M".to_string(),
            style_preset: None,
            negative_prompt: None,
            clip_guidance_preset: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_id_display() {
        assert_eq!(ImageId::from("001").to_string(), "001");
        assert_eq!(ImageId::from(String::from("001")), ImageId::from("001"));
    }

    #[test]
    fn sentinels_read_as_absent() {
        for raw in ["", "   ", "nan", "NaN", "None", "null"] {
            assert_eq!(present(raw.to_string()), None, "{raw:?} should be absent");
        }
        assert_eq!(present("a red mug".to_string()), Some("a red mug".to_string()));
    }

    #[test]
    fn strips_one_layer_of_quotes() {
        assert_eq!(strip_enclosing_quotes("  \"a red mug\"  "), "a red mug");
        assert_eq!(strip_enclosing_quotes("\"\"nested\"\""), "\"nested\"");
        assert_eq!(strip_enclosing_quotes("'single'"), "single");
        assert_eq!(strip_enclosing_quotes("unquoted \"inner\" text"), "unquoted \"inner\" text");
        assert_eq!(strip_enclosing_quotes("\""), "\"");
    }

    #[test]
    fn work_unit_normalization() {
        let unit = WorkUnit {
            image_id: ImageId::from(" 001 "),
            context: " kitchen\t".to_string(),
            description: " \"a red mug\" ".to_string(),
        }
        .normalized();
        assert_eq!(unit.image_id, ImageId::from("001"));
        assert_eq!(unit.context, "kitchen");
        assert_eq!(unit.description, "a red mug");
    }

    #[test]
    fn prompt_text_falls_back_to_original() {
        let unit = WorkUnit {
            image_id: ImageId::from("001"),
            context: "kitchen".to_string(),
            description: "a red mug".to_string(),
        };
        let mut record = EnhancementRecord::pending(&unit);
        assert_eq!(record.prompt_text(), "a red mug");
        record.enhanced_description = Some("a glossy red ceramic mug".to_string());
        assert_eq!(record.prompt_text(), "a glossy red ceramic mug");
    }

    #[test]
    fn render_params_yaml_defaults_fill_gaps() {
        let params: RenderParams = serde_yaml::from_str("steps: 50\nwidth: 512\n").expect("parse");
        assert_eq!(params.steps, 50);
        assert_eq!(params.width, 512);
        assert_eq!(params.height, 1024);
        assert_eq!(params.sampler, "K_DPMPP_2M");
    }
}
