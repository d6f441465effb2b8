//! Content-derived artifact identity.
//!
//! An artifact's relative path is a pure function of
//! `(image_id, context, prompt text, extension)`:
//!
//! ```text
//! <context>/<image_id>_<xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx>.<ext>
//! ```
//!
//! The grouped hex is the first 128 bits of
//! `SHA-256(image_id 0x1F context 0x1F text)`. Paths always use `/` and never
//! start with one.

use sha2::{Digest, Sha256};

use crate::types::ImageId;

/// Separates the hashed fields (ASCII unit separator).
pub const FIELD_DELIMITER: char = '\u{1f}';

/// Stand-in for a path component that sanitizes to nothing.
const EMPTY_COMPONENT: &str = "_";

/// Full SHA-256 hex digest over the delimited fields.
pub fn content_digest(id: &ImageId, context: &str, text: &str) -> String {
    hex::encode(digest_bytes(id, context, text))
}

/// Stable identifier for the work unit content, grouped `8-4-4-4-12`.
pub fn deterministic_name(id: &ImageId, context: &str, text: &str) -> String {
    let hex = hex::encode(&digest_bytes(id, context, text)[..16]);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

/// Relative artifact path under the output directory.
///
/// `extension` is expected without a leading dot (see
/// `OutputSettings::extension`).
pub fn artifact_name(id: &ImageId, context: &str, text: &str, extension: &str) -> String {
    format!(
        "{}/{}_{}.{}",
        sanitize_component(context),
        sanitize_component(id.as_str()),
        deterministic_name(id, context, text),
        extension
    )
}

/// Normalize a stored artifact name to the canonical relative form.
///
/// Backslashes become `/`, leading slashes and `./` segments are dropped.
pub fn normalize_relative(name: &str) -> String {
    name.replace('\\', "/")
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn digest_bytes(id: &ImageId, context: &str, text: &str) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(id.as_str().as_bytes());
    h.update(FIELD_DELIMITER.to_string().as_bytes());
    h.update(context.as_bytes());
    h.update(FIELD_DELIMITER.to_string().as_bytes());
    h.update(text.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&h.finalize());
    out
}

/// Keep `[A-Za-z0-9._-]`, replace everything else with `_`.
fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        EMPTY_COMPONENT.to_string()
    } else {
        cleaned
    }
}
