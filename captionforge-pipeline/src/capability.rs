//! External capabilities the stage runners consume.
//!
//! Implementations live in [`crate::providers`]; tests substitute fakes.

use thiserror::Error;

use captionforge_core::RenderParams;
use captionforge_prompt::ChatMessage;

/// A failed call to an external capability. Always recoverable: the stage
/// logs it, leaves the unit's completion field absent, and moves on.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The service answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection, DNS, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The provider refused the prompt under its content policy.
    #[error("content filtered by provider")]
    ContentFiltered,
}

/// Text-completion capability used by the enhance stage.
pub trait Enhancer {
    /// Complete `messages`; returns the raw assistant text.
    fn enhance(&self, messages: &[ChatMessage]) -> Result<String, CapabilityError>;
}

/// Image-generation capability used by the render stage.
pub trait ImageGenerator {
    /// Encoded image bytes for `prompt`.
    fn generate(&self, prompt: &str, params: &RenderParams) -> Result<Vec<u8>, CapabilityError>;
}
