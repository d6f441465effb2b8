//! HTTP implementations of the capabilities, built on a blocking `ureq` agent.

mod openai;
mod stability;

use std::time::Duration;

pub use openai::{OpenAiEnhancer, OPENAI_CHAT_URL};
pub use stability::{StabilityGenerator, STABILITY_API_BASE};

use crate::capability::CapabilityError;

/// Per-request timeout for provider calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Longest error body kept in a [`CapabilityError::Http`].
const MAX_ERROR_BODY: usize = 512;

fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build()
}

fn capability_error(err: ureq::Error) -> CapabilityError {
    match err {
        ureq::Error::Status(status, response) => {
            let mut body = response.into_string().unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            CapabilityError::Http { status, body }
        }
        ureq::Error::Transport(transport) => CapabilityError::Transport(transport.to_string()),
    }
}
