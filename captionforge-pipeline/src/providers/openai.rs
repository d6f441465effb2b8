//! OpenAI chat-completions enhancer.

use serde::{Deserialize, Serialize};

use captionforge_prompt::ChatMessage;

use crate::capability::{CapabilityError, Enhancer};

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone)]
pub struct OpenAiEnhancer {
    agent: ureq::Agent,
    api_key: String,
    model: String,
    endpoint: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

impl OpenAiEnhancer {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            agent: super::agent(),
            api_key: api_key.into(),
            model: model.into(),
            endpoint: OPENAI_CHAT_URL.to_string(),
        }
    }

    /// Point at a compatible endpoint instead of api.openai.com.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Enhancer for OpenAiEnhancer {
    fn enhance(&self, messages: &[ChatMessage]) -> Result<String, CapabilityError> {
        let response = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(ChatRequest {
                model: &self.model,
                messages,
            })
            .map_err(super::capability_error)?;

        let body: ChatResponse = response
            .into_json()
            .map_err(|e| CapabilityError::Malformed(e.to_string()))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CapabilityError::Malformed("response has no message content".to_string()))
    }
}
