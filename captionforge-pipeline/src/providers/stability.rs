//! Stability REST text-to-image generator.
//!
//! Requests `Accept: image/png`, so the body is the first image's bytes and
//! the finish reason arrives in the `finish-reason` header.

use std::io::Read;

use serde::Serialize;

use captionforge_core::RenderParams;

use crate::capability::{CapabilityError, ImageGenerator};

pub const STABILITY_API_BASE: &str = "https://api.stability.ai";

/// Upper bound on a single image body.
const MAX_IMAGE_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct StabilityGenerator {
    agent: ureq::Agent,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
struct TextPrompt<'a> {
    text: &'a str,
    weight: f32,
}

#[derive(Serialize)]
struct TextToImageRequest<'a> {
    text_prompts: Vec<TextPrompt<'a>>,
    cfg_scale: f32,
    height: u32,
    width: u32,
    samples: u32,
    steps: u32,
    sampler: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    style_preset: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    clip_guidance_preset: Option<&'a str>,
}

impl<'a> TextToImageRequest<'a> {
    fn new(prompt: &'a str, params: &'a RenderParams) -> Self {
        let mut text_prompts = vec![TextPrompt {
            text: prompt,
            weight: 1.0,
        }];
        if let Some(negative) = params.negative_prompt.as_deref().filter(|n| !n.trim().is_empty()) {
            text_prompts.push(TextPrompt {
                text: negative,
                weight: -1.0,
            });
        }
        Self {
            text_prompts,
            cfg_scale: params.cfg_scale,
            height: params.height,
            width: params.width,
            samples: params.samples,
            steps: params.steps,
            sampler: &params.sampler,
            style_preset: params.style_preset.as_deref(),
            clip_guidance_preset: params.clip_guidance_preset.as_deref(),
        }
    }
}

impl StabilityGenerator {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            agent: super::agent(),
            api_key: api_key.into(),
            base_url: STABILITY_API_BASE.to_string(),
        }
    }

    /// Point at a compatible host instead of api.stability.ai.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, engine: &str) -> String {
        format!("{}/v1/generation/{engine}/text-to-image", self.base_url)
    }
}

impl ImageGenerator for StabilityGenerator {
    fn generate(&self, prompt: &str, params: &RenderParams) -> Result<Vec<u8>, CapabilityError> {
        let response = self
            .agent
            .post(&self.url(&params.engine))
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Accept", "image/png")
            .send_json(TextToImageRequest::new(prompt, params))
            .map_err(super::capability_error)?;

        if response
            .header("finish-reason")
            .is_some_and(|reason| reason.eq_ignore_ascii_case("CONTENT_FILTERED"))
        {
            return Err(CapabilityError::ContentFiltered);
        }

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_IMAGE_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|e| CapabilityError::Transport(e.to_string()))?;
        if bytes.is_empty() {
            return Err(CapabilityError::Malformed("empty image body".to_string()));
        }
        Ok(bytes)
    }
}
