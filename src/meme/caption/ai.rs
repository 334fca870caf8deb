//! OpenAI-compatible chat completion client used as the first caption tier.
//!
//! The request is a single non-streaming completion with a short token
//! budget. Any transport, status or body problem surfaces as a
//! [`MemeError`] and the caption chain replaces it with a static phrase.

use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::meme::{
    error::{MemeError, MemeResult},
    types::{CaptionRecord, SubTone},
};
use crate::settings::MemeSettings;

use super::{clean_completion, pick_template, CaptionRequest, CaptionStrategy};

const SYSTEM_PROMPT: &str = "You are a witty meme caption generator. Create short, funny captions perfect for internet memes. Be concise and punchy.";
const MAX_TOKENS: u32 = 50;
const TEMPERATURE: f32 = 0.8;
const TOP_P: f32 = 0.9;
/// Bodies are echoed into errors; cap how much.
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct AiCaptioner {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl AiCaptioner {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> MemeResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
        })
    }

    pub fn from_settings(settings: &MemeSettings) -> MemeResult<Self> {
        Self::new(
            settings.ai_endpoint.clone(),
            settings.ai_model.clone(),
            settings.ai_key().map(str::to_string),
            settings.request_timeout(),
        )
    }

    /// Raw completion text, before cleanup.
    async fn complete(&self, prompt: String) -> MemeResult<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| MemeError::Config("no text-generation API key configured".into()))?;

        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: SYSTEM_PROMPT.into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: prompt,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            top_p: TOP_P,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let snippet: String = text.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(MemeError::service(Some(status.as_u16()), snippet));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|err| MemeError::service(None, format!("malformed completion body: {err}")))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

pub fn build_prompt(request: &CaptionRequest) -> String {
    let CaptionRequest {
        completed,
        total,
        goal_title,
        ..
    } = request;

    match request.sub_tone {
        SubTone::Perfect => format!(
            "Create a short, funny, congratulatory meme caption for someone who completed their daily goal: \"{goal_title}\". Make it celebratory, witty, and perfect for social media. Keep it under 50 characters. Just return the caption text, nothing else."
        ),
        SubTone::Motivational => format!(
            "Create a short, motivational meme caption for someone who completed {completed} out of {total} tasks. Make it encouraging, funny, and perfect for a motivational meme. Keep it under 50 characters. Just return the caption text, nothing else."
        ),
        SubTone::Roast => format!(
            "Create a short, playfully sarcastic meme caption roasting someone who only completed {completed} out of {total} tasks for their goal \"{goal_title}\". Make it funny but not mean, perfect for internet meme culture. Keep it under 50 characters. Just return the caption text, nothing else."
        ),
    }
}

#[async_trait]
impl CaptionStrategy for AiCaptioner {
    fn name(&self) -> &'static str {
        "ai"
    }

    async fn produce(
        &self,
        request: &CaptionRequest,
        rng: &mut StdRng,
    ) -> MemeResult<CaptionRecord> {
        let raw = self.complete(build_prompt(request)).await?;
        let text = clean_completion(&raw).ok_or(MemeError::EmptyCompletion)?;

        let tone = request.sub_tone.tone();
        Ok(CaptionRecord {
            text,
            tone,
            sub_tone: request.sub_tone,
            template_id: pick_template(tone, rng),
            is_generated: true,
        })
    }
}
