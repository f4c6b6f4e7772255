use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    build_content_prompt, build_markup_prompt, content_system_prompt, markup_system_prompt,
    parse_generation_output, split_lookup_requirements, ContentDraft, ContentGenerator,
    GenerationError, GenerationRequest, GenerationResponse,
};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CONTENT_MODEL: &str = "gpt-4o-2024-11-20";
pub const DEFAULT_MARKUP_MODEL: &str = "gpt-4o-2024-11-20";

/// Two-stage generator over an OpenAI-compatible chat completions API:
/// free prose with lookup requirements first, then JSON markup of that prose.
pub struct OpenAiGenerator {
    base_url: String,
    api_key: String,
    content_model: String,
    markup_model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl OpenAiGenerator {
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        content_model: impl Into<String>,
        markup_model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "HTTP client builder failed, using defaults");
                reqwest::Client::new()
            });

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            content_model: content_model.into(),
            markup_model: markup_model.into(),
            client,
            timeout_secs: timeout.as_secs(),
        }
    }

    /// First stage: prose answer split from its lookup requirements.
    pub async fn generate_content(
        &self,
        request: &GenerationRequest,
    ) -> Result<ContentDraft, GenerationError> {
        let system = content_system_prompt(chrono::Local::now().date_naive());
        let text = self
            .chat(&ChatParams {
                model: &self.content_model,
                system: &system,
                user: &build_content_prompt(request),
                temperature: 0.7,
                max_tokens: 2000,
                json_mode: false,
            })
            .await?;
        let draft = split_lookup_requirements(&text);
        tracing::info!(
            chars = draft.full_text.len(),
            prose_chars = draft.natural_language.len(),
            "Content stage complete"
        );
        Ok(draft)
    }

    /// Second stage: inline markup and entity lists for a draft.
    pub async fn extract_markup(
        &self,
        draft: &ContentDraft,
    ) -> Result<GenerationResponse, GenerationError> {
        let raw = self
            .chat(&ChatParams {
                model: &self.markup_model,
                system: markup_system_prompt(),
                user: &build_markup_prompt(draft),
                temperature: 0.3,
                max_tokens: 3000,
                json_mode: true,
            })
            .await?;
        let response = parse_generation_output(&raw)?;
        tracing::info!(
            chars = response.text.len(),
            entities = response.entities.len(),
            "Markup stage complete"
        );
        Ok(response)
    }

    async fn chat(&self, params: &ChatParams<'_>) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: params.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: params.system,
                },
                ChatMessage {
                    role: "user",
                    content: params.user,
                },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            response_format: params.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(self.timeout_secs)
                } else {
                    GenerationError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedOutput(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(GenerationError::EmptyCompletion)
    }
}

#[async_trait]
impl ContentGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let draft = self.generate_content(request).await?;
        self.extract_markup(&draft).await
    }
}

struct ChatParams<'a> {
    model: &'a str,
    system: &'a str,
    user: &'a str,
    temperature: f32,
    max_tokens: u32,
    json_mode: bool,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}
