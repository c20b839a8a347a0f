use async_trait::async_trait;
use eyre::{Result, WrapErr, bail};
use log::{debug, warn};
use serde::Deserialize;

use crate::pipeline::CompletionProvider;

pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

/// Sampling temperature for every analysis request
pub const TEMPERATURE: f64 = 0.7;

/// Output token cap for every analysis request
pub const MAX_TOKENS: u32 = 1500;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Provider settings, resolved once at startup
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: String,
    /// OpenAI-compatible base URL. When set, every model is sent there,
    /// including `claude-*` models behind a compatible gateway.
    pub api_base: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Protocol {
    Anthropic,
    OpenAi,
}

impl ProviderConfig {
    fn protocol(&self) -> Protocol {
        if self.api_base.is_none() && is_anthropic_model(&self.model) {
            Protocol::Anthropic
        } else {
            Protocol::OpenAi
        }
    }

    fn endpoint(&self) -> String {
        match self.protocol() {
            Protocol::Anthropic => format!("{ANTHROPIC_API_BASE}/messages"),
            Protocol::OpenAi => {
                let base = self.api_base.as_deref().unwrap_or(OPENAI_API_BASE);
                format!("{}/chat/completions", base.trim_end_matches('/'))
            }
        }
    }
}

fn is_anthropic_model(model: &str) -> bool {
    model.starts_with("claude")
}

/// Sends a single user-role prompt and returns the model's text
pub struct CompletionClient {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl CompletionClient {
    pub fn new(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| eyre::eyre!("AI_API_KEY environment variable not set (required for analysis)"))
    }

    async fn complete_anthropic(&self, prompt: &str) -> Result<String> {
        let api_key = self.api_key()?;
        debug!("Requesting completion via Anthropic API with model {}", self.config.model);

        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let resp = self
            .client
            .post(self.config.endpoint())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("Anthropic API returned {status}: {body}");
        }

        let body = resp.text().await?;
        extract_anthropic_text(&body)
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String> {
        let api_key = self.api_key()?;
        let endpoint = self.config.endpoint();
        debug!("Requesting completion from {endpoint} with model {}", self.config.model);

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS
        });

        let resp = self
            .client
            .post(&endpoint)
            .bearer_auth(api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("OpenAI-compatible API returned {status}: {body}");
        }

        let body = resp.text().await?;
        extract_openai_text(&body)
    }
}

#[async_trait]
impl CompletionProvider for CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        match self.config.protocol() {
            Protocol::Anthropic => self.complete_anthropic(prompt).await,
            Protocol::OpenAi => self.complete_openai(prompt).await,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicReply {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Concatenated text blocks of a messages API reply
fn extract_anthropic_text(body: &str) -> Result<String> {
    let reply: AnthropicReply =
        serde_json::from_str(body).wrap_err("unexpected Anthropic API response format")?;
    if reply.stop_reason.as_deref() == Some("max_tokens") {
        warn!("Completion hit the {MAX_TOKENS} token cap; the analysis is likely truncated");
    }

    let text: String = reply
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();
    if text.is_empty() {
        bail!("Anthropic API response contained no text");
    }
    Ok(text)
}

/// Message content of the first chat completion choice
fn extract_openai_text(body: &str) -> Result<String> {
    let reply: ChatReply = serde_json::from_str(body).wrap_err("unexpected OpenAI API response format")?;
    let Some(choice) = reply.choices.into_iter().next() else {
        bail!("OpenAI-compatible API response contained no choices");
    };
    if choice.finish_reason.as_deref() == Some("length") {
        warn!("Completion hit the {MAX_TOKENS} token cap; the analysis is likely truncated");
    }
    match choice.message.content {
        Some(text) if !text.is_empty() => Ok(text),
        _ => bail!("OpenAI-compatible API response contained no text"),
    }
}
