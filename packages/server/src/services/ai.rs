use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::{AiConfig, AiProvider};

const SYSTEM_PROMPT: &str = "You summarize documents. Reply with a concise summary of the \
    document's key points in plain prose, at most a few short paragraphs.";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("nothing to summarize")]
    EmptyInput,

    #[error("summarizer returned an empty response")]
    EmptyResponse,

    #[error("AI provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("AI provider is not configured: {0}")]
    NotConfigured(&'static str),
}

/// Turns document text into a summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, title: &str, text: &str) -> Result<String, AiError>;
}

/// Cut `text` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// AI summarization used by document processing.
#[derive(Clone)]
pub struct AiService {
    summarizer: Arc<dyn Summarizer>,
    max_input_chars: usize,
}

impl AiService {
    pub fn new(summarizer: Arc<dyn Summarizer>, max_input_chars: usize) -> Self {
        Self {
            summarizer,
            max_input_chars,
        }
    }

    /// Build the summarizer selected by `ai.provider`.
    pub fn from_config(config: &AiConfig) -> Result<Self, AiError> {
        let summarizer: Arc<dyn Summarizer> = match config.provider {
            AiProvider::OpenAi => Arc::new(OpenAiSummarizer::new(config)?),
            AiProvider::Extractive => Arc::new(ExtractiveSummarizer::new(config.max_summary_chars)),
        };
        Ok(Self::new(summarizer, config.max_input_chars))
    }

    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn summarize(&self, title: &str, text: &str) -> Result<String, AiError> {
        let text = truncate_chars(text.trim(), self.max_input_chars);
        if text.is_empty() {
            return Err(AiError::EmptyInput);
        }

        let summary = self.summarizer.summarize(title, text).await?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(AiError::EmptyResponse);
        }
        Ok(summary.to_string())
    }
}

/// Summarizer backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiSummarizer {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl OpenAiSummarizer {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AiError::NotConfigured("ai.api_key"))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            // Roughly four characters per token.
            max_tokens: u32::try_from(config.max_summary_chars / 4)
                .unwrap_or(u32::MAX)
                .max(64),
        })
    }

    fn build_request<'a>(&'a self, title: &str, text: &str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("Document: {title}\n\n{text}"),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: 0.2,
        }
    }
}

fn first_choice(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .filter_map(|c| c.message.content)
        .find(|c| !c.trim().is_empty())
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, title: &str, text: &str) -> Result<String, AiError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(title, text))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            // Provider errors can echo request details; keep them short.
            let body = truncate_chars(&body, 500).to_string();
            return Err(AiError::Provider { status, body });
        }

        let data: ChatResponse = response.json().await?;
        debug!(model = %self.model, choices = data.choices.len(), "Summary received");
        first_choice(data).ok_or(AiError::EmptyResponse)
    }
}

/// Offline summarizer: the leading sentences of the text, up to a character budget.
pub struct ExtractiveSummarizer {
    max_chars: usize,
}

impl ExtractiveSummarizer {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    fn sentences(text: &str) -> impl Iterator<Item = &str> {
        text.split_inclusive(['.', '!', '?', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn extract(&self, text: &str) -> String {
        let mut summary = String::new();
        for sentence in Self::sentences(text) {
            let sentence = sentence.split_whitespace().collect::<Vec<_>>().join(" ");
            let needed = sentence.chars().count() + usize::from(!summary.is_empty());
            if summary.chars().count() + needed > self.max_chars {
                break;
            }
            if !summary.is_empty() {
                summary.push(' ');
            }
            summary.push_str(&sentence);
        }

        if summary.is_empty() {
            // First sentence alone exceeds the budget.
            let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
            summary = truncate_chars(&collapsed, self.max_chars).to_string();
        }
        summary
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    async fn summarize(&self, _title: &str, text: &str) -> Result<String, AiError> {
        Ok(self.extract(text))
    }
}
