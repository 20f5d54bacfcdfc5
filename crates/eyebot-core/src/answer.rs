//! Question answering through the OpenRouter chat-completions API.
//!
//! `/requests` questions are answered from fresh feed results. When an
//! OpenRouter key is configured the feed text is handed to a language model
//! as context; otherwise, or when the call fails, the plain feed summary is
//! the answer.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::BotConfig;
use crate::feeds::{web_summary, FeedEntry};
use crate::text::clean_text;

/// Default model to use for answers.
pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";

/// OpenRouter API endpoint.
const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Longest answer sent back to a chat, in characters.
const MAX_ANSWER_CHARS: usize = 3500;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// System prompt for the answerer.
const SYSTEM_PROMPT: &str = r#"You answer questions sent to a Telegram bot.
You are given recent headlines and snippets that were found for the question.

Rules:
- Answer in plain text, no markdown
- Keep it short: 2-5 sentences
- Prefer facts from the provided snippets; say so if they do not cover the question
- Never invent sources or links"#;

/// Errors that can occur while asking the model.
#[derive(Error, Debug)]
pub enum AnswerError {
    /// OpenRouter API key not set.
    #[error("OpenRouter API key not set")]
    NoApiKey,

    /// API request failed.
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Failed to parse API response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Builds the user prompt from the question and the feed snippets.
fn build_prompt(query: &str, context: &[FeedEntry]) -> String {
    let mut prompt = format!("Question: {query}\n\nSnippets:\n");
    if context.is_empty() {
        prompt.push_str("(none found)\n");
    }
    for entry in context {
        prompt.push_str("- ");
        prompt.push_str(&entry.title);
        if !entry.summary.is_empty() {
            prompt.push_str(": ");
            prompt.push_str(&entry.summary);
        }
        prompt.push('\n');
    }
    prompt
}

/// Extracts the first non-empty completion from a response body.
fn parse_completion(body: &str) -> Result<String, AnswerError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| AnswerError::ParseError(e.to_string()))?;
    response
        .choices
        .into_iter()
        .find_map(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AnswerError::ParseError("No content in response".to_string()))
}

/// Language-model client with a feed-summary fallback.
#[derive(Debug, Clone)]
pub struct Answerer {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl Answerer {
    /// Creates an answerer from the OpenRouter settings in `config`.
    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(config.openrouter_api_key.clone(), config.openrouter_model.clone())
    }

    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self {
            client,
            api_key,
            model: model.into(),
            endpoint: OPENROUTER_API_URL.to_string(),
        }
    }

    /// Points the answerer at a different chat-completions URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Check if model answers are available (API key set).
    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Asks the model to answer `query` using `context`.
    pub async fn ask(&self, query: &str, context: &[FeedEntry]) -> Result<String, AnswerError> {
        let api_key = self.api_key.as_deref().ok_or(AnswerError::NoApiKey)?;
        let user_prompt = build_prompt(query, context);

        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &user_prompt },
            ],
            max_tokens: 500,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnswerError::RequestFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| AnswerError::RequestFailed(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| AnswerError::ParseError(e.to_string()))?;

        debug!(model = %self.model, "Model answered");
        parse_completion(&body).map(|answer| clean_text(&answer, MAX_ANSWER_CHARS))
    }

    /// Answers `query`, falling back to the plain feed summary.
    ///
    /// Never fails; model errors are logged.
    pub async fn answer_with_fallback(&self, query: &str, context: &[FeedEntry]) -> String {
        if !self.is_available() {
            return web_summary(context);
        }

        match self.ask(query, context).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Model answer failed, using feed summary");
                web_summary(context)
            }
        }
    }
}
