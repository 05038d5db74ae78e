//! LLM integration for coaching advice
//!
//! Thin client for the Claude messages API. Prompt content lives in the
//! `coaching` and `screenshot` modules; this one only moves text (and the
//! occasional image) over HTTP and pulls JSON back out of free-form replies.

use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::LlmConfig;

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

const MESSAGES_PATH: &str = "v1/messages";
const API_VERSION: &str = "2023-06-01";

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Serialize)]
pub enum LlmError {
  #[error("API key not configured")]
  MissingApiKey,

  #[error("Request failed: {0}")]
  Request(String),

  #[error("Rate limit or quota exceeded, try again later")]
  RateLimited,

  #[error("API error: {0}")]
  Api(String),

  #[error("Parse error: {0}")]
  Parse(String),
}

/// ---------------------------------------------------------------------------
/// Claude API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
  model: &'a str,
  max_tokens: u32,
  system: &'a str,
  messages: Vec<ClaudeMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage<'a> {
  role: &'a str,
  content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
  Text(&'a str),
  Blocks(Vec<RequestBlock<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestBlock<'a> {
  Image { source: ImageSource<'a> },
  Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
  #[serde(rename = "type")]
  source_type: &'static str,
  media_type: &'a str,
  data: String,
}

/// An image attached to a prompt
#[derive(Debug, Clone, Copy)]
pub struct ImageInput<'a> {
  /// e.g. `image/png`
  pub media_type: &'a str,
  pub bytes: &'a [u8],
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
  content: Vec<ContentBlock>,
  usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
  #[serde(rename = "type")]
  content_type: String,
  text: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct Usage {
  pub input_tokens: u32,
  pub output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorResponse {
  error: ClaudeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorDetail {
  message: String,
}

/// ---------------------------------------------------------------------------
/// Client
/// ---------------------------------------------------------------------------

pub struct LlmClient {
  client: Client,
  api_key: String,
  model: String,
  endpoint: Url,
}

impl LlmClient {
  pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
    let api_key = config.api_key.clone().ok_or(LlmError::MissingApiKey)?;
    let endpoint = config
      .base_url
      .join(MESSAGES_PATH)
      .map_err(|e| LlmError::Request(e.to_string()))?;

    Ok(Self {
      client: Client::new(),
      api_key,
      model: config.model.clone(),
      endpoint,
    })
  }

  /// Call Claude with a system prompt and user message
  pub async fn complete(
    &self,
    system_prompt: &str,
    user_message: &str,
    max_tokens: u32,
  ) -> Result<(String, Usage), LlmError> {
    debug!("Sending {} byte prompt to {}", user_message.len(), self.endpoint);
    self
      .send(system_prompt, MessageContent::Text(user_message), max_tokens)
      .await
  }

  /// Same as `complete`, with an image shown ahead of the text
  pub async fn complete_with_image(
    &self,
    system_prompt: &str,
    user_message: &str,
    image: ImageInput<'_>,
    max_tokens: u32,
  ) -> Result<(String, Usage), LlmError> {
    debug!(
      "Sending {} byte {} image to {}",
      image.bytes.len(),
      image.media_type,
      self.endpoint
    );
    let content = MessageContent::Blocks(vec![
      RequestBlock::Image {
        source: ImageSource {
          source_type: "base64",
          media_type: image.media_type,
          data: general_purpose::STANDARD.encode(image.bytes),
        },
      },
      RequestBlock::Text { text: user_message },
    ]);
    self.send(system_prompt, content, max_tokens).await
  }

  async fn send(
    &self,
    system_prompt: &str,
    content: MessageContent<'_>,
    max_tokens: u32,
  ) -> Result<(String, Usage), LlmError> {
    let request = ClaudeRequest {
      model: &self.model,
      max_tokens,
      system: system_prompt,
      messages: vec![ClaudeMessage { role: "user", content }],
    };

    let response = self
      .client
      .post(self.endpoint.clone())
      .header("x-api-key", &self.api_key)
      .header("anthropic-version", API_VERSION)
      .header("content-type", "application/json")
      .json(&request)
      .send()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    if status == StatusCode::TOO_MANY_REQUESTS {
      warn!("LLM request rate limited");
      return Err(LlmError::RateLimited);
    }

    if !status.is_success() {
      if let Ok(error_resp) = serde_json::from_str::<ClaudeErrorResponse>(&body) {
        return Err(LlmError::Api(error_resp.error.message));
      }
      return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
    }

    let claude_response: ClaudeResponse =
      serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;

    // Extract text from the first text content block
    let text = claude_response
      .content
      .iter()
      .find(|c| c.content_type == "text")
      .and_then(|c| c.text.clone())
      .ok_or_else(|| LlmError::Parse("No text content in response".to_string()))?;

    Ok((text, claude_response.usage))
  }
}

/// Extract JSON from a model reply (handles markdown code blocks)
pub fn extract_json(text: &str) -> Result<String, LlmError> {
  // Try direct parse first
  if text.trim().starts_with('{') {
    return Ok(text.trim().to_string());
  }

  // Look for JSON in code blocks
  if let Some(start) = text.find("```json") {
    let start = start + 7;
    if let Some(end) = text[start..].find("```") {
      return Ok(text[start..start + end].trim().to_string());
    }
  }

  // Look for plain code blocks
  if let Some(start) = text.find("```") {
    let start = start + 3;
    // Skip language identifier if present
    let content_start = text[start..]
      .find('\n')
      .map(|i| start + i + 1)
      .unwrap_or(start);
    if let Some(end) = text[content_start..].find("```") {
      return Ok(text[content_start..content_start + end].trim().to_string());
    }
  }

  // Last resort: find first { to last }
  if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
    if start < end {
      return Ok(text[start..=end].to_string());
    }
  }

  Err(LlmError::Parse("Could not extract JSON from response".to_string()))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
