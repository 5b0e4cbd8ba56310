// src/llm.rs
//! Semantic-generation collaborator: provider trait, the OpenAI-compatible
//! chat-completions client, and the one shared tolerant JSON decoder used by
//! all three call sites (term generation, classification, enrichment).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PipelineError;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one rendered prompt and return the raw text of the first choice.
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String>;
    /// Model/provider label for diagnostics.
    fn model_name(&self) -> &str;
}

pub type DynLlmClient = Arc<dyn LlmClient>;

/// OpenAI-compatible chat-completions client. The base URL lets the same
/// client talk to any compatible gateway.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("paper-digest/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            http,
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Reads `OPENAI_API_KEY` (required) and `OPENAI_API_BASE` (optional).
    pub fn from_env(model: impl Into<String>) -> Result<Self, PipelineError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| PipelineError::config("llm", "missing OPENAI_API_KEY env var"))?;
        let api_base =
            std::env::var("OPENAI_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self::new(api_base, api_key, model).map_err(|e| PipelineError::config("llm", e.to_string()))
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        let req = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            max_tokens: 8192,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("chat completions request")?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("chat completions returned HTTP {status}"));
        }
        let body: ChatResponse = resp.json().await.context("decoding chat response")?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow!("empty response choices"))?;
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Scripted client for tests and dry runs: pops responses in order, then
/// keeps returning the last one. An `Err` entry simulates a transport failure.
#[derive(Default)]
pub struct MockLlm {
    responses: Mutex<Vec<Result<String, String>>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        let mut r = responses;
        r.reverse(); // pop from the back
        Self {
            responses: Mutex::new(r),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always(response: &str) -> Self {
        Self::new(vec![Ok(response.to_string())])
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock llm mutex").len()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String> {
        self.calls
            .lock()
            .expect("mock llm mutex")
            .push(prompt.to_string());
        let mut g = self.responses.lock().expect("mock llm mutex");
        let next = if g.len() > 1 {
            g.pop().unwrap()
        } else {
            g.last().cloned().ok_or_else(|| anyhow!("mock exhausted"))?
        };
        next.map_err(|e| anyhow!(e))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

// ------------------------------------------------------------
// Tolerant JSON payload extraction
// ------------------------------------------------------------

/// Pull a JSON value out of a semantic-call response. Models routinely wrap
/// the payload in prose or a ```json fence; this is the single place that
/// tolerance lives.
pub fn extract_json_payload(stage: &'static str, raw: &str) -> Result<Value, PipelineError> {
    let trimmed = raw.trim();
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Ok(v);
    }

    // Code-fenced block, e.g. ```json ... ``` or plain ``` ... ```
    if let Some(inner) = fenced_block(trimmed) {
        if let Ok(v) = serde_json::from_str::<Value>(inner.trim()) {
            return Ok(v);
        }
    }

    // Last resort: the first balanced {...} or [...] slice.
    for open in ['{', '['] {
        if let Some(slice) = balanced_slice(trimmed, open) {
            if let Ok(v) = serde_json::from_str::<Value>(slice) {
                return Ok(v);
            }
        }
    }

    Err(PipelineError::parse(
        stage,
        format!("no JSON payload in response ({} chars)", raw.len()),
    ))
}

fn fenced_block(s: &str) -> Option<&str> {
    let start = s.find("```")?;
    let after = &s[start + 3..];
    // skip the language tag on the fence line
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

fn balanced_slice(s: &str, open: char) -> Option<&str> {
    let close = if open == '{' { '}' } else { ']' };
    let start = s.find(open)?;
    let mut depth = 0usize;
    let mut in_str = false;
    let mut escaped = false;
    for (i, c) in s[start..].char_indices() {
        if in_str {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_str = false;
            }
            continue;
        }
        match c {
            '"' => in_str = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
