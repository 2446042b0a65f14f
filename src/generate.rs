//! Client for the generative answer service.
//!
//! The service is a black box: text prompt in, text answer out. Its
//! response shape is treated as unstable (different providers and provider
//! versions wrap the answer differently), so all output parsing
//! funnels through [`extract_answer_text`], which unwraps the known shapes
//! and falls back to a string conversion rather than crashing.

use anyhow::{bail, Result};
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::GenerationConfig;

/// Generate an answer for `prompt` via the configured provider.
///
/// Retries transient failures (429/5xx/network) with the same exponential
/// backoff the embedding providers use; other client errors fail fast.
pub async fn generate(config: &GenerationConfig, prompt: &str) -> Result<String> {
    let value = match config.provider.as_str() {
        "gemini" => request_gemini(config, prompt).await?,
        "openai" => request_openai(config, prompt).await?,
        other => bail!("Unknown generation provider: {}", other),
    };
    extract_answer_text(&value)
}

async fn request_gemini(config: &GenerationConfig, prompt: &str) -> Result<Value> {
    let api_key = std::env::var("GEMINI_API_KEY")
        .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))?;

    let base = config
        .url
        .as_deref()
        .unwrap_or("https://generativelanguage.googleapis.com");
    let url = format!(
        "{}/v1beta/models/{}:generateContent",
        base.trim_end_matches('/'),
        config.model
    );

    let body = json!({
        "contents": [{ "parts": [{ "text": prompt }] }]
    });

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(&url)
            .header("x-goog-api-key", api_key.as_str())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response.json().await?);
                }
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!(
                        "generation API error {}: {}",
                        status,
                        body_text
                    ));
                    continue;
                }
                let body_text = response.text().await.unwrap_or_default();
                bail!("generation API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("generation failed after retries")))
}

async fn request_openai(config: &GenerationConfig, prompt: &str) -> Result<Value> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

    let url = config
        .url
        .as_deref()
        .unwrap_or("https://api.openai.com/v1/chat/completions");

    let body = json!({
        "model": config.model,
        "messages": [{ "role": "user", "content": prompt }]
    });

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response.json().await?);
                }
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!(
                        "generation API error {}: {}",
                        status,
                        body_text
                    ));
                    continue;
                }
                let body_text = response.text().await.unwrap_or_default();
                bail!("generation API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("generation failed after retries")))
}

/// Pull the first usable answer text out of a generation response.
///
/// Accepted shapes, in probe order:
/// - a direct `text` field;
/// - a `candidates` list (content/parts structures, flat `content` or
///   `output` strings, or bare strings);
/// - an OpenAI-style `choices` list (`message.content`);
/// - a bare JSON string;
/// - anything else falls back to its string form, so an unexpected but
///   non-empty response still surfaces to the user instead of erroring.
pub fn extract_answer_text(value: &Value) -> Result<String> {
    if let Some(text) = value.get("text").and_then(|t| t.as_str()) {
        if !text.trim().is_empty() {
            return Ok(text.trim().to_string());
        }
    }

    if let Some(candidates) = value.get("candidates").and_then(|c| c.as_array()) {
        if let Some(text) = candidates.first().and_then(candidate_text) {
            return Ok(text);
        }
    }

    if let Some(text) = value
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.pointer("/message/content"))
        .and_then(|t| t.as_str())
    {
        if !text.trim().is_empty() {
            return Ok(text.trim().to_string());
        }
    }

    if let Some(s) = value.as_str() {
        if !s.trim().is_empty() {
            return Ok(s.trim().to_string());
        }
    }

    if value.is_null() {
        bail!("generation service returned an empty response");
    }

    Ok(value.to_string())
}

fn candidate_text(candidate: &Value) -> Option<String> {
    // Gemini-style: content.parts[].text, concatenated.
    if let Some(parts) = candidate.pointer("/content/parts").and_then(|p| p.as_array()) {
        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("");
        if !text.trim().is_empty() {
            return Some(text.trim().to_string());
        }
    }

    for key in ["content", "output"] {
        if let Some(text) = candidate.get(key).and_then(|t| t.as_str()) {
            if !text.trim().is_empty() {
                return Some(text.trim().to_string());
            }
        }
    }

    candidate
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
