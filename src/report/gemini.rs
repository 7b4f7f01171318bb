//! A `TextGenerator` backed by the Gemini `generateContent` REST endpoint.

use super::TextGenerator;
use crate::api::{http_client, parse_base_url};
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, trace};
use url::Url;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";

pub struct Gemini {
    client: Client,
    url: Url,
    api_key: String,
}

impl std::fmt::Debug for Gemini {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gemini").field("url", &self.url).finish()
    }
}

impl Gemini {
    /// Builds a client for the model named in `config`. The API key is read from the environment
    /// variable the config names.
    ///
    /// # Errors
    /// A `Config` error if the variable is unset or empty, or if the base URL is invalid.
    pub fn new(config: &Config) -> Result<Self> {
        let settings = config.generator();
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "Set {} to an API key for the report generator",
                    settings.api_key_env
                )
            })
            .pub_result(ErrorType::Config)?;
        let base = parse_base_url(settings.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))
            .pub_result(ErrorType::Config)?;
        Self::with_key(config, base, api_key)
    }

    fn with_key(config: &Config, base: Url, api_key: String) -> Result<Self> {
        let model = &config.generator().model;
        let url = base
            .join(&format!("v1beta/models/{model}:generateContent"))
            .with_context(|| format!("Unable to build a URL for model '{model}'"))?;
        Ok(Self {
            client: http_client(config)?,
            url,
            api_key,
        })
    }
}

#[async_trait]
impl TextGenerator for Gemini {
    async fn generate(&self, prompt: &str, output_schema: Value) -> Result<Value> {
        trace!("POST {}", self.url);
        let response = self
            .client
            .post(self.url.clone())
            .query(&[("key", &self.api_key)])
            .json(&request_body(prompt, output_schema))
            .send()
            .await
            .context("Unable to reach the report generator")?;
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Unable to read the report generator's response")?;
        if !status.is_success() {
            bail!("The report generator answered {status}: {body}");
        }
        debug!("Report generator answered {status}");
        parse_response(&body)
    }
}

/// A single-turn request that asks for JSON matching `schema`.
fn request_body(prompt: &str, schema: Value) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }],
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": schema,
        },
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Reads the JSON text of the first candidate.
fn parse_response(body: &str) -> Result<Value> {
    let response: GenerateResponse =
        serde_json::from_str(body).context("Unable to parse the report generator's response")?;
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        bail!("The report generator refused the request: {reason}");
    }
    let Some(candidate) = response.candidates.into_iter().next() else {
        bail!("The report generator returned no candidates");
    };
    let text: String = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.text)
        .collect();
    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        bail!("The report generator returned no text (finish reason: {reason})");
    }
    serde_json::from_str(&text).context("The report generator did not return valid JSON")
}
