//! Transformation collaborator: a `generateContent`-style inference endpoint.
//!
//! Images are sent inline (base64) after the prompt text; the reply's text
//! parts are concatenated into the report.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::{blocking, post_json};
use crate::config::InferenceConfig;
use crate::item::DeliverableItem;
use crate::pipeline::Transform;
use crate::retry::OpError;

#[derive(Clone)]
pub struct InferenceClient {
    url: Url,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for InferenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceClient")
            .field("url", &self.url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl InferenceClient {
    pub fn new(endpoint: &str, model: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let base = Url::parse(endpoint).with_context(|| format!("inference endpoint: {}", endpoint))?;
        let url = base
            .join(&format!("models/{}:generateContent", model))
            .context("inference model path")?;
        Ok(Self {
            url,
            api_key,
            timeout,
        })
    }

    /// Builds a client from config, reading the API key from the configured
    /// environment variable.
    pub fn from_config(cfg: &InferenceConfig) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env)
            .with_context(|| format!("environment variable {} is not set", cfg.api_key_env))?;
        Self::new(
            &cfg.endpoint,
            &cfg.model,
            api_key,
            Duration::from_secs(cfg.timeout_secs),
        )
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Request body: one user turn with the prompt followed by each image.
pub(crate) fn request_body(items: &[DeliverableItem], prompt: &str) -> serde_json::Value {
    let engine = base64::engine::general_purpose::STANDARD;
    let mut parts = vec![serde_json::json!({ "text": prompt })];
    for item in items {
        parts.push(serde_json::json!({ "text": format!("Image: {}", item.label()) }));
        parts.push(serde_json::json!({
            "inline_data": {
                "mime_type": item.mime_type(),
                "data": engine.encode(item.payload()),
            }
        }));
    }
    serde_json::json!({ "contents": [{ "role": "user", "parts": parts }] })
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Concatenated text of the first candidate.
pub(crate) fn response_text(body: &[u8]) -> Result<String, OpError> {
    let parsed: GenerateResponse = serde_json::from_slice(body)
        .map_err(|e| OpError::other(format!("invalid inference response: {}", e)))?;
    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(OpError::other("invalid inference response: no text in reply"));
    }
    Ok(text.trim().to_string())
}

#[async_trait]
impl Transform for InferenceClient {
    async fn transform(&self, items: &[DeliverableItem], prompt: &str) -> Result<String, OpError> {
        let body = serde_json::to_vec(&request_body(items, prompt))
            .map_err(|e| OpError::other(format!("encode inference request: {}", e)))?;
        let url = self.url.to_string();
        let headers = vec![format!("x-goog-api-key: {}", self.api_key)];
        let timeout = self.timeout;
        let reply = blocking(move || post_json(&url, &headers, &body, timeout)).await?;
        response_text(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{classify, Disposition};

    #[test]
    fn url_joins_model_path() {
        let c = InferenceClient::new(
            "https://example.test/v1beta/",
            "flash",
            "k".into(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(c.url().as_str(), "https://example.test/v1beta/models/flash:generateContent");
    }

    #[test]
    fn debug_does_not_leak_key() {
        let c = InferenceClient::new("https://e.test/", "m", "secret-key".into(), Duration::from_secs(1))
            .unwrap();
        assert!(!format!("{:?}", c).contains("secret-key"));
    }

    #[test]
    fn request_body_interleaves_labels_and_images() {
        let items = vec![DeliverableItem::new("revenue", b"\x89PNG\r\n\x1a\n".to_vec())];
        let body = request_body(&items, "Summarize");
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["text"], "Summarize");
        assert_eq!(parts[1]["text"], "Image: revenue");
        assert_eq!(parts[2]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[2]["inline_data"]["data"], "iVBORw0KGgo=");
    }

    #[test]
    fn response_text_joins_parts() {
        let body = br#"{"candidates":[{"content":{"parts":[{"text":"Sales up. "},{"text":"Churn flat."}]}}]}"#;
        assert_eq!(response_text(body).unwrap(), "Sales up. Churn flat.");
    }

    #[test]
    fn empty_reply_is_permanent() {
        let err = response_text(br#"{"candidates":[]}"#).unwrap_err();
        assert_eq!(classify(&err), Disposition::Permanent);
    }
}
