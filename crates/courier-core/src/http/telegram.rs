//! Delivery collaborator: Telegram-style bot API.
//!
//! Batches go out as one `sendMediaGroup` call (a single item uses
//! `sendPhoto`/`sendDocument`); text uses `sendMessage`, split at the
//! 4096-character message limit.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

use super::{blocking, post_form, post_json};
use crate::config::TelegramConfig;
use crate::item::DeliverableItem;
use crate::pipeline::Deliver;
use crate::retry::OpError;

/// Maximum characters per text message.
pub const MESSAGE_LIMIT: usize = 4096;

/// Maximum characters per media caption.
const CAPTION_LIMIT: usize = 1024;

#[derive(Clone)]
pub struct TelegramClient {
    /// `<api_base>/bot<token>/`; contains the secret, never logged.
    base: Url,
    chat_id: String,
    timeout: Duration,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("chat_id", &self.chat_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(api_base: &str, bot_token: &str, chat_id: String, timeout: Duration) -> Result<Self> {
        // Tokens look like `123:abc`, which `Url::join` would read as a scheme.
        let raw = format!("{}/bot{}/", api_base.trim_end_matches('/'), bot_token);
        let base = Url::parse(&raw).with_context(|| format!("bot api base: {}", api_base))?;
        Ok(Self {
            base,
            chat_id,
            timeout,
        })
    }

    /// Builds a client from config; the token and (optionally) the chat id
    /// come from the environment variables the config names.
    pub fn from_config(cfg: &TelegramConfig) -> Result<Self> {
        let token = std::env::var(&cfg.token_env)
            .with_context(|| format!("environment variable {} is not set", cfg.token_env))?;
        let chat_id = match &cfg.chat_id {
            Some(id) => id.clone(),
            None => std::env::var(&cfg.chat_id_env).with_context(|| {
                format!(
                    "no chat_id in config and environment variable {} is not set",
                    cfg.chat_id_env
                )
            })?,
        };
        Self::new(&cfg.api_base, &token, chat_id, Duration::from_secs(cfg.timeout_secs))
    }

    fn method_url(&self, method: &str) -> Result<String, OpError> {
        self.base
            .join(method)
            .map(String::from)
            .map_err(|e| OpError::other(format!("bot api method {}: {}", method, e)))
    }
}

/// Splits text into chunks of at most `limit` characters, preferring to break
/// after a newline in the second half of a chunk.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;
    while rest.chars().count() > limit {
        let hard_end = rest
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..hard_end];
        let cut = match window.rfind('\n') {
            Some(nl) if window[..nl].chars().count() >= limit / 2 => nl + 1,
            _ => hard_end,
        };
        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }
    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

fn caption(label: &str) -> String {
    label.chars().take(CAPTION_LIMIT).collect()
}

fn media_kind(item: &DeliverableItem) -> &'static str {
    if item.mime_type().starts_with("image/") {
        "photo"
    } else {
        "document"
    }
}

fn form_err(e: curl::FormError) -> OpError {
    OpError::other(format!("build multipart form: {}", e))
}

/// `media` JSON for sendMediaGroup; each entry points at an `attach://fileN` part.
pub(crate) fn media_json(items: &[DeliverableItem]) -> serde_json::Value {
    let media: Vec<serde_json::Value> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::json!({
                "type": media_kind(item),
                "media": format!("attach://file{}", i),
                "caption": caption(item.label()),
            })
        })
        .collect();
    serde_json::Value::Array(media)
}

fn attachment_name(i: usize, item: &DeliverableItem) -> String {
    format!("file{}.{}", i, item.extension())
}

fn build_group_form(chat_id: &str, items: &[DeliverableItem]) -> Result<curl::easy::Form, OpError> {
    let mut form = curl::easy::Form::new();
    form.part("chat_id")
        .contents(chat_id.as_bytes())
        .add()
        .map_err(form_err)?;
    let media = media_json(items).to_string();
    form.part("media")
        .contents(media.as_bytes())
        .add()
        .map_err(form_err)?;
    for (i, item) in items.iter().enumerate() {
        form.part(&format!("file{}", i))
            .buffer(&attachment_name(i, item), item.payload().to_vec())
            .content_type(item.mime_type())
            .add()
            .map_err(form_err)?;
    }
    Ok(form)
}

fn build_single_form(chat_id: &str, item: &DeliverableItem) -> Result<curl::easy::Form, OpError> {
    let mut form = curl::easy::Form::new();
    form.part("chat_id")
        .contents(chat_id.as_bytes())
        .add()
        .map_err(form_err)?;
    let label = caption(item.label());
    form.part("caption")
        .contents(label.as_bytes())
        .add()
        .map_err(form_err)?;
    form.part(media_kind(item))
        .buffer(&attachment_name(0, item), item.payload().to_vec())
        .content_type(item.mime_type())
        .add()
        .map_err(form_err)?;
    Ok(form)
}

#[async_trait]
impl Deliver for TelegramClient {
    async fn send_batch(&self, items: &[DeliverableItem]) -> Result<(), OpError> {
        let method = match items {
            [] => return Ok(()),
            [single] if media_kind(single) == "photo" => "sendPhoto",
            [_] => "sendDocument",
            _ => "sendMediaGroup",
        };
        let url = self.method_url(method)?;
        let chat_id = self.chat_id.clone();
        let owned = items.to_vec();
        let timeout = self.timeout;
        // The form holds raw libcurl handles, so it is built on the blocking thread.
        blocking(move || {
            let form = match owned.as_slice() {
                [single] => build_single_form(&chat_id, single)?,
                many => build_group_form(&chat_id, many)?,
            };
            post_form(&url, form, timeout)
        })
        .await?;
        tracing::debug!(method, count = items.len(), "bot batch sent");
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<(), OpError> {
        let url = self.method_url("sendMessage")?;
        for chunk in split_message(text, MESSAGE_LIMIT) {
            let body = serde_json::json!({ "chat_id": self.chat_id, "text": chunk });
            let body = serde_json::to_vec(&body)
                .map_err(|e| OpError::other(format!("encode message: {}", e)))?;
            let url = url.clone();
            let timeout = self.timeout;
            blocking(move || post_json(&url, &[], &body, timeout)).await?;
        }
        Ok(())
    }
}
