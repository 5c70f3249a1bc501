//! libcurl plumbing shared by the inference and bot-delivery collaborators.
//!
//! Requests are blocking; async callers go through [`blocking`], which runs
//! them on tokio's blocking pool. Non-2xx responses become
//! [`OpError::Http`] carrying the status and the service's own error text, so
//! the retry classifier sees e.g. `HTTP 429: Too Many Requests`.

pub mod inference;
pub mod telegram;

use std::time::Duration;

use crate::retry::OpError;

/// Longest error body kept in an `OpError::Http`.
const ERROR_BODY_MAX: usize = 300;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Runs a blocking request on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, OpError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, OpError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| OpError::other(format!("request task join: {}", e)))?
}

fn base_handle(url: &str, timeout: Duration) -> Result<curl::easy::Easy, OpError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.connect_timeout(CONNECT_TIMEOUT)?;
    easy.timeout(timeout)?;
    Ok(easy)
}

/// POSTs a JSON body and returns the response body on 2xx.
pub(crate) fn post_json(
    url: &str,
    headers: &[String],
    body: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>, OpError> {
    let mut easy = base_handle(url, timeout)?;
    easy.post(true)?;
    easy.post_fields_copy(body)?;

    let mut list = curl::easy::List::new();
    list.append("Content-Type: application/json")?;
    for h in headers {
        list.append(h)?;
    }
    easy.http_headers(list)?;

    perform(&mut easy)
}

/// POSTs a multipart form and returns the response body on 2xx.
pub(crate) fn post_form(
    url: &str,
    form: curl::easy::Form,
    timeout: Duration,
) -> Result<Vec<u8>, OpError> {
    let mut easy = base_handle(url, timeout)?;
    easy.httppost(form)?;
    perform(&mut easy)
}

fn perform(easy: &mut curl::easy::Easy) -> Result<Vec<u8>, OpError> {
    let mut body = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let status = easy.response_code()?;
    if !(200..300).contains(&status) {
        return Err(OpError::Http {
            status,
            body: error_text(&body),
        });
    }
    Ok(body)
}

/// Extracts a short error description from a JSON or plain-text error body.
///
/// Understands `{"description": ...}` (bot API) and `{"error": {"message": ...}}`
/// (inference API); anything else is returned as truncated text.
pub(crate) fn error_text(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        let described = value
            .get("description")
            .and_then(|d| d.as_str())
            .or_else(|| value.pointer("/error/message").and_then(|m| m.as_str()));
        if let Some(text) = described {
            return truncate(text.trim());
        }
    }
    truncate(String::from_utf8_lossy(body).trim())
}

fn truncate(s: &str) -> String {
    if s.len() <= ERROR_BODY_MAX {
        return s.to_string();
    }
    let mut end = ERROR_BODY_MAX;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_text_prefers_service_description() {
        let bot = br#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#;
        assert_eq!(error_text(bot), "Unauthorized");
        let inference =
            br#"{"error":{"code":429,"message":"Resource has been exhausted (e.g. check quota).","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            error_text(inference),
            "Resource has been exhausted (e.g. check quota)."
        );
    }

    #[test]
    fn error_text_truncates_plain_bodies() {
        assert_eq!(error_text(b"  Bad Gateway \n"), "Bad Gateway");
        let long = "x".repeat(1000);
        let text = error_text(long.as_bytes());
        assert_eq!(text.len(), ERROR_BODY_MAX + 3);
        assert!(text.ends_with("..."));
    }
}
