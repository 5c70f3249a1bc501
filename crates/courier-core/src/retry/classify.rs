//! Classify failure messages as transient (retry) or permanent (stop).

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Environmental or temporary: network, timeout, throttling, 5xx.
    Transient,
    /// Caller mistake or bad credentials: 4xx auth/validation, malformed input.
    Permanent,
}

/// Substrings (lowercase) that mark a failure as retryable.
const TRANSIENT_PATTERNS: &[&str] = &[
    "econnreset",
    "connection reset",
    "econnrefused",
    "connection refused",
    "couldn't connect",
    "etimedout",
    "timeout",
    "timed out",
    "ehostunreach",
    "host unreachable",
    "enetunreach",
    "network unreachable",
    "enotfound",
    "name resolution",
    "couldn't resolve",
    "network error",
    "429",
    "500",
    "502",
    "503",
    "504",
    "rate limit",
    "too many requests",
    "quota",
];

/// Substrings (lowercase) that mark a failure as not worth retrying.
const PERMANENT_PATTERNS: &[&str] = &[
    "400",
    "401",
    "403",
    "404",
    "unauthorized",
    "forbidden",
    "not found",
    "bad request",
    "authentication failed",
    "invalid",
    "token",
];

/// Substring match, except that all-digit patterns (status codes) must not
/// touch other digits: "port 34012" does not contain the code 401.
fn matches(haystack: &str, pattern: &str) -> bool {
    if !pattern.bytes().all(|b| b.is_ascii_digit()) {
        return haystack.contains(pattern);
    }
    let bytes = haystack.as_bytes();
    haystack.match_indices(pattern).any(|(start, _)| {
        let end = start + pattern.len();
        let before = start.checked_sub(1).map(|i| bytes[i].is_ascii_digit());
        let after = bytes.get(end).map(|b| b.is_ascii_digit());
        before != Some(true) && after != Some(true)
    })
}

/// Classify a failure message. Permanent signals win over transient ones;
/// a message matching neither is treated as transient.
pub fn classify_message(message: &str) -> Disposition {
    let lower = message.to_lowercase();
    if PERMANENT_PATTERNS.iter().any(|p| matches(&lower, p)) {
        return Disposition::Permanent;
    }
    if TRANSIENT_PATTERNS.iter().any(|p| matches(&lower, p)) {
        return Disposition::Transient;
    }
    Disposition::Transient
}

/// Classify any displayable error by its rendered message.
pub fn classify<E: std::fmt::Display + ?Sized>(error: &E) -> Disposition {
    classify_message(&error.to_string())
}
