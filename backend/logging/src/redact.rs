//! Log Redaction
//!
//! Scrubs API keys and auth tokens from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static AUTH_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(Bearer|Firebase)\s+[a-zA-Z0-9\-\._~+/]{16,}=*").unwrap()
});
static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9\-_]{16,})|(AIza[0-9A-Za-z\-_]{20,})").unwrap()
});
static KEY_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([?&](?:key|token)=)[^&\s]+").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = AUTH_HEADER_RE.replace_all(input, "$1 [REDACTED_TOKEN]");
    let redacted = API_KEY_RE.replace_all(&redacted, "[REDACTED_KEY]");
    KEY_PARAM_RE
        .replace_all(&redacted, "${1}[REDACTED]")
        .into_owned()
}
