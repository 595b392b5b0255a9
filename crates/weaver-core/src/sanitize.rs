//! Text hygiene for anything that leaves the process (status export, CLI output).
//!
//! Exported error text is a single line, bounded, with secret-looking values
//! replaced. Stack traces and multi-line provider dumps never survive this.

use regex::Regex;
use std::sync::OnceLock;

/// Upper bound for an exported error line.
pub const ERROR_LINE_MAX_CHARS: usize = 240;

fn secret_pairs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b([a-z0-9_\-]*(?:api[_\-]?key|key|token|secret|password|passwd)[a-z0-9_\-]*)\s*[=:]\s*[^\s&,;]+")
            .expect("static regex")
    })
}

fn bearer_tokens() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bbearer\s+[A-Za-z0-9\-._~+/]+=*").expect("static regex"))
}

/// First non-empty line of `text`, trimmed and cut to at most `max_chars` characters.
pub fn single_line(text: &str, max_chars: usize) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    let byte_limit = line
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    line[..byte_limit].to_string()
}

/// Replace secret-looking `key=value` pairs and bearer tokens with `[redacted]`.
pub fn redact_secrets(text: &str) -> String {
    let pass = secret_pairs().replace_all(text, "$1=[redacted]");
    bearer_tokens()
        .replace_all(&pass, "Bearer [redacted]")
        .into_owned()
}

/// The form every externally visible error takes.
pub fn error_line(text: &str) -> String {
    single_line(&redact_secrets(text), ERROR_LINE_MAX_CHARS)
}
