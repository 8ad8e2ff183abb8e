use std::sync::LazyLock;

use regex::Regex;

const MAX_VISIBLE_CHARS: usize = 100;

static SECRET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(bearer\s+|api[_-]?key[=:]\s*|password[=:]\s*|secret[=:]\s*|token[=:]\s*)[^\s&"']+"#)
        .expect("secret pattern")
});

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern")
});

/// Shortens prompt or reply text for logs and masks credentials and email addresses.
pub fn sanitize_prompt(prompt: &str) -> String {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return String::from("[EMPTY]");
    }

    let total = trimmed.chars().count();
    let visible = if total > MAX_VISIBLE_CHARS {
        let head: String = trimmed.chars().take(MAX_VISIBLE_CHARS).collect();
        format!("{head}... ({total} chars total)")
    } else {
        trimmed.to_string()
    };

    let masked = SECRET_PATTERN.replace_all(&visible, "${1}[REDACTED]");
    EMAIL_PATTERN
        .replace_all(&masked, "[EMAIL]")
        .into_owned()
}
