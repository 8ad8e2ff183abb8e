use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static HYPHEN_NEWLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<prefix>\w)-[ \t]*\r?\n[ \t]*(?P<suffix>\w)").expect("hyphen pattern")
});

/// NFKC-normalizes extracted text, re-joins words hyphenated across line
/// breaks, drops control characters and collapses whitespace. Paragraph
/// breaks survive as a single blank line.
pub fn sanitize_extracted_text(raw: &str) -> String {
    let normalized: String = raw
        .nfkc()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();
    let de_hyphenated = HYPHEN_NEWLINE.replace_all(&normalized, "$prefix$suffix");

    let mut result = String::with_capacity(de_hyphenated.len());
    let mut pending_break: Option<&str> = None;

    for line in de_hyphenated.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !result.is_empty() {
                pending_break = Some("\n\n");
            }
            continue;
        }

        if let Some(separator) = pending_break.take() {
            result.push_str(separator);
        }
        collapse_whitespace(trimmed, &mut result);
        pending_break = Some("\n");
    }

    result
}

fn collapse_whitespace(line: &str, out: &mut String) {
    let mut prev_was_space = false;
    for ch in line.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                out.push(' ');
            }
            prev_was_space = true;
        } else {
            out.push(ch);
            prev_was_space = false;
        }
    }
}
