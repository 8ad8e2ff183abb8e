use std::sync::LazyLock;

use regex::Regex;

use super::EnrichmentError;

/// Larger inputs are not scanned; the caller keeps the plain text.
const MAX_SCAN_CHARS: usize = 2_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub label: &'static str,
    pub value: String,
}

struct FieldPattern {
    label: &'static str,
    pattern: Regex,
}

fn labelled(label: &'static str, names: &str, value: &str) -> FieldPattern {
    let source = format!(r"(?im)^[ \t]*(?:{names})[ \t]*[:#\-][ \t]*({value})[ \t]*$");
    FieldPattern {
        label,
        pattern: Regex::new(&source).expect("form field pattern"),
    }
}

static FIELD_PATTERNS: LazyLock<Vec<FieldPattern>> = LazyLock::new(|| {
    vec![
        labelled("Name", r"(?:full[ \t]+|first[ \t]+|last[ \t]+)?name", r"[^\n]{2,80}"),
        labelled("Email", r"e-?mail(?:[ \t]+address)?", r"[^\s@]+@[^\s@]+\.[A-Za-z]{2,}"),
        labelled("Phone", r"(?:tel(?:ephone)?|phone|mobile|cell)(?:[ \t]+(?:number|no\.?))?", r"\+?[0-9][0-9 ().\-]{6,20}"),
        labelled("Address", r"(?:street[ \t]+|mailing[ \t]+|home[ \t]+)?address", r"[^\n]{5,120}"),
        labelled("Date of birth", r"(?:date[ \t]+of[ \t]+birth|d\.?o\.?b\.?|birth[ \t]*date)", r"[0-9A-Za-z ,./\-]{6,30}"),
        labelled("SSN", r"(?:ssn|social[ \t]+security(?:[ \t]+(?:number|no\.?))?)", r"[0-9Xx*]{3}-?[0-9Xx*]{2}-?[0-9]{4}"),
        labelled("Account number", r"(?:account|acct|iban)(?:[ \t]+(?:number|no\.?))?", r"[A-Za-z0-9 *\-]{4,34}"),
    ]
});

/// Pulls labelled personal fields such as `Email: a@b.com` out of extracted text.
/// The first occurrence of each label wins.
pub fn extract_form_fields(text: &str) -> Result<Vec<FormField>, EnrichmentError> {
    let size = text.chars().count();
    if size > MAX_SCAN_CHARS {
        return Err(EnrichmentError::InputTooLarge {
            size,
            limit: MAX_SCAN_CHARS,
        });
    }

    Ok(FIELD_PATTERNS
        .iter()
        .filter_map(|field| {
            field
                .pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|value| FormField {
                    label: field.label,
                    value: value.as_str().trim().to_string(),
                })
        })
        .filter(|field| !field.value.is_empty())
        .collect())
}

/// Renders fields as the block placed before the document body.
pub fn render_preamble(fields: &[FormField]) -> Option<String> {
    if fields.is_empty() {
        return None;
    }
    let mut block = String::from("Form fields:\n");
    for field in fields {
        block.push_str(&format!("- {}: {}\n", field.label, field.value));
    }
    Some(block)
}
