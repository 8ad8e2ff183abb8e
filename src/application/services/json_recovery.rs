use serde::de::DeserializeOwned;

/// Result of reading model output as JSON, tagged with the path that succeeded.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    /// The whole reply was valid JSON.
    Parsed(T),
    /// Valid JSON was found inside surrounding noise.
    Recovered(T),
    Failed(String),
}

impl<T> ParseOutcome<T> {
    pub fn path(&self) -> &'static str {
        match self {
            ParseOutcome::Parsed(_) => "strict",
            ParseOutcome::Recovered(_) => "recovered",
            ParseOutcome::Failed(_) => "failed",
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match self {
            ParseOutcome::Parsed(value) | ParseOutcome::Recovered(value) => Ok(value),
            ParseOutcome::Failed(reason) => Err(reason),
        }
    }
}

/// Strict parse first, then the balanced `{...}` spans of the reply, largest first.
pub fn parse_model_json<T: DeserializeOwned>(raw: &str) -> ParseOutcome<T> {
    let strict_error = match serde_json::from_str::<T>(raw.trim()) {
        Ok(value) => return ParseOutcome::Parsed(value),
        Err(e) => e.to_string(),
    };

    let mut spans = balanced_object_spans(raw);
    spans.sort_by_key(|(start, end)| std::cmp::Reverse(end - start));

    for (start, end) in spans {
        if let Ok(value) = serde_json::from_str::<T>(&raw[start..end]) {
            return ParseOutcome::Recovered(value);
        }
    }

    ParseOutcome::Failed(strict_error)
}

/// Byte ranges of every top-level brace-balanced span, skipping braces inside strings.
fn balanced_object_spans(raw: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in raw.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = idx;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push((start, idx + 1));
                }
            }
            _ => {}
        }
    }

    spans
}
