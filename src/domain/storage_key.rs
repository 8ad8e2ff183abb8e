use std::fmt;
use std::str::FromStr;

/// File name of the per-user master profile inside the `categorized` stage.
pub const MASTER_PROFILE_FILE: &str = "user_master_profile.json";

/// File name of the per-user personas document inside the `personas` stage.
pub const PERSONAS_FILE: &str = "personas.json";

const CHUNK_MARKER: &str = "_chunk_";

/// One of the sequential storage namespaces a user's data passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Raw,
    Normalized,
    Categorized,
    Personas,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Raw => "raw",
            Stage::Normalized => "normalized",
            Stage::Categorized => "categorized",
            Stage::Personas => "personas",
        }
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Stage::Raw),
            "normalized" => Ok(Stage::Normalized),
            "categorized" => Ok(Stage::Categorized),
            "personas" => Ok(Stage::Personas),
            _ => Err(format!("Invalid stage: {}", s)),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageKeyError {
    #[error("key has no user segment: {0}")]
    MissingUser(String),
    #[error("key has no relative path: {0}")]
    MissingPath(String),
    #[error("unknown stage in key {key}: {stage}")]
    UnknownStage { key: String, stage: String },
}

/// Blob key of the form `{userId}/{stage}/{relativePath}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    user_id: String,
    stage: Stage,
    relative_path: String,
}

impl StorageKey {
    pub fn new(user_id: impl Into<String>, stage: Stage, relative_path: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            stage,
            relative_path: relative_path.into().trim_start_matches('/').to_string(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, StorageKeyError> {
        let mut parts = raw.trim_start_matches('/').splitn(3, '/');
        let user_id = parts
            .next()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| StorageKeyError::MissingUser(raw.to_string()))?;
        let stage_str = parts
            .next()
            .ok_or_else(|| StorageKeyError::MissingPath(raw.to_string()))?;
        let stage = stage_str
            .parse::<Stage>()
            .map_err(|_| StorageKeyError::UnknownStage {
                key: raw.to_string(),
                stage: stage_str.to_string(),
            })?;
        let relative_path = parts.next().unwrap_or_default();

        Ok(Self::new(user_id, stage, relative_path))
    }

    pub fn master_profile(user_id: &str) -> Self {
        Self::new(user_id, Stage::Categorized, MASTER_PROFILE_FILE)
    }

    pub fn personas(user_id: &str) -> Self {
        Self::new(user_id, Stage::Personas, PERSONAS_FILE)
    }

    /// Where the categorizer writes the result for a processed file.
    pub fn category_result(user_id: &str, file_name: &str) -> Self {
        let mut stem = sanitize_file_name(file_name);
        if format!("{stem}.json") == MASTER_PROFILE_FILE {
            stem.push_str("_file");
        }
        Self::new(user_id, Stage::Categorized, format!("{stem}.json"))
    }

    /// Prefix covering a whole stage for a user, suitable for listing.
    pub fn stage_prefix(user_id: &str, stage: Stage) -> String {
        format!("{}/{}/", user_id, stage.as_str())
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Last path segment of the relative path.
    pub fn file_name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }

    pub fn is_master_profile(&self) -> bool {
        self.stage == Stage::Categorized && self.relative_path == MASTER_PROFILE_FILE
    }

    /// Directory placeholders, temp markers and hidden files carry no data.
    pub fn is_data_object(&self) -> bool {
        let name = self.file_name();
        if self.relative_path.is_empty() || self.relative_path.ends_with('/') || name.is_empty() {
            return false;
        }
        let lower = name.to_lowercase();
        !(lower.starts_with('.')
            || lower.starts_with("~$")
            || lower.ends_with(".tmp")
            || lower.ends_with(".temp")
            || lower.ends_with(".part")
            || lower.ends_with("$folder$"))
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.user_id,
            self.stage.as_str(),
            self.relative_path
        )
    }
}

/// Splits `dir/name.ext` into (`dir/name`, `ext`). The extension is empty when absent.
pub fn split_extension(relative_path: &str) -> (&str, &str) {
    let name_start = relative_path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match relative_path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => {
            let at = name_start + dot;
            (&relative_path[..at], &relative_path[at + 1..])
        }
        _ => (relative_path, ""),
    }
}

/// Name for chunk `sequence` (1-based) of a normalized file.
pub fn chunk_relative_path(stem: &str, sequence: usize, extension: &str) -> String {
    if extension.is_empty() {
        format!("{stem}{CHUNK_MARKER}{sequence:03}")
    } else {
        format!("{stem}{CHUNK_MARKER}{sequence:03}.{extension}")
    }
}

/// True if `relative_path` is the normalized output for `stem`, chunked or not.
pub fn belongs_to_stem(relative_path: &str, stem: &str) -> bool {
    let (candidate_stem, _) = split_extension(relative_path);
    if candidate_stem == stem {
        return true;
    }
    candidate_stem
        .strip_prefix(stem)
        .and_then(|rest| rest.strip_prefix(CHUNK_MARKER))
        .is_some_and(|seq| !seq.is_empty() && seq.chars().all(|c| c.is_ascii_digit()))
}

/// Replaces anything outside `[A-Za-z0-9_-]` so the name is safe as a single key segment.
pub fn sanitize_file_name(file_name: &str) -> String {
    let sanitized: String = file_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "unnamed".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_nested_path_when_splitting_extension_then_only_file_name_dot_counts() {
        assert_eq!(split_extension("a.b/report.pdf"), ("a.b/report", "pdf"));
        assert_eq!(split_extension("a.b/README"), ("a.b/README", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
    }

    #[test]
    fn given_chunk_names_when_checking_stem_then_only_matching_sequences_belong() {
        assert!(belongs_to_stem("report_chunk_001.txt", "report"));
        assert!(belongs_to_stem("report.txt", "report"));
        assert!(!belongs_to_stem("report_chunk_x.txt", "report"));
        assert!(!belongs_to_stem("report2_chunk_001.txt", "report"));
    }
}
