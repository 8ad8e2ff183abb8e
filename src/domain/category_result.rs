use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ProfileFragment;
use super::string_set::union_case_insensitive;

pub const UNKNOWN_CATEGORY: &str = "unknown";
pub const MAX_RELEVANCE: u8 = 10;

/// Per-file classification output. Written once per source file, overwritten on re-processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResult {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryEntry>,
    #[serde(default)]
    pub entity_names: Vec<String>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub sensitive_info: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_profile: Option<ProfileFragment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryEntry {
    #[serde(default, deserialize_with = "lenient_relevance")]
    pub relevance: u8,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub data_points: Vec<String>,
}

impl CategoryEntry {
    /// Keeps the higher relevance and its summary, and the union of both data points.
    fn combine(self, other: CategoryEntry) -> CategoryEntry {
        let (mut kept, other) = if other.relevance > self.relevance {
            (other, self)
        } else {
            (self, other)
        };
        if kept.summary.trim().is_empty() {
            kept.summary = other.summary;
        }
        union_case_insensitive(&mut kept.data_points, other.data_points);
        kept
    }
}

impl CategoryResult {
    /// Well-formed stand-in used when the AI output could not be understood.
    pub fn unknown(file_name: &str, file_type: &str, reason: &str) -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(
            UNKNOWN_CATEGORY.to_string(),
            CategoryEntry {
                relevance: 0,
                summary: format!("Categorization unavailable: {reason}"),
                data_points: Vec::new(),
            },
        );

        Self {
            file_name: file_name.to_string(),
            file_type: file_type.to_string(),
            summary: "Unable to categorize content".to_string(),
            categories,
            entity_names: Vec::new(),
            insights: Vec::new(),
            sensitive_info: false,
            extracted_profile: None,
        }
    }

    /// Enforces the invariants the model cannot be trusted with: identity fields,
    /// normalized category names, and no empty category names.
    pub fn normalize(mut self, file_name: &str, file_type: &str) -> Self {
        self.file_name = file_name.to_string();
        if self.file_type.trim().is_empty() {
            self.file_type = file_type.to_string();
        }

        let categories = std::mem::take(&mut self.categories);
        for (name, mut entry) in categories {
            let name = name.trim().to_lowercase();
            if name.is_empty() {
                continue;
            }
            entry.relevance = entry.relevance.min(MAX_RELEVANCE);
            entry.data_points.retain(|p| !p.trim().is_empty());
            // Names differing only in case or padding collapse into one entry.
            let entry = match self.categories.remove(&name) {
                Some(previous) => previous.combine(entry),
                None => entry,
            };
            self.categories.insert(name, entry);
        }

        self.insights.retain(|i| !i.trim().is_empty());
        self.entity_names.retain(|e| !e.trim().is_empty());
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.categories.len() == 1 && self.categories.contains_key(UNKNOWN_CATEGORY)
    }

    pub fn category_names(&self) -> Vec<String> {
        self.categories.keys().cloned().collect()
    }
}

/// Models return relevance as ints, floats or strings; anything unparseable is 0.
fn lenient_relevance<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let number = match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(number.round().clamp(0.0, MAX_RELEVANCE as f64) as u8)
}
