use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::string_set::{dedup_case_insensitive, union_case_insensitive};

pub const MAX_COMPLETENESS: u8 = 100;

/// Narrative profile for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    #[serde(rename = "type")]
    pub persona_type: String,
    pub name: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_completeness")]
    pub completeness: u8,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub data_points: Vec<String>,
    #[serde(default)]
    pub traits: Map<String, Value>,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Replacement persona as returned by the model. Everything is optional; the
/// identity fields and timestamps are never taken from the model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaUpdate {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_completeness")]
    pub completeness: Option<u8>,
    #[serde(default)]
    pub insights: Option<Vec<String>>,
    #[serde(default)]
    pub data_points: Option<Vec<String>>,
    #[serde(default)]
    pub traits: Option<Map<String, Value>>,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
}

impl PersonaUpdate {
    /// True when the reply carried none of the recognized persona fields.
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.completeness.is_none()
            && self.insights.is_none()
            && self.data_points.is_none()
            && self.traits.is_none()
            && self.sources.is_none()
    }
}

impl Persona {
    /// Fresh persona with the trait skeleton for `category`.
    pub fn new_for(category: &str, now: DateTime<Utc>) -> Self {
        Self {
            persona_type: category.to_string(),
            name: display_name(category),
            last_updated: now,
            completeness: 0,
            summary: String::new(),
            insights: Vec::new(),
            data_points: Vec::new(),
            traits: default_traits(category),
            sources: Vec::new(),
        }
    }

    /// Touches only `sources` and `lastUpdated`. Used when an update fails.
    pub fn record_source(&mut self, file_name: &str, now: DateTime<Utc>) {
        union_case_insensitive(&mut self.sources, [file_name]);
        self.last_updated = now;
    }

    /// Applies a model-produced replacement while holding the invariants:
    /// completeness never drops, sources only grow, and blank fields in the
    /// update never erase existing content.
    pub fn apply_update(&self, update: PersonaUpdate, file_name: &str, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();

        if let Some(summary) = update.summary.filter(|s| !s.trim().is_empty()) {
            next.summary = summary.trim().to_string();
        }
        if let Some(insights) = update.insights.filter(|v| !v.is_empty()) {
            next.insights = dedup_case_insensitive(insights);
        }
        if let Some(points) = update.data_points.filter(|v| !v.is_empty()) {
            next.data_points = dedup_case_insensitive(points);
        }
        if let Some(traits) = update.traits.filter(|t| !t.is_empty()) {
            let mut merged = self.traits.clone();
            merged.extend(traits);
            next.traits = merged;
        }
        if let Some(score) = update.completeness {
            next.completeness = score.max(self.completeness);
        }
        if let Some(sources) = update.sources {
            union_case_insensitive(&mut next.sources, sources);
        }

        next.record_source(file_name, now);
        next
    }
}

/// Every persona of one user, keyed by category. Written as a single document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonasDocument {
    personas: BTreeMap<String, Persona>,
}

impl PersonasDocument {
    pub fn get(&self, category: &str) -> Option<&Persona> {
        self.personas.get(category)
    }

    /// Existing persona for `category`, or a new skeleton.
    pub fn current_or_new(&self, category: &str, now: DateTime<Utc>) -> Persona {
        self.personas
            .get(category)
            .cloned()
            .unwrap_or_else(|| Persona::new_for(category, now))
    }

    pub fn insert(&mut self, category: &str, persona: Persona) {
        self.personas.insert(category.to_string(), persona);
    }

    pub fn categories(&self) -> impl Iterator<Item = &String> {
        self.personas.keys()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

fn display_name(category: &str) -> String {
    let title: String = category
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("{title} Persona")
}

fn default_traits(category: &str) -> Map<String, Value> {
    let skeleton = match category {
        "financial" => json!({
            "spendingHabits": [],
            "incomeSources": [],
            "financialGoals": [],
            "riskTolerance": "",
        }),
        "social" => json!({
            "platforms": [],
            "relationships": [],
            "communicationStyle": "",
        }),
        "professional" => json!({
            "skills": [],
            "roles": [],
            "industries": [],
            "careerStage": "",
        }),
        "entertainment" => json!({
            "genres": [],
            "platforms": [],
            "favorites": [],
        }),
        "health" => json!({
            "activities": [],
            "conditions": [],
            "goals": [],
        }),
        "travel" => json!({
            "destinations": [],
            "travelStyle": "",
            "frequency": "",
        }),
        _ => json!({}),
    };

    match skeleton {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn completeness_from(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    Some(number.round().clamp(0.0, MAX_COMPLETENESS as f64) as u8)
}

fn lenient_completeness<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(completeness_from(&value).unwrap_or(0))
}

fn lenient_optional_completeness<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(completeness_from(&value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_snake_case_category_when_naming_then_title_cased() {
        assert_eq!(display_name("online_shopping"), "Online Shopping Persona");
        assert_eq!(display_name("financial"), "Financial Persona");
    }

    #[test]
    fn given_percent_string_when_reading_completeness_then_clamped_number() {
        assert_eq!(completeness_from(&json!("85%")), Some(85));
        assert_eq!(completeness_from(&json!(140)), Some(100));
        assert_eq!(completeness_from(&json!(null)), None);
    }

    #[test]
    fn given_reply_without_persona_fields_when_parsed_then_update_is_empty() {
        let update: PersonaUpdate =
            serde_json::from_value(json!({"error": "rate limited"})).unwrap();
        assert!(update.is_empty());

        let update: PersonaUpdate = serde_json::from_value(json!({"summary": "Saves"})).unwrap();
        assert!(!update.is_empty());
    }
}
