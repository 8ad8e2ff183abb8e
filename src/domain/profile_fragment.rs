use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

use super::string_set::fold;

/// Sections every master profile starts with. The model may add more.
pub const PROFILE_SECTIONS: &[&str] = &[
    "financial",
    "professional",
    "social",
    "health",
    "travel",
    "technology",
    "demographics",
    "interests",
    "entertainment",
];

const PLACEHOLDER_SCALARS: &[&str] = &["unknown", "n/a", "none", "null", "not found", "not available"];

/// Nested mapping of named profile sections.
///
/// Leaves are scalars, objects, or string sets. The fragment also remembers the
/// digests of every fragment merged into it so that re-applying the same
/// fragment is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileFragment {
    #[serde(
        rename = "_mergedDigests",
        default,
        skip_serializing_if = "BTreeSet::is_empty"
    )]
    merged_digests: BTreeSet<String>,
    #[serde(flatten)]
    sections: Map<String, Value>,
}

/// How numeric accumulators react to a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// New facts: accumulators add, weighted averages combine.
    Fresh,
    /// The same source was merged before: accumulators and averages stay put.
    Redelivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Root,
    Section,
    Nested,
}

impl Level {
    fn child(self) -> Self {
        match self {
            Level::Root => Level::Section,
            Level::Section | Level::Nested => Level::Nested,
        }
    }
}

impl ProfileFragment {
    pub fn new(sections: Map<String, Value>) -> Self {
        Self {
            merged_digests: BTreeSet::new(),
            sections,
        }
    }

    /// Profile with every default section present and empty.
    pub fn with_default_sections() -> Self {
        let sections = PROFILE_SECTIONS
            .iter()
            .map(|name| (name.to_string(), Value::Object(Map::new())))
            .collect();
        Self::new(sections)
    }

    pub fn sections(&self) -> &Map<String, Value> {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    /// Walks a dotted path such as `financial.totalSpend`.
    pub fn lookup(&self, dotted_path: &str) -> Option<&Value> {
        let mut parts = dotted_path.split('.');
        let first = parts.next()?;
        parts.try_fold(self.sections.get(first)?, |value, part| value.get(part))
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(is_empty_value)
    }

    pub fn merged_digests(&self) -> &BTreeSet<String> {
        &self.merged_digests
    }

    /// Stable content digest. `serde_json::Map` keeps keys sorted, so the
    /// serialization is canonical.
    pub fn digest(&self) -> String {
        let canonical = serde_json::to_vec(&self.sections).unwrap_or_default();
        format!("{:x}", Sha256::digest(&canonical))
    }
}

/// Deep-merges `incoming` into `existing`.
pub fn merge(existing: &ProfileFragment, incoming: &ProfileFragment) -> ProfileFragment {
    merge_with(existing, incoming, MergeMode::Fresh)
}

pub fn merge_with(
    existing: &ProfileFragment,
    incoming: &ProfileFragment,
    mode: MergeMode,
) -> ProfileFragment {
    if incoming.is_empty() {
        return existing.clone();
    }

    let digest = incoming.digest();
    if existing.merged_digests.contains(&digest) {
        return existing.clone();
    }

    let mut merged = existing.clone();
    for (key, value) in &incoming.sections {
        let current = merged.sections.remove(key);
        if let Some(next) = merge_value(key, current, value, Level::Root, mode) {
            merged.sections.insert(key.clone(), next);
        }
    }

    merged
        .merged_digests
        .extend(incoming.merged_digests.iter().cloned());
    merged.merged_digests.insert(digest);
    merged
}

fn merge_value(
    key: &str,
    existing: Option<Value>,
    incoming: &Value,
    level: Level,
    mode: MergeMode,
) -> Option<Value> {
    if is_empty_value(incoming) {
        return existing;
    }

    let current = match existing {
        Some(value) if !is_empty_value(&value) => value,
        _ => return Some(fill_empty(key, incoming, level, mode)),
    };

    let merged = match (current, incoming) {
        (Value::Array(items), Value::Array(new_items)) => Value::Array(union_values(items, new_items)),
        (Value::Array(items), Value::String(_)) => {
            Value::Array(union_values(items, std::slice::from_ref(incoming)))
        }
        (Value::String(s), Value::Array(new_items)) => {
            Value::Array(union_values(vec![Value::String(s)], new_items))
        }
        (Value::Object(map), Value::Object(new_map)) => {
            if is_weighted_average(&map) && is_weighted_average(new_map) {
                Value::Object(merge_weighted_average(map, new_map, level, mode))
            } else {
                Value::Object(merge_object(map, new_map, level.child(), mode))
            }
        }
        (Value::Number(n), Value::Number(new_n)) if is_accumulator_key(key) => match mode {
            MergeMode::Fresh => add_numbers(&n, new_n),
            MergeMode::Redelivery => Value::Number(n),
        },
        // Confirmed facts are not replaced by a later read; deeper detail is.
        (current, new_value) => match level {
            Level::Root | Level::Section => current,
            Level::Nested => new_value.clone(),
        },
    };

    Some(merged)
}

fn fill_empty(key: &str, incoming: &Value, level: Level, mode: MergeMode) -> Value {
    match incoming {
        Value::Array(items) => Value::Array(union_values(Vec::new(), items)),
        Value::Object(map) => Value::Object(merge_object(Map::new(), map, level.child(), mode)),
        Value::Number(n) if is_accumulator_key(key) => non_negative(n),
        other => other.clone(),
    }
}

fn merge_object(
    mut existing: Map<String, Value>,
    incoming: &Map<String, Value>,
    level: Level,
    mode: MergeMode,
) -> Map<String, Value> {
    for (key, value) in incoming {
        let current = existing.remove(key);
        if let Some(next) = merge_value(key, current, value, level, mode) {
            existing.insert(key.clone(), next);
        }
    }
    existing
}

fn merge_weighted_average(
    existing: Map<String, Value>,
    incoming: &Map<String, Value>,
    level: Level,
    mode: MergeMode,
) -> Map<String, Value> {
    let (avg_a, count_a) = weighted_parts(&existing);
    let (avg_b, count_b) = weighted_parts(incoming);

    let (average, count) = match mode {
        MergeMode::Redelivery if count_a > 0.0 => (avg_a, count_a),
        _ if count_a <= 0.0 => (avg_b, count_b),
        _ if count_b <= 0.0 => (avg_a, count_a),
        _ => (
            (avg_a * count_a + avg_b * count_b) / (count_a + count_b),
            count_a + count_b,
        ),
    };

    let mut extras = incoming.clone();
    extras.remove("average");
    extras.remove("count");
    let mut merged = merge_object(existing, &extras, level.child(), mode);
    merged.insert("average".to_string(), number_value(average));
    merged.insert("count".to_string(), number_value(count));
    merged
}

fn weighted_parts(map: &Map<String, Value>) -> (f64, f64) {
    let average = map.get("average").and_then(Value::as_f64).unwrap_or(0.0);
    let count = map.get("count").and_then(Value::as_f64).unwrap_or(0.0);
    (average, count.max(0.0))
}

fn is_weighted_average(map: &Map<String, Value>) -> bool {
    map.get("average").is_some_and(Value::is_number) && map.get("count").is_some_and(Value::is_number)
}

fn is_accumulator_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    lower.starts_with("total") || lower.ends_with("total")
}

fn add_numbers(a: &Number, b: &Number) -> Value {
    let b = match non_negative(b) {
        Value::Number(n) => n,
        _ => return Value::Number(a.clone()),
    };
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = x.checked_add(y) {
            return Value::Number(sum.into());
        }
    }
    let sum = a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0);
    Number::from_f64(sum)
        .map(Value::Number)
        .unwrap_or_else(|| Value::Number(a.clone()))
}

fn non_negative(n: &Number) -> Value {
    match n.as_f64() {
        Some(v) if v < 0.0 => Value::Number(0.into()),
        _ => Value::Number(n.clone()),
    }
}

fn number_value(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Value::Number((v as i64).into())
    } else {
        Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Set union: strings compare case-insensitively, other members by equality.
fn union_values(existing: Vec<Value>, incoming: &[Value]) -> Vec<Value> {
    let mut seen_strings: HashSet<String> = HashSet::new();
    let mut out: Vec<Value> = Vec::with_capacity(existing.len() + incoming.len());

    for item in existing.into_iter().chain(incoming.iter().cloned()) {
        match &item {
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() || !seen_strings.insert(fold(trimmed)) {
                    continue;
                }
                out.push(Value::String(trimmed.to_string()));
            }
            Value::Null => {}
            other => {
                if !out.contains(other) {
                    out.push(item);
                }
            }
        }
    }

    out
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            let folded = fold(s);
            folded.is_empty() || PLACEHOLDER_SCALARS.contains(&folded.as_str())
        }
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
