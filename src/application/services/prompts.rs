use crate::domain::{CategoryEntry, Persona};

/// Categories the model must always evaluate, whatever else it discovers.
pub const CORE_CATEGORIES: &[&str] = &["financial", "social", "professional", "entertainment"];

pub const CATEGORIZER_SYSTEM_MESSAGE: &str = "You are a data analyst who classifies personal data exports. \
Respond with a single JSON object and nothing else. Only report facts that are present in the content.";

pub const PERSONA_SYSTEM_MESSAGE: &str = "You maintain long-lived persona profiles built from personal data. \
Respond with a single JSON object describing the full updated persona and nothing else.";

pub fn categorization_prompt(file_name: &str, file_type: &str, content: &str) -> String {
    format!(
        r#"Analyze the file "{file_name}" (type: {file_type}).

Always evaluate these categories: {core}.
Also add any other category that clearly fits the content (for example health, travel, technology, shopping, education).

Return JSON with exactly this shape:
{{
  "fileName": "{file_name}",
  "fileType": "{file_type}",
  "summary": "one paragraph describing the content",
  "categories": {{
    "<categoryName>": {{ "relevance": <integer 0-10>, "summary": "...", "dataPoints": ["..."] }}
  }},
  "entityNames": ["people, companies, places mentioned"],
  "insights": ["observations about the person"],
  "sensitiveInfo": <true if the content holds identifiers, health or financial account data>,
  "extractedProfile": {{
    "<section>": {{ "<field>": <value> }}
  }}
}}

Rules for extractedProfile:
- Sections are things like financial, professional, social, health, travel, technology, demographics, interests.
- Only include facts actually found in the content. Omit anything unknown.
- Use arrays of strings for lists (skills, platforms, interests, destinations, devices).
- Name running sums with a "total" prefix (e.g. "totalSpend") and give them as numbers.
- Give averages as {{ "average": <number>, "count": <number of samples> }}.

Content:
{content}"#,
        core = CORE_CATEGORIES.join(", "),
    )
}

pub fn persona_update_prompt(
    existing: &Persona,
    category: &str,
    entry: &CategoryEntry,
    file_name: &str,
    master_context: Option<&serde_json::Value>,
) -> String {
    let persona_json = serde_json::to_string_pretty(existing).unwrap_or_else(|_| "{}".to_string());
    let data_points = serde_json::to_string(&entry.data_points).unwrap_or_else(|_| "[]".to_string());
    let context = master_context
        .and_then(|c| serde_json::to_string(c).ok())
        .unwrap_or_else(|| "{}".to_string());

    format!(
        r#"Update the "{category}" persona with new information from "{file_name}".

Current persona:
{persona_json}

New information (relevance {relevance}/10):
Summary: {summary}
Data points: {data_points}

Master profile context (read-only):
{context}

Return the complete updated persona as JSON with the fields
"summary", "completeness" (0-100, never lower than the current {completeness}),
"insights", "dataPoints", "traits" and "sources" (existing sources plus "{file_name}").
Keep every existing trait unless the new information contradicts it."#,
        relevance = entry.relevance,
        summary = entry.summary,
        completeness = existing.completeness,
    )
}
