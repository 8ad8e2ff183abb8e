use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category_result::UNKNOWN_CATEGORY;
use super::profile_fragment::{MergeMode, merge_with};
use super::string_set::union_case_insensitive;
use super::{CategoryResult, ProfileFragment};

/// Long-lived aggregated fact sheet for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterProfile {
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub file_count: u64,
    #[serde(default)]
    pub source_files: Vec<SourceFile>,
    #[serde(default = "ProfileFragment::with_default_sections")]
    pub profile: ProfileFragment,
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryRollup>,
    #[serde(default)]
    pub insights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub file_name: String,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRollup {
    /// Mean relevance over every distinct file counted for the category.
    #[serde(default)]
    pub relevance: f64,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub data_points: Vec<String>,
}

/// What absorbing a category result did to the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsorbOutcome {
    Added,
    Redelivered,
    /// Placeholder results carry no facts and leave the profile untouched.
    Ignored,
}

impl MasterProfile {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            last_updated: now,
            file_count: 0,
            source_files: Vec::new(),
            profile: ProfileFragment::with_default_sections(),
            categories: BTreeMap::new(),
            insights: Vec::new(),
        }
    }

    pub fn has_source(&self, file_name: &str) -> bool {
        self.source_files.iter().any(|s| s.file_name == file_name)
    }

    /// Folds one file's categorization into the profile.
    ///
    /// A file already listed in `sourceFiles` is merged in redelivery mode, so
    /// its facts can fill gaps but accumulators and counts do not grow twice.
    pub fn absorb(&mut self, result: &CategoryResult, now: DateTime<Utc>) -> AbsorbOutcome {
        if result.is_placeholder() {
            return AbsorbOutcome::Ignored;
        }

        let redelivered = self.has_source(&result.file_name);
        let mode = if redelivered {
            MergeMode::Redelivery
        } else {
            MergeMode::Fresh
        };

        if let Some(fragment) = &result.extracted_profile {
            self.profile = merge_with(&self.profile, fragment, mode);
        }

        if redelivered {
            if let Some(source) = self
                .source_files
                .iter_mut()
                .find(|s| s.file_name == result.file_name)
            {
                source.processed_at = now;
            }
        } else {
            self.source_files.push(SourceFile {
                file_name: result.file_name.clone(),
                processed_at: now,
            });
        }

        for (name, entry) in &result.categories {
            if name == UNKNOWN_CATEGORY {
                continue;
            }
            let rollup = self.categories.entry(name.clone()).or_default();
            if !redelivered {
                let total = rollup.relevance * rollup.count as f64 + entry.relevance as f64;
                rollup.count += 1;
                rollup.relevance = (total / rollup.count as f64 * 10.0).round() / 10.0;
            }
            union_case_insensitive(&mut rollup.data_points, &entry.data_points);
        }

        union_case_insensitive(&mut self.insights, &result.insights);

        self.file_count = self.source_files.len() as u64;
        self.last_updated = now;

        if redelivered {
            AbsorbOutcome::Redelivered
        } else {
            AbsorbOutcome::Added
        }
    }

    /// Compact view handed to prompts: facts and category rollups, no bookkeeping.
    pub fn prompt_context(&self) -> serde_json::Value {
        let categories: serde_json::Map<String, serde_json::Value> = self
            .categories
            .iter()
            .map(|(name, rollup)| {
                (
                    name.clone(),
                    serde_json::json!({ "relevance": rollup.relevance, "count": rollup.count }),
                )
            })
            .collect();

        serde_json::json!({
            "fileCount": self.file_count,
            "profile": self.profile.sections(),
            "categories": categories,
        })
    }
}
