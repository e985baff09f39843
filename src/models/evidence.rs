//! Evidence record model matching the dashboard's evidence objects.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::GpCategory;
use crate::errors::AppError;

/// A submitted artifact plus its descriptive metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Stored as text so records written by older clients with unknown codes still load
    pub category: String,
    /// Free-form label such as "lesson plan" or "certificate"
    #[serde(rename = "type", default)]
    pub evidence_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_file_id: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: String,
}

impl EvidenceRecord {
    /// Trims tags and drops empty entries and repeats, keeping first-seen order.
    pub fn normalize_tags(&mut self) {
        self.tags = normalize_tags(std::mem::take(&mut self.tags));
    }

    /// The recognized category, if the stored code is one of the six.
    pub fn gp_category(&self) -> Option<GpCategory> {
        GpCategory::parse(&self.category)
    }
}

/// Trim, drop empty entries, and drop repeats while preserving order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || out.iter().any(|t| t == tag) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

/// Metadata supplied by the teacher when submitting new evidence.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceSubmission {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(rename = "type", default)]
    pub evidence_type: String,
    #[serde(default)]
    pub standard_id: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl EvidenceSubmission {
    /// Check required fields and resolve the category.
    pub fn validate(&self) -> Result<GpCategory, AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(AppError::Validation("Description is required".to_string()));
        }
        GpCategory::parse(&self.category).ok_or_else(|| {
            AppError::Validation(format!(
                "Category must be one of GP1..GP6, got '{}'",
                self.category
            ))
        })
    }

    /// Build a new record with a fresh id and creation timestamp.
    pub fn into_record(self, category: GpCategory) -> EvidenceRecord {
        let now = Utc::now();
        let standard_id = self
            .standard_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let file_url = self.file_url.filter(|s| !s.trim().is_empty());

        EvidenceRecord {
            id: uuid::Uuid::new_v4().to_string(),
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category: category.as_str().to_string(),
            evidence_type: self.evidence_type.trim().to_string(),
            standard_id,
            file_url,
            drive_link: None,
            download_link: None,
            drive_file_id: None,
            date: self.date.unwrap_or_else(|| now.date_naive()),
            tags: normalize_tags(self.tags),
            created_at: now.to_rfc3339(),
        }
    }
}
