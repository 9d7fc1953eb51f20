use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::SourceType;

/// A stored clinical note, typed or recognized from an uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub patient_id: String,
    pub author_id: String,
    pub source_type: SourceType,
    pub text: String,
    pub tags: Vec<String>,
    pub ocr_confidence: Option<f64>,
    pub file_path: Option<String>,
    pub file_mime: Option<String>,
    #[serde(skip_serializing)]
    pub checksum: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the caller; id and timestamp are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub patient_id: String,
    pub author_id: String,
    pub source_type: SourceType,
    pub text: String,
    pub tags: Vec<String>,
    pub ocr_confidence: Option<f64>,
    pub file_path: Option<String>,
    pub file_mime: Option<String>,
    pub checksum: Option<String>,
}

impl NewNote {
    pub fn manual(patient_id: &str, author_id: &str, text: &str, tags: Vec<String>) -> Self {
        Self {
            patient_id: patient_id.to_string(),
            author_id: author_id.to_string(),
            source_type: SourceType::Manual,
            text: text.to_string(),
            tags,
            ocr_confidence: None,
            file_path: None,
            file_mime: None,
            checksum: None,
        }
    }
}

pub const MAX_PATIENT_ID_LEN: usize = 128;
pub const MAX_AUTHOR_ID_LEN: usize = 256;

/// Check identifier lengths (in characters). Returns a message naming the
/// offending field.
pub fn validate_identifiers(patient_id: &str, author_id: &str) -> Result<(), String> {
    let patient_len = patient_id.chars().count();
    if patient_len == 0 || patient_len > MAX_PATIENT_ID_LEN {
        return Err(format!("patient_id must be 1-{MAX_PATIENT_ID_LEN} characters"));
    }
    let author_len = author_id.chars().count();
    if author_len == 0 || author_len > MAX_AUTHOR_ID_LEN {
        return Err(format!("author_id must be 1-{MAX_AUTHOR_ID_LEN} characters"));
    }
    Ok(())
}

/// Split a comma-separated tag column, dropping empty entries.
pub fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Join tags for storage; `None` when there are none.
pub fn join_tags(tags: &[String]) -> Option<String> {
    let cleaned: Vec<&str> = tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.join(","))
    }
}
