use super::enums::SourceType;

pub const DEFAULT_LIST_LIMIT: u32 = 20;
pub const MAX_LIST_LIMIT: u32 = 100;

/// Note listing criteria. All filters combine with AND.
#[derive(Debug, Clone)]
pub struct NoteFilter {
    pub patient_id: Option<String>,
    pub source_type: Option<SourceType>,
    /// Substring matched against text or tags.
    pub query: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for NoteFilter {
    fn default() -> Self {
        Self {
            patient_id: None,
            source_type: None,
            query: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}
