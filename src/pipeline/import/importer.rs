use rusqlite::Connection;

use super::format::validate_media_type;
use super::staging::FileStore;
use super::ImportError;
use crate::db::repository;
use crate::models::{validate_identifiers, NewNote, Note, SourceType};
use crate::pipeline::extraction::TextExtractor;

/// Text stored when extraction succeeds but recognizes nothing.
pub const NO_TEXT_PLACEHOLDER: &str = "[[ No text recognized ]]";

/// One uploaded document plus the metadata supplied with it.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub patient_id: String,
    pub author_id: String,
    pub file_name: String,
    pub declared_type: String,
    pub bytes: Vec<u8>,
    pub tags: Vec<String>,
}

/// Store an uploaded document, extract its text and persist it as an OCR note.
///
/// Unsupported types and invalid identifiers are rejected before anything is
/// written. Once the original is stored it is kept even if extraction fails;
/// in that case no note is created and the extraction error is returned
/// unchanged.
pub fn import_upload(
    store: &FileStore,
    extractor: &dyn TextExtractor,
    conn: &Connection,
    request: UploadRequest,
) -> Result<Note, ImportError> {
    // Step 1: Reject before touching storage
    let media_type = validate_media_type(&request.declared_type)?;
    validate_identifiers(&request.patient_id, &request.author_id)
        .map_err(ImportError::InvalidInput)?;

    tracing::info!(
        patient_id = %request.patient_id,
        media_type = media_type.as_str(),
        size = request.bytes.len(),
        "Starting document import"
    );

    // Step 2: Durable copy of the original
    let stored = store.store(&request.file_name, &request.bytes)?;
    drop(request.bytes);

    // Step 3: Extract. The stored original survives a failure here.
    let extraction = extractor
        .extract(&stored.path, media_type.as_str())
        .inspect_err(|e| {
            tracing::warn!(
                path = %stored.path.display(),
                kind = e.kind(),
                error = %e,
                "Extraction failed, original kept without note"
            );
        })?;

    // Step 4: Placeholder for empty results
    let text = if extraction.text.is_empty() {
        NO_TEXT_PLACEHOLDER.to_string()
    } else {
        extraction.text
    };

    // Step 5: Persist
    let note = repository::insert_note(
        conn,
        &NewNote {
            patient_id: request.patient_id,
            author_id: request.author_id,
            source_type: SourceType::Ocr,
            text,
            tags: request.tags,
            ocr_confidence: extraction.confidence,
            file_path: Some(stored.path.to_string_lossy().to_string()),
            file_mime: Some(media_type.as_str().to_string()),
            checksum: Some(stored.checksum),
        },
    )?;

    tracing::info!(
        note_id = note.id,
        pages = extraction.page_count,
        confidence = ?note.ocr_confidence,
        "Document imported"
    );

    Ok(note)
}
