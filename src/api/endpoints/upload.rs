//! Scanned-document upload: store, OCR and persist as a note.

use axum::extract::{Multipart, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{split_tags, Note};
use crate::pipeline::import::format::validate_media_type;
use crate::pipeline::import::{import_upload, UploadRequest};

/// Allowance for the multipart envelope and text fields on top of the file
/// size cap when limiting the request body.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// `POST /notes/upload`: multipart fields `patient_id`, `author_id`,
/// `file` and optional comma-separated `tags`.
///
/// Extraction is CPU-bound and shells out to the OCR engine, so the whole
/// import runs on the blocking pool.
pub async fn upload(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<Note>, ApiError> {
    let mut patient_id = String::new();
    let mut author_id = String::new();
    let mut tags = Vec::new();
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "patient_id" => patient_id = field.text().await?.trim().to_string(),
            "author_id" => author_id = field.text().await?.trim().to_string(),
            "tags" => {
                let raw = field.text().await?;
                tags = split_tags(Some(raw.as_str()));
            }
            "file" => {
                let file_name = field.file_name().unwrap_or("document").to_string();
                let declared_type = match field.content_type() {
                    Some(ct) => ct.to_string(),
                    None => mime_guess::from_path(&file_name)
                        .first_raw()
                        .unwrap_or("")
                        .to_string(),
                };
                // Gate the declared type before buffering any file content
                validate_media_type(&declared_type)?;
                let bytes = field.bytes().await?;
                if bytes.len() > ctx.max_upload_bytes {
                    return Err(ApiError::PayloadTooLarge(format!(
                        "File exceeds {} byte limit",
                        ctx.max_upload_bytes
                    )));
                }
                file = Some((file_name, declared_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let (file_name, declared_type, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("No file provided".into()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".into()));
    }

    let request = UploadRequest {
        patient_id,
        author_id,
        file_name,
        declared_type,
        bytes,
        tags,
    };

    let note = tokio::task::spawn_blocking(move || -> Result<Note, ApiError> {
        let conn = ctx.open_db()?;
        let note = import_upload(&ctx.file_store, ctx.extractor.as_ref(), &conn, request)?;
        Ok(note)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Import task failed: {e}")))??;

    Ok(Json(note))
}
