//! Original-document download.

use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;

/// `GET /files/:id`: the stored original behind an OCR note.
pub async fn download(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let not_found = || ApiError::NotFound("File not found".into());

    let note = {
        let conn = ctx.open_db()?;
        repository::get_note(&conn, id)?
    }
    .ok_or_else(not_found)?;
    let path = note.file_path.ok_or_else(not_found)?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(ApiError::Internal(format!("Failed to read {path}: {e}"))),
    };

    let content_type = note
        .file_mime
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            mime_guess::from_path(&path)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });
    let file_name = FsPath::new(&path)
        .file_name()
        .map(|n| n.to_string_lossy().replace('"', "_"))
        .unwrap_or_else(|| "document".into());

    let mut response = Body::from(bytes).into_response();
    let headers = response.headers_mut();
    if let Ok(val) = HeaderValue::from_str(&content_type) {
        headers.insert(header::CONTENT_TYPE, val);
    }
    if let Ok(val) = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, val);
    }
    Ok(response)
}
