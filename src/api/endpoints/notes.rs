//! Typed-note creation, listing and detail.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;
use crate::models::{
    validate_identifiers, NewNote, Note, NoteFilter, SourceType, DEFAULT_LIST_LIMIT,
    MAX_LIST_LIMIT,
};

/// Header carrying the caller's identity when the body omits `author_id`.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub patient_id: String,
    #[serde(default)]
    pub author_id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListNotesQuery {
    pub patient_id: Option<String>,
    pub source_type: Option<String>,
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListNotesQuery {
    fn into_filter(self) -> Result<NoteFilter, ApiError> {
        let source_type = match self.source_type.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<SourceType>().map_err(|_| {
                ApiError::BadRequest(format!("source_type must be 'manual' or 'ocr', got '{raw}'"))
            })?),
            None => None,
        };

        let limit = self.limit.unwrap_or(DEFAULT_LIST_LIMIT as i64);
        if !(1..=MAX_LIST_LIMIT as i64).contains(&limit) {
            return Err(ApiError::BadRequest(format!(
                "limit must be between 1 and {MAX_LIST_LIMIT}"
            )));
        }
        let offset = self.offset.unwrap_or(0);
        let offset = u32::try_from(offset)
            .map_err(|_| ApiError::BadRequest("offset must be a non-negative integer".into()))?;

        Ok(NoteFilter {
            patient_id: self.patient_id.filter(|p| !p.is_empty()),
            source_type,
            query: self.q.filter(|q| !q.is_empty()),
            limit: limit as u32,
            offset,
        })
    }
}

/// `POST /notes`: store a typed note.
pub async fn create(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
    payload: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let Json(req) = payload?;

    let header_author = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let author_id = req
        .author_id
        .as_deref()
        .filter(|a| !a.is_empty())
        .or(header_author)
        .ok_or_else(|| {
            ApiError::BadRequest(format!("author_id is required (body or {USER_ID_HEADER} header)"))
        })?
        .to_string();

    validate_identifiers(&req.patient_id, &author_id).map_err(ApiError::BadRequest)?;
    if req.text.is_empty() {
        return Err(ApiError::BadRequest("text must not be empty".into()));
    }

    let conn = ctx.open_db()?;
    let note = repository::insert_note(
        &conn,
        &NewNote::manual(&req.patient_id, &author_id, &req.text, req.tags.unwrap_or_default()),
    )?;

    tracing::info!(note_id = note.id, patient_id = %note.patient_id, "Manual note created");
    Ok(Json(note))
}

/// `GET /notes`: filtered listing, newest first.
pub async fn list(
    State(ctx): State<ApiContext>,
    query: Result<Query<ListNotesQuery>, QueryRejection>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let Query(query) = query?;
    let filter = query.into_filter()?;

    let conn = ctx.open_db()?;
    let notes = repository::list_notes(&conn, &filter)?;
    Ok(Json(notes))
}

/// `GET /notes/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<Note>, ApiError> {
    let conn = ctx.open_db()?;
    repository::get_note(&conn, id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Note {id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_uses_default_limit() {
        let filter = ListNotesQuery::default().into_filter().unwrap();
        assert_eq!(filter.limit, DEFAULT_LIST_LIMIT);
        assert_eq!(filter.offset, 0);
        assert!(filter.source_type.is_none());
    }

    #[test]
    fn invalid_source_type_rejected() {
        let query = ListNotesQuery {
            source_type: Some("fax".into()),
            ..Default::default()
        };
        assert!(matches!(query.into_filter(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn limit_bounds_enforced() {
        for limit in [0, 101, -5] {
            let query = ListNotesQuery {
                limit: Some(limit),
                ..Default::default()
            };
            assert!(query.into_filter().is_err(), "limit {limit} should be rejected");
        }
        let query = ListNotesQuery {
            limit: Some(100),
            ..Default::default()
        };
        assert_eq!(query.into_filter().unwrap().limit, 100);
    }

    #[test]
    fn negative_offset_rejected() {
        let query = ListNotesQuery {
            offset: Some(-1),
            ..Default::default()
        };
        assert!(query.into_filter().is_err());
    }

    #[test]
    fn empty_strings_treated_as_absent() {
        let query = ListNotesQuery {
            patient_id: Some(String::new()),
            source_type: Some(String::new()),
            q: Some(String::new()),
            ..Default::default()
        };
        let filter = query.into_filter().unwrap();
        assert!(filter.patient_id.is_none());
        assert!(filter.source_type.is_none());
        assert!(filter.query.is_none());
    }
}
