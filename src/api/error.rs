//! API error types with structured JSON responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::DatabaseError;
use crate::pipeline::extraction::ExtractionError;
use crate::pipeline::import::ImportError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("Document could not be read: {0}")]
    UnreadableDocument(String),
    #[error("{0}")]
    OcrFailed(String),
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::UnsupportedType(declared) => (
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_TYPE",
                format!("Unsupported file type: {declared}"),
            ),
            ApiError::UnreadableDocument(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNREADABLE_DOCUMENT",
                detail.clone(),
            ),
            ApiError::OcrFailed(detail) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "OCR_FAILED", detail.clone())
            }
            ApiError::PayloadTooLarge(detail) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", detail.clone())
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::UnsupportedType(declared) => ApiError::UnsupportedType(declared),
            e @ ExtractionError::DecodeFailure { .. } => ApiError::UnreadableDocument(e.to_string()),
            e @ ExtractionError::EngineFailure { .. } => ApiError::OcrFailed(e.to_string()),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Extraction(e) => e.into(),
            ImportError::InvalidInput(detail) => ApiError::BadRequest(detail),
            ImportError::Database(e) => e.into(),
            ImportError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::BadRequest(format!("Malformed multipart body: {}", err.body_text()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn not_found_returns_404() {
        let response = ApiError::NotFound("Note 7 not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "Note 7 not found");
    }

    #[tokio::test]
    async fn unsupported_type_returns_400() {
        let response: Response =
            ApiError::from(ExtractionError::UnsupportedType("image/gif".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "UNSUPPORTED_TYPE");
        assert!(json["error"]["message"].as_str().unwrap().contains("image/gif"));
    }

    #[tokio::test]
    async fn decode_failure_returns_422() {
        let err = ExtractionError::DecodeFailure {
            page: None,
            detail: "truncated".into(),
        };
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["error"]["code"], "UNREADABLE_DOCUMENT");
    }

    #[tokio::test]
    async fn engine_failure_returns_500_with_detail() {
        let err = ExtractionError::EngineFailure {
            page: 3,
            detail: "tesseract exited with 1".into(),
        };
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "OCR_FAILED");
        assert_eq!(
            json["error"]["message"],
            "OCR engine failed on page 3: tesseract exited with 1"
        );
    }

    #[tokio::test]
    async fn payload_too_large_returns_413() {
        let response = ApiError::PayloadTooLarge("File exceeds 1024 byte limit".into()).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body_json(response).await["error"]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn internal_hides_detail() {
        let response = ApiError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[test]
    fn import_invalid_input_maps_to_bad_request() {
        let err = ApiError::from(ImportError::InvalidInput("patient_id must be 1-128 characters".into()));
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn import_extraction_error_keeps_kind() {
        let err = ApiError::from(ImportError::Extraction(ExtractionError::EngineFailure {
            page: 1,
            detail: "boom".into(),
        }));
        assert!(matches!(err, ApiError::OcrFailed(_)));
    }

    #[test]
    fn database_error_is_internal() {
        let err = ApiError::from(DatabaseError::ConstraintViolation("bad row".into()));
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
