//! HTTP surface for clinical notes.
//!
//! Typed notes, scanned-document upload with OCR, listing/search and
//! original-file download. `api_router()` returns a `Router` that can be
//! mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{start_server, NotesServer};
pub use types::ApiContext;
