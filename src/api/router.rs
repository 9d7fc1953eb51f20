//! Notes API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::endpoints::upload::MULTIPART_OVERHEAD_BYTES;
use crate::api::types::ApiContext;

/// Build the notes API router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    let body_limit = ctx.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);
    Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/notes",
            get(endpoints::notes::list).post(endpoints::notes::create),
        )
        .route("/notes/upload", post(endpoints::upload::upload))
        .route("/notes/:id", get(endpoints::notes::detail))
        .route("/files/:id", get(endpoints::files::download))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
