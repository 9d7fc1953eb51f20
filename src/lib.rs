pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod pipeline_config;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::{start_server, ApiContext};
use crate::config::AppConfig;
use crate::db::DatabaseError;
use crate::pipeline::extraction::pdfium::PdfiumRenderer;
use crate::pipeline::extraction::{DocumentExtractor, TesseractEngine};
use crate::pipeline::import::{FileStore, ImportError};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Cannot create directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database initialization failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Upload store initialization failed: {0}")]
    Store(#[from] ImportError),

    #[error("{0}")]
    Server(String),
}

/// Initialize logging, then serve the notes API until Ctrl-C.
pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(AppConfig::from_env())) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn serve(config: AppConfig) -> Result<(), StartupError> {
    std::fs::create_dir_all(&config.data_dir)?;
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Migrations run once here; requests open plain connections
    drop(db::open_database(&config.db_path)?);
    tracing::info!(path = %config.db_path.display(), "Database ready");

    let file_store = FileStore::new(&config.upload_dir)?;

    let ctx = ApiContext::new(
        config.db_path.clone(),
        file_store,
        Arc::new(build_extractor(&config)),
    )
    .with_max_upload_bytes(usize::try_from(config.pipeline.max_input_bytes).unwrap_or(usize::MAX));

    let server = start_server(ctx, config.bind_addr)
        .await
        .map_err(StartupError::Server)?;
    tracing::info!(addr = %server.addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
    }
    server.shutdown().await;
    Ok(())
}

/// PDFium renderer + Tesseract engine, with startup diagnostics for missing
/// native dependencies. Neither is fatal: the affected uploads fail instead.
fn build_extractor(config: &AppConfig) -> DocumentExtractor {
    let pipeline = &config.pipeline;

    if let Err(e) = PdfiumRenderer::probe() {
        tracing::warn!(error = %e, "PDFium unavailable, PDF uploads will fail");
    }

    let engine = TesseractEngine::from_config(pipeline);
    match engine.version() {
        Some(version) => tracing::info!(
            version = %version,
            languages = engine.languages(),
            dpi = pipeline.render_dpi,
            "OCR engine ready"
        ),
        None => tracing::warn!(
            command = %pipeline.tesseract_cmd.display(),
            "Tesseract not found, uploads will fail OCR"
        ),
    }

    DocumentExtractor::with_pdf_renderer(
        Box::new(PdfiumRenderer::new().with_max_dimension(pipeline.max_dimension_px)),
        Box::new(engine),
        pipeline,
    )
}
