pub mod format;
pub mod hash;
pub mod staging;
pub mod importer;

pub use format::*;
pub use hash::*;
pub use staging::*;
pub use importer::*;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::pipeline::extraction::ExtractionError;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Invalid upload: {0}")]
    InvalidInput(String),
}
