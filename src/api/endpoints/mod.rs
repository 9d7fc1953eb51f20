pub mod files;
pub mod health;
pub mod notes;
pub mod upload;
