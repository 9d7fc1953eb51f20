use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::format::sanitize_filename;
use super::hash::compute_content_hash;
use super::ImportError;

/// Durable copy of an uploaded original.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub checksum: String,
}

/// Upload directory holding original documents under their sanitized names.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ImportError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` under a free variant of `original_name` and checksum the
    /// written file. Existing files are never overwritten.
    pub fn store(&self, original_name: &str, bytes: &[u8]) -> Result<StoredFile, ImportError> {
        let safe_name = sanitize_filename(original_name);
        let (stem, ext) = split_extension(&safe_name);

        let mut attempt = 0u32;
        let (path, mut file) = loop {
            let candidate = if attempt == 0 {
                self.root.join(&safe_name)
            } else {
                self.root.join(format!("{stem}_{attempt}{ext}"))
            };
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(file) => break (candidate, file),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        };

        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        let checksum = compute_content_hash(&path)?;

        tracing::debug!(
            path = %path.display(),
            size = bytes.len(),
            "Original document stored"
        );

        Ok(StoredFile { path, checksum })
    }
}

/// Split "name.ext" into ("name", ".ext"). Dotfiles keep their full name as stem.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_writes_bytes_and_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("uploads")).unwrap();
        let stored = store.store("scan.png", b"abc").unwrap();

        assert_eq!(stored.path, dir.path().join("uploads").join("scan.png"));
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"abc");
        assert_eq!(
            stored.checksum,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn collisions_get_numeric_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        let first = store.store("note.pdf", b"one").unwrap();
        let second = store.store("note.pdf", b"two").unwrap();
        let third = store.store("note.pdf", b"three").unwrap();

        assert_eq!(first.path.file_name().unwrap(), "note.pdf");
        assert_eq!(second.path.file_name().unwrap(), "note_1.pdf");
        assert_eq!(third.path.file_name().unwrap(), "note_2.pdf");
        assert_eq!(std::fs::read(&first.path).unwrap(), b"one");
    }

    #[test]
    fn path_components_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let stored = store.store("../../etc/passwd", b"x").unwrap();
        assert_eq!(stored.path.parent().unwrap(), dir.path());
        assert_eq!(stored.path.file_name().unwrap(), "passwd");
    }

    #[test]
    fn empty_name_defaults_to_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        let stored = store.store("", b"x").unwrap();
        assert_eq!(stored.path.file_name().unwrap(), "document");
        let again = store.store("", b"y").unwrap();
        assert_eq!(again.path.file_name().unwrap(), "document_1");
    }

    #[test]
    fn split_extension_cases() {
        assert_eq!(split_extension("scan.tar.gz"), ("scan.tar", ".gz"));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
    }
}
