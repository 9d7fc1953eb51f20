use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::ImportError;

/// Compute the SHA-256 content hash of a file as lowercase hex.
/// Reads in fixed-size chunks so large uploads are not buffered twice.
pub fn compute_content_hash(path: &Path) -> Result<String, ImportError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
