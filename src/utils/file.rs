//! File utilities for document loading.

use sha2::{Digest, Sha256};
use std::path::Path;

/// Calculate the SHA-256 checksum of raw bytes as lowercase hex.
pub fn calculate_checksum(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    hex::encode(hash)
}

/// File name component of a path, falling back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Lowercased extension of a file name, if any.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

/// Check if an extension is read as plain UTF-8 text.
pub fn is_text_extension(ext: &str) -> bool {
    matches!(ext, "txt" | "md" | "markdown" | "rst" | "text")
}
