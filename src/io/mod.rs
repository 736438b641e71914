//! Import and export of `.nova` files.

use crate::model::{Document, FormatError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Extensions accepted for import and export.
pub const EXTENSIONS: [&str; 2] = ["nova", "json"];

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid document: {0}")]
    Format(#[from] FormatError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(PathBuf),
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

fn check_extension(path: &Path) -> Result<(), IoError> {
    if is_supported(path) {
        Ok(())
    } else {
        Err(IoError::UnsupportedExtension(path.to_path_buf()))
    }
}

pub fn read_document(path: impl AsRef<Path>) -> Result<Document, IoError> {
    let path = path.as_ref();
    check_extension(path)?;
    let raw = fs::read_to_string(path)?;
    let document = Document::parse(&raw)?;
    tracing::debug!(path = %path.display(), "read document");
    Ok(document)
}

/// Writes pretty-printed JSON through a sibling temp file and a rename, so
/// readers never see a partial file.
pub fn write_document(path: impl AsRef<Path>, document: &Document) -> Result<(), IoError> {
    let path = path.as_ref();
    check_extension(path)?;
    let encoded = serde_json::to_string_pretty(document)?;
    let temp_path = temp_path_for(path);
    fs::write(&temp_path, encoded)?;
    fs::rename(&temp_path, path)?;
    tracing::debug!(path = %path.display(), "wrote document");
    Ok(())
}

/// `<name>.<uuid>.tmp` next to `path`, unique per write.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    path.with_file_name(name)
}

/// File name offered when exporting: the lower-cased title with every run
/// of whitespace replaced by `-`.
pub fn download_file_name(document: &Document) -> String {
    let title = document.metadata.title.to_lowercase();
    if title.is_empty() {
        return "document.nova".to_string();
    }
    let mut name = String::with_capacity(title.len() + 5);
    let mut in_space = false;
    for ch in title.chars() {
        if ch.is_whitespace() {
            if !in_space {
                name.push('-');
            }
            in_space = true;
        } else {
            name.push(ch);
            in_space = false;
        }
    }
    name.push_str(".nova");
    name
}
