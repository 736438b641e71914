//! Local document store.
//!
//! One JSON envelope per document, named `<id>.json`, holding the record
//! fields and the document itself. The envelope carries a CRC-32 of the
//! canonical compact content so damage is caught on read.

use crate::model::{Document, FormatError};
use chrono::{DateTime, Utc};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

const RECORD_EXTENSION: &str = "json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("stored document is invalid: {0}")]
    Format(#[from] FormatError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub document: Document,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    id: String,
    title: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    checksum: u32,
    content: Value,
}

#[derive(Debug)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn create(&self, document: &Document) -> Result<StoredDocument, StoreError> {
        let now = Utc::now();
        let stored = StoredDocument {
            id: Uuid::new_v4().to_string(),
            title: document.metadata.title.clone(),
            created_at: now,
            updated_at: now,
            document: document.clone(),
        };
        self.write(&stored)?;
        tracing::info!(id = %stored.id, title = %stored.title, "created document");
        Ok(stored)
    }

    pub fn get(&self, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let Some(path) = self.record_path(id) else {
            return Ok(None);
        };
        match fs::read(&path) {
            Ok(bytes) => self.decode(&bytes, id).map(Some),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Records ordered by creation time, oldest first.
    pub fn list(&self, skip: usize, limit: usize) -> Result<Vec<StoredDocument>, StoreError> {
        let mut records = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
        {
            let Some(id) = record_id(entry.path()) else {
                continue;
            };
            let bytes = fs::read(entry.path())?;
            records.push(self.decode(&bytes, &id.to_string())?);
        }
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(records.into_iter().skip(skip).take(limit).collect())
    }

    /// Replaces the title and/or document of a record. Returns `None` when
    /// the id is unknown.
    pub fn update(
        &self,
        id: &str,
        title: Option<&str>,
        document: Option<&Document>,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let Some(mut stored) = self.get(id)? else {
            return Ok(None);
        };
        if let Some(title) = title {
            stored.title = title.to_string();
        }
        if let Some(document) = document {
            stored.document = document.clone();
        }
        stored.updated_at = Utc::now();
        self.write(&stored)?;
        tracing::info!(id = %stored.id, "updated document");
        Ok(Some(stored))
    }

    /// Removes a record, returning what was stored.
    pub fn delete(&self, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let Some(stored) = self.get(id)? else {
            return Ok(None);
        };
        if let Some(path) = self.record_path(id) {
            fs::remove_file(path)?;
        }
        tracing::info!(id = %stored.id, "deleted document");
        Ok(Some(stored))
    }

    /// Ids are UUIDs; anything else can never name a record.
    fn record_path(&self, id: &str) -> Option<PathBuf> {
        let id = Uuid::parse_str(id).ok()?;
        Some(
            self.root
                .join(format!("{}.{RECORD_EXTENSION}", id.hyphenated())),
        )
    }

    fn write(&self, stored: &StoredDocument) -> Result<(), StoreError> {
        let path = self
            .record_path(&stored.id)
            .ok_or_else(|| StoreError::Corrupt {
                id: stored.id.clone(),
                reason: "id is not a uuid",
            })?;
        let content = serde_json::to_value(&stored.document)?;
        let envelope = Envelope {
            id: stored.id.clone(),
            title: stored.title.clone(),
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            checksum: checksum(&content)?,
            content,
        };
        let encoded = serde_json::to_vec_pretty(&envelope)?;
        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        fs::write(&temp_path, encoded)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    /// Decodes the record stored under `expected_id`.
    fn decode(&self, bytes: &[u8], expected_id: &str) -> Result<StoredDocument, StoreError> {
        let envelope: Envelope = serde_json::from_slice(bytes)?;
        if Uuid::parse_str(&envelope.id).ok() != Uuid::parse_str(expected_id).ok() {
            return Err(StoreError::Corrupt {
                id: expected_id.to_string(),
                reason: "record id does not match its file name",
            });
        }
        if checksum(&envelope.content)? != envelope.checksum {
            return Err(StoreError::Corrupt {
                id: envelope.id,
                reason: "checksum mismatch",
            });
        }
        let document = Document::from_value(envelope.content)?;
        Ok(StoredDocument {
            id: envelope.id,
            title: envelope.title,
            created_at: envelope.created_at,
            updated_at: envelope.updated_at,
            document,
        })
    }
}

/// Record id named by a store file, if it is one.
fn record_id(path: &Path) -> Option<Uuid> {
    if path.extension()? != RECORD_EXTENSION {
        return None;
    }
    Uuid::parse_str(path.file_stem()?.to_str()?).ok()
}

/// CRC-32 of the compact JSON form of `content`.
fn checksum(content: &Value) -> Result<u32, StoreError> {
    let bytes = serde_json::to_vec(content)?;
    let mut hasher = Hasher::new();
    hasher.update(&bytes);
    Ok(hasher.finalize())
}
