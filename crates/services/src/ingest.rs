//! Turns uploads into inline content references.
//!
//! Files are read with `tokio::fs` and encoded as base64 data URLs. Batches are
//! read concurrently; results keep the input order.

use std::path::PathBuf;

use futures::future::try_join_all;
use tracing::debug;

use edu_core::model::{ContentRef, Material, MaterialError, MaterialId};

use crate::error::IngestionError;

const FALLBACK_MIME: &str = "application/octet-stream";

/// A file waiting to be ingested.
#[derive(Debug, Clone)]
pub enum PendingUpload {
    /// Read from disk; the name comes from the file name and the mime type
    /// is guessed from the extension.
    Path(PathBuf),
    /// Already in memory.
    Bytes {
        name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
}

impl PendingUpload {
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// In-memory upload. A blank `mime_type` is guessed from `name`.
    #[must_use]
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let name = name.into();
        let mut mime_type = mime_type.into();
        if mime_type.trim().is_empty() {
            mime_type = guess_mime(&name);
        }
        Self::Bytes {
            name,
            mime_type,
            bytes: bytes.into(),
        }
    }
}

/// Result of ingesting one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedFile {
    pub name: String,
    pub mime_type: String,
    pub content: ContentRef,
    pub size_bytes: u64,
}

impl IngestedFile {
    /// Wrap as a course material under a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `MaterialError` if the name is blank.
    pub fn into_material(self) -> Result<Material, MaterialError> {
        Material::new(
            MaterialId::new_random(),
            self.name,
            self.mime_type,
            self.content,
            self.size_bytes,
        )
    }
}

fn guess_mime(name: &str) -> String {
    mime_guess::from_path(name)
        .first()
        .map_or_else(|| FALLBACK_MIME.to_owned(), |m| m.essence_str().to_owned())
}

fn encode(name: String, mime_type: String, bytes: &[u8]) -> IngestedFile {
    IngestedFile {
        content: ContentRef::encode(&mime_type, bytes),
        size_bytes: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
        name,
        mime_type,
    }
}

/// Read one upload and encode it.
///
/// # Errors
///
/// Returns `IngestionError` if the upload has no usable name or cannot be read.
pub async fn ingest(upload: PendingUpload) -> Result<IngestedFile, IngestionError> {
    match upload {
        PendingUpload::Path(path) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| IngestionError::NoFileName(path.clone()))?;
            let mime_type = guess_mime(&name);
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|source| IngestionError::Read {
                    path: path.clone(),
                    source,
                })?;
            debug!(%name, %mime_type, size = bytes.len(), "ingested file");
            Ok(encode(name, mime_type, &bytes))
        }
        PendingUpload::Bytes {
            name,
            mime_type,
            bytes,
        } => {
            if name.trim().is_empty() {
                return Err(IngestionError::MissingName);
            }
            Ok(encode(name, mime_type, &bytes))
        }
    }
}

/// Ingest every upload concurrently. Output order matches input order; the
/// first failure fails the whole batch.
///
/// # Errors
///
/// Returns the first `IngestionError` encountered.
pub async fn ingest_all(uploads: Vec<PendingUpload>) -> Result<Vec<IngestedFile>, IngestionError> {
    try_join_all(uploads.into_iter().map(ingest)).await
}

pub(crate) async fn ingest_optional(
    upload: Option<PendingUpload>,
) -> Result<Option<IngestedFile>, IngestionError> {
    match upload {
        Some(upload) => ingest(upload).await.map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn path_uploads_take_name_and_guessed_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let file = ingest(PendingUpload::from_path(&path)).await.unwrap();
        assert_eq!(file.name, "notes.txt");
        assert_eq!(file.mime_type, "text/plain");
        assert_eq!(file.size_bytes, 5);
        assert_eq!(file.content.as_str(), "data:text/plain;base64,aGVsbG8=");
    }

    #[tokio::test]
    async fn unknown_extension_falls_back_to_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.zzqx");
        tokio::fs::write(&path, [1_u8, 2, 3]).await.unwrap();

        let file = ingest(PendingUpload::from_path(&path)).await.unwrap();
        assert_eq!(file.mime_type, FALLBACK_MIME);
        assert_eq!(file.content.decode().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn batch_keeps_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut uploads = Vec::new();
        for (i, name) in ["c.txt", "a.txt", "b.txt"].iter().enumerate() {
            let path = dir.path().join(name);
            tokio::fs::write(&path, "x".repeat(i + 1)).await.unwrap();
            uploads.push(PendingUpload::from_path(path));
        }
        uploads.push(PendingUpload::from_bytes("d.png", "", vec![0_u8; 4]));

        let files = ingest_all(uploads).await.unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["c.txt", "a.txt", "b.txt", "d.png"]);
        assert_eq!(files[2].size_bytes, 3);
        assert_eq!(files[3].mime_type, "image/png");
    }

    #[tokio::test]
    async fn one_missing_file_fails_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("ok.txt");
        tokio::fs::write(&present, b"ok").await.unwrap();

        let err = ingest_all(vec![
            PendingUpload::from_path(&present),
            PendingUpload::from_path(dir.path().join("missing.txt")),
        ])
        .await
        .unwrap_err();
        assert!(matches!(err, IngestionError::Read { .. }));
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let err = ingest(PendingUpload::from_bytes(" ", "text/plain", b"x".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::MissingName));
    }
}
