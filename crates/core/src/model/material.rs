use thiserror::Error;

use crate::model::ids::MaterialId;
use crate::model::media::{ContentRef, MediaError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MaterialError {
    #[error("material name cannot be empty")]
    EmptyName,

    #[error(transparent)]
    Media(#[from] MediaError),
}

/// A downloadable file attached to a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Material {
    id: MaterialId,
    name: String,
    mime_type: String,
    content: ContentRef,
    size_bytes: u64,
}

/// Bytes handed back to the presentation layer for a download, named after
/// the original upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialDownload {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Material {
    /// # Errors
    ///
    /// Returns `MaterialError::EmptyName` if `name` is blank.
    pub fn new(
        id: MaterialId,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        content: ContentRef,
        size_bytes: u64,
    ) -> Result<Self, MaterialError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(MaterialError::EmptyName);
        }
        Ok(Self {
            id,
            name,
            mime_type: mime_type.into(),
            content,
            size_bytes,
        })
    }

    #[must_use]
    pub fn id(&self) -> MaterialId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    #[must_use]
    pub fn content(&self) -> &ContentRef {
        &self.content
    }

    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// True when both materials carry the same file, ignoring their ids.
    #[must_use]
    pub fn same_file_as(&self, other: &Material) -> bool {
        self.name == other.name && self.mime_type == other.mime_type && self.content == other.content
    }

    /// Convert the inline content back into a named byte stream.
    ///
    /// # Errors
    ///
    /// Returns `MaterialError::Media` if the stored payload is corrupt.
    pub fn download(&self) -> Result<MaterialDownload, MaterialError> {
        Ok(MaterialDownload {
            filename: self.name.clone(),
            mime_type: self.mime_type.clone(),
            bytes: self.content.decode()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material(name: &str, body: &[u8]) -> Material {
        Material::new(
            MaterialId::new_random(),
            name,
            "text/plain",
            ContentRef::encode("text/plain", body),
            body.len() as u64,
        )
        .unwrap()
    }

    #[test]
    fn rejects_blank_name() {
        let err = Material::new(
            MaterialId::new_random(),
            "  ",
            "text/plain",
            ContentRef::encode("text/plain", b""),
            0,
        )
        .unwrap_err();
        assert_eq!(err, MaterialError::EmptyName);
    }

    #[test]
    fn download_uses_original_filename() {
        let notes = material("notes.txt", b"week one");
        let download = notes.download().unwrap();
        assert_eq!(download.filename, "notes.txt");
        assert_eq!(download.mime_type, "text/plain");
        assert_eq!(download.bytes, b"week one");
    }

    #[test]
    fn same_file_ignores_id() {
        let a = material("notes.txt", b"week one");
        let b = material("notes.txt", b"week one");
        let c = material("notes.txt", b"week two");
        assert_ne!(a.id(), b.id());
        assert!(a.same_file_as(&b));
        assert!(!a.same_file_as(&c));
    }
}
