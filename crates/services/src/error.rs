//! Shared error types for the services crate.
//!
//! Every service error maps onto an [`ErrorKind`] so callers can branch on the
//! category without matching individual variants.

use std::path::PathBuf;

use thiserror::Error;

use edu_core::ErrorKind;
use edu_core::model::{AccountError, AccountId, CourseError, CourseId, MaterialError, MaterialId, Role};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;


fn storage_kind(err: &StorageError) -> ErrorKind {
    match err {
        StorageError::NotFound => ErrorKind::NotFound,
        StorageError::Conflict => ErrorKind::Conflict,
        _ => ErrorKind::Storage,
    }
}

/// Errors emitted while turning uploads into stored content.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestionError {
    #[error("upload has no file name")]
    MissingName,
    #[error("upload path has no file name: {0}")]
    NoFileName(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors emitted by `IdentityService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IdentityError {
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("not signed in")]
    Unauthenticated,
    #[error("requires the {required} role")]
    WrongRole { required: Role },
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for IdentityError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict => Self::EmailTaken,
            other => Self::Storage(other),
        }
    }
}

impl IdentityError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Account(_) | Self::EmptyPassword => ErrorKind::Validation,
            Self::EmailTaken => ErrorKind::Conflict,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::WrongRole { .. } => ErrorKind::Forbidden,
            Self::Hash(_) => ErrorKind::Storage,
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted by `CourseService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseServiceError {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Material(#[from] MaterialError),
    #[error("course {0} not found")]
    NotFound(CourseId),
    #[error("material {material_id} not found in course {course_id}")]
    MaterialNotFound {
        course_id: CourseId,
        material_id: MaterialId,
    },
    #[error("course {course_id} is not owned by educator {educator_id}")]
    Forbidden {
        course_id: CourseId,
        educator_id: AccountId,
    },
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CourseServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Course(_) | Self::Material(_) => ErrorKind::Validation,
            Self::NotFound(_) | Self::MaterialNotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::Ingestion(_) => ErrorKind::Ingestion,
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted by `EnrollmentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnrollmentServiceError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EnrollmentServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CourseNotFound(_) => ErrorKind::NotFound,
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted by `LessonProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProgressError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CourseNotFound(_) => ErrorKind::NotFound,
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
