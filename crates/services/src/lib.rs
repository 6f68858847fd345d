#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod course_service;
pub mod enrollment_service;
pub mod error;
pub mod identity_service;
pub mod ingest;
pub mod lessons;

pub use edu_core::Clock;

pub use app_services::AppServices;
pub use config::{AppConfig, ConfigError};
pub use course_service::{CourseDraft, CourseEdit, CourseService};
pub use enrollment_service::{EnrollmentService, StudentDashboard};
pub use error::{
    AppServicesError, CourseServiceError, EnrollmentServiceError, IdentityError, IngestionError,
    ProgressError,
};
pub use identity_service::IdentityService;
pub use ingest::{IngestedFile, PendingUpload, ingest, ingest_all};
pub use lessons::{CourseProgress, LessonProgressService, LessonToggle, LessonTracker};
