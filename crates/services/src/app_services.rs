use std::sync::Arc;

use tracing::info;

use storage::repository::Storage;

use crate::Clock;
use crate::config::AppConfig;
use crate::course_service::CourseService;
use crate::enrollment_service::EnrollmentService;
use crate::error::AppServicesError;
use crate::identity_service::IdentityService;
use crate::lessons::LessonProgressService;

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    identity: Arc<IdentityService>,
    courses: Arc<CourseService>,
    enrollments: Arc<EnrollmentService>,
    lessons: Arc<LessonProgressService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        info!(db_url, "sqlite storage ready");
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over the database named by `config`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn from_config(config: &AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        Self::new_sqlite(&config.database_url, clock).await
    }

    /// Services over a fresh in-memory backend.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let identity = Arc::new(IdentityService::new(Arc::clone(&storage.accounts)));
        let courses = Arc::new(CourseService::new(clock, Arc::clone(&storage.courses)));
        let enrollments = Arc::new(EnrollmentService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.enrollments),
        ));
        let lessons = Arc::new(LessonProgressService::new(
            Arc::clone(&storage.courses),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.progress),
        ));

        Self {
            identity,
            courses,
            enrollments,
            lessons,
        }
    }

    #[must_use]
    pub fn identity(&self) -> Arc<IdentityService> {
        Arc::clone(&self.identity)
    }

    #[must_use]
    pub fn courses(&self) -> Arc<CourseService> {
        Arc::clone(&self.courses)
    }

    #[must_use]
    pub fn enrollments(&self) -> Arc<EnrollmentService> {
        Arc::clone(&self.enrollments)
    }

    #[must_use]
    pub fn lessons(&self) -> Arc<LessonProgressService> {
        Arc::clone(&self.lessons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edu_core::model::Role;
    use edu_core::time::fixed_now;

    #[tokio::test]
    async fn from_config_opens_the_configured_database() {
        let config = AppConfig {
            database_url: "sqlite:file:memdb_app_from_config?mode=memory&cache=shared".into(),
            ..AppConfig::default()
        };
        let app = AppServices::from_config(&config, Clock::fixed(fixed_now()))
            .await
            .unwrap();
        app.identity()
            .signup("ada@example.com", "pw", "Ada", Role::Educator)
            .await
            .unwrap();

        let again = AppServices::from_config(&config, Clock::fixed(fixed_now()))
            .await
            .unwrap();
        let account = again.identity().login("ada@example.com", "pw").await.unwrap();
        assert_eq!(account.name(), "Ada");
    }
}
