use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use edu_core::model::{
    AccountId, Course, CourseDetails, CourseId, Material, MaterialDownload, MaterialId,
    parse_lesson_count,
};
use storage::repository::{CourseRepository, NewCourseRecord};

use crate::Clock;
use crate::error::CourseServiceError;
use crate::ingest::{IngestedFile, PendingUpload, ingest_all, ingest_optional};

/// Form input for a new course.
///
/// `lessons` is the raw text the educator typed; it is parsed leniently.
#[derive(Debug, Clone, Default)]
pub struct CourseDraft {
    pub title: String,
    pub description: String,
    pub duration: String,
    pub lessons: String,
    pub thumbnail: Option<PendingUpload>,
    pub materials: Vec<PendingUpload>,
}

/// Partial update; `None` leaves a field as it is.
///
/// Materials are appended to the existing list and a thumbnail replaces the
/// current one.
#[derive(Debug, Clone, Default)]
pub struct CourseEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub lessons: Option<String>,
    pub thumbnail: Option<PendingUpload>,
    pub materials: Vec<PendingUpload>,
}

/// Course catalogue operations with educator ownership checks.
#[derive(Clone)]
pub struct CourseService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
}

impl CourseService {
    #[must_use]
    pub fn new(clock: Clock, courses: Arc<dyn CourseRepository>) -> Self {
        Self { clock, courses }
    }

    /// Create a course owned by `educator_id`.
    ///
    /// Uploads are ingested before anything is written, so a failed upload
    /// leaves no record behind.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Course` for validation failures,
    /// `CourseServiceError::Ingestion` if an upload cannot be read, and
    /// `CourseServiceError::Storage` if persistence fails.
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create(
        &self,
        educator_id: AccountId,
        educator_name: &str,
        draft: CourseDraft,
    ) -> Result<Course, CourseServiceError> {
        let details = CourseDetails {
            title: draft.title,
            description: draft.description,
            duration: draft.duration,
            lesson_count: parse_lesson_count(&draft.lessons)?,
        };
        // Fail on bad fields before spending time on uploads.
        let mut course = Course::new(
            CourseId::new(0),
            educator_id,
            educator_name,
            details,
            None,
            Vec::new(),
            self.clock.now(),
        )?;

        let (thumbnail, materials) = futures::try_join!(
            ingest_optional(draft.thumbnail),
            ingest_all(draft.materials)
        )?;
        if let Some(thumbnail) = thumbnail {
            course.set_thumbnail(thumbnail.content)?;
        }
        course.append_materials(into_materials(materials)?);

        let record = NewCourseRecord::from_course(&course);
        let id = self.courses.insert_new_course(record.clone()).await?;
        let course = record.into_course(id)?;

        info!(course_id = %id, educator_id = %educator_id, "course created");
        Ok(course)
    }

    /// Apply `edit` to a course owned by `educator_id`.
    ///
    /// Repeating the same edit yields the same stored record.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::NotFound` if the course is missing,
    /// `CourseServiceError::Forbidden` if another educator owns it, and the
    /// same validation, ingestion and storage errors as [`CourseService::create`].
    #[instrument(skip(self, edit))]
    pub async fn update(
        &self,
        course_id: CourseId,
        educator_id: AccountId,
        edit: CourseEdit,
    ) -> Result<Course, CourseServiceError> {
        let mut course = self.owned(course_id, educator_id).await?;

        if let Some(title) = edit.title {
            course.set_title(title)?;
        }
        if let Some(description) = edit.description {
            course.set_description(description);
        }
        if let Some(duration) = edit.duration {
            course.set_duration(duration);
        }
        if let Some(lessons) = edit.lessons {
            course.set_lesson_count(parse_lesson_count(&lessons)?)?;
        }

        let (thumbnail, materials) = futures::try_join!(
            ingest_optional(edit.thumbnail),
            ingest_all(edit.materials)
        )?;
        if let Some(thumbnail) = thumbnail {
            course.set_thumbnail(thumbnail.content)?;
        }
        let appended = course.append_materials(into_materials(materials)?);

        self.courses.upsert_course(&course).await?;
        info!(course_id = %course_id, appended, "course updated");
        Ok(course)
    }

    /// Delete a course owned by `educator_id`. Enrollments and lesson progress
    /// that reference it are kept.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::NotFound`, `CourseServiceError::Forbidden`,
    /// or `CourseServiceError::Storage`.
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        course_id: CourseId,
        educator_id: AccountId,
    ) -> Result<(), CourseServiceError> {
        self.owned(course_id, educator_id).await?;
        self.courses.delete_course(course_id).await?;
        info!(course_id = %course_id, "course deleted");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn list_by_educator(
        &self,
        educator_id: AccountId,
    ) -> Result<Vec<Course>, CourseServiceError> {
        Ok(self.courses.list_courses_by_educator(educator_id).await?)
    }

    /// Every course in creation order.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn list_all(&self) -> Result<Vec<Course>, CourseServiceError> {
        Ok(self.courses.list_courses().await?)
    }

    /// # Errors
    ///
    /// Returns `CourseServiceError::NotFound` if the course does not exist.
    pub async fn get(&self, course_id: CourseId) -> Result<Course, CourseServiceError> {
        self.courses
            .get_course(course_id)
            .await?
            .ok_or(CourseServiceError::NotFound(course_id))
    }

    /// Decode one attached material for download.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::NotFound` or
    /// `CourseServiceError::MaterialNotFound` if either lookup misses, and
    /// `CourseServiceError::Material` if the stored content cannot be decoded.
    pub async fn download_material(
        &self,
        course_id: CourseId,
        material_id: MaterialId,
    ) -> Result<MaterialDownload, CourseServiceError> {
        let course = self.get(course_id).await?;
        let material = course
            .materials()
            .iter()
            .find(|m| m.id() == material_id)
            .ok_or(CourseServiceError::MaterialNotFound {
                course_id,
                material_id,
            })?;
        debug!(course_id = %course_id, material_id = %material_id, "material download");
        Ok(material.download()?)
    }

    async fn owned(
        &self,
        course_id: CourseId,
        educator_id: AccountId,
    ) -> Result<Course, CourseServiceError> {
        let course = self.get(course_id).await?;
        if !course.is_owned_by(educator_id) {
            warn!(
                course_id = %course_id,
                educator_id = %educator_id,
                owner = %course.educator_id(),
                "ownership check failed"
            );
            return Err(CourseServiceError::Forbidden {
                course_id,
                educator_id,
            });
        }
        Ok(course)
    }
}

fn into_materials(files: Vec<IngestedFile>) -> Result<Vec<Material>, CourseServiceError> {
    files
        .into_iter()
        .map(|f| f.into_material().map_err(CourseServiceError::from))
        .collect()
}
