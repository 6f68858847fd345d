use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{AccountId, CourseId, LessonId};
use crate::model::lesson::{Lesson, synthesize_lessons};
use crate::model::material::Material;
use crate::model::media::ContentRef;

/// Upper bound on a course's lesson count; lessons are synthesized in memory
/// on every view.
pub const MAX_LESSONS: u32 = 1_000;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("educator name cannot be empty")]
    EmptyEducatorName,

    #[error("a course can have at most {max} lessons, got {requested}")]
    TooManyLessons { requested: u32, max: u32 },

    #[error("thumbnail must be an image, got {0}")]
    ThumbnailNotImage(String),
}

/// Parse the lesson-count form field.
///
/// Input that is not an integer counts as 0, and so does a negative number.
///
/// # Errors
///
/// Returns `CourseError::TooManyLessons` above `MAX_LESSONS`.
pub fn parse_lesson_count(raw: &str) -> Result<u32, CourseError> {
    let Ok(parsed) = raw.trim().parse::<i64>() else {
        return Ok(0);
    };
    let clamped = u32::try_from(parsed.max(0)).unwrap_or(u32::MAX);
    check_lesson_count(clamped)
}

fn check_lesson_count(count: u32) -> Result<u32, CourseError> {
    if count > MAX_LESSONS {
        return Err(CourseError::TooManyLessons {
            requested: count,
            max: MAX_LESSONS,
        });
    }
    Ok(count)
}

//
// ─── DETAILS ───────────────────────────────────────────────────────────────────
//

/// Educator-editable scalar fields of a course.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CourseDetails {
    pub title: String,
    pub description: String,
    /// Free text such as "6 weeks".
    pub duration: String,
    pub lesson_count: u32,
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A course published by a single educator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    educator_id: AccountId,
    educator_name: String,
    title: String,
    description: String,
    duration: String,
    lesson_count: u32,
    thumbnail: Option<ContentRef>,
    materials: Vec<Material>,
    created_at: DateTime<Utc>,
}

impl Course {
    /// # Errors
    ///
    /// Returns `CourseError` if the title or educator name is blank, the lesson
    /// count is above `MAX_LESSONS`, or the thumbnail is not an image.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: CourseId,
        educator_id: AccountId,
        educator_name: impl Into<String>,
        details: CourseDetails,
        thumbnail: Option<ContentRef>,
        materials: Vec<Material>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CourseError> {
        let educator_name = educator_name.into();
        if educator_name.trim().is_empty() {
            return Err(CourseError::EmptyEducatorName);
        }

        let mut course = Self {
            id,
            educator_id,
            educator_name: educator_name.trim().to_owned(),
            title: String::new(),
            description: String::new(),
            duration: String::new(),
            lesson_count: 0,
            thumbnail: None,
            materials,
            created_at,
        };
        course.set_title(details.title)?;
        course.set_description(details.description);
        course.set_duration(details.duration);
        course.set_lesson_count(details.lesson_count)?;
        if let Some(thumbnail) = thumbnail {
            course.set_thumbnail(thumbnail)?;
        }
        Ok(course)
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn educator_id(&self) -> AccountId {
        self.educator_id
    }

    #[must_use]
    pub fn educator_name(&self) -> &str {
        &self.educator_name
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn duration(&self) -> &str {
        &self.duration
    }

    #[must_use]
    pub fn lesson_count(&self) -> u32 {
        self.lesson_count
    }

    #[must_use]
    pub fn thumbnail(&self) -> Option<&ContentRef> {
        self.thumbnail.as_ref()
    }

    #[must_use]
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn details(&self) -> CourseDetails {
        CourseDetails {
            title: self.title.clone(),
            description: self.description.clone(),
            duration: self.duration.clone(),
            lesson_count: self.lesson_count,
        }
    }

    #[must_use]
    pub fn is_owned_by(&self, educator_id: AccountId) -> bool {
        self.educator_id == educator_id
    }

    // Mutators

    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` if `title` is blank.
    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), CourseError> {
        let title = title.into();
        let title = title.trim();
        if title.is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        title.clone_into(&mut self.title);
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into().trim().to_owned();
    }

    pub fn set_duration(&mut self, duration: impl Into<String>) {
        self.duration = duration.into().trim().to_owned();
    }

    /// Changing the count does not touch stored completion sets; ids past the
    /// new count are dropped when a student next opens the course.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::TooManyLessons` above `MAX_LESSONS`.
    pub fn set_lesson_count(&mut self, lesson_count: u32) -> Result<(), CourseError> {
        self.lesson_count = check_lesson_count(lesson_count)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CourseError::ThumbnailNotImage` for non-image content.
    pub fn set_thumbnail(&mut self, thumbnail: ContentRef) -> Result<(), CourseError> {
        if !thumbnail.is_image() {
            return Err(CourseError::ThumbnailNotImage(
                thumbnail.mime_type().to_owned(),
            ));
        }
        self.thumbnail = Some(thumbnail);
        Ok(())
    }

    /// Append materials in order, skipping any file already attached.
    ///
    /// Returns how many were appended.
    pub fn append_materials(&mut self, incoming: impl IntoIterator<Item = Material>) -> usize {
        let mut appended = 0;
        for material in incoming {
            if self.materials.iter().any(|m| m.same_file_as(&material)) {
                continue;
            }
            self.materials.push(material);
            appended += 1;
        }
        appended
    }

    /// Lessons for this course, all marked incomplete.
    #[must_use]
    pub fn lessons(&self) -> Vec<Lesson> {
        synthesize_lessons(self.id, &self.title, self.lesson_count)
    }

    /// True when `lesson_id` names one of this course's current lessons.
    #[must_use]
    pub fn has_lesson(&self, lesson_id: &LessonId) -> bool {
        lesson_id.course_id() == self.id && lesson_id.index() <= self.lesson_count
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
