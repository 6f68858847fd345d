use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use edu_core::ProgressSnapshot;
use edu_core::model::{AccountId, Course, CourseId, Lesson, LessonId};
use storage::repository::{CourseRepository, EnrollmentRepository, LessonProgressRepository};

use super::tracker::LessonTracker;
use crate::error::ProgressError;

//
// ─── OPEN COURSE ───────────────────────────────────────────────────────────────
//

/// A course opened by a student, with lesson completion loaded.
#[derive(Debug, Clone)]
pub struct CourseProgress {
    student_id: AccountId,
    course: Course,
    tracker: LessonTracker,
}

impl CourseProgress {
    #[must_use]
    pub fn student_id(&self) -> AccountId {
        self.student_id
    }

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        self.tracker.lessons()
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.tracker.snapshot()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.tracker.is_complete()
    }
}

/// Outcome of a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonToggle {
    /// The id names no lesson of this course; nothing changed.
    UnknownLesson,
    Applied {
        completed: bool,
        snapshot: ProgressSnapshot,
        /// `false` when the student has no enrollment to update.
        enrollment_updated: bool,
    },
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Lesson completion per (student, course), kept in step with the ledger.
#[derive(Clone)]
pub struct LessonProgressService {
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    progress: Arc<dyn LessonProgressRepository>,
}

impl LessonProgressService {
    #[must_use]
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        progress: Arc<dyn LessonProgressRepository>,
    ) -> Self {
        Self {
            courses,
            enrollments,
            progress,
        }
    }

    /// Load a course for a student and restore completed lessons.
    ///
    /// Stored ids that no longer name a lesson are dropped and the cleaned set
    /// is written back. The enrollment, if any, is brought up to date.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::CourseNotFound` if the course does not exist and
    /// `ProgressError::Storage` if repository access fails.
    #[instrument(skip(self))]
    pub async fn open(
        &self,
        student_id: AccountId,
        course_id: CourseId,
    ) -> Result<CourseProgress, ProgressError> {
        let course = self
            .courses
            .get_course(course_id)
            .await?
            .ok_or(ProgressError::CourseNotFound(course_id))?;

        let mut tracker = LessonTracker::new(&course);
        let stored = self
            .progress
            .load_completed_lessons(student_id, course_id)
            .await?;
        let stale = tracker.rehydrate(&stored);
        if stale > 0 {
            warn!(
                student_id = %student_id,
                course_id = %course_id,
                stale,
                "dropping completed lessons the course no longer has"
            );
            self.progress
                .save_completed_lessons(student_id, course_id, &tracker.completed_ids())
                .await?;
        }

        let snapshot = tracker.snapshot();
        self.enrollments
            .update_enrollment_progress(student_id, course_id, &snapshot)
            .await?;
        debug!(percent = snapshot.percent(), "course opened");

        Ok(CourseProgress {
            student_id,
            course,
            tracker,
        })
    }

    /// Flip a lesson, then persist the completed set and the enrollment.
    ///
    /// On failure the tracker is left matching what storage holds: a failed
    /// save undoes the toggle, and a failed enrollment write restores the
    /// previous set before undoing it. Should that restore also fail, the
    /// toggle is kept since storage already has it, and the next
    /// [`LessonProgressService::open`] brings the enrollment up to date.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if persistence fails.
    pub async fn toggle_lesson(
        &self,
        open: &mut CourseProgress,
        lesson_id: &LessonId,
    ) -> Result<LessonToggle, ProgressError> {
        let previous = open.tracker.completed_ids();
        let Some(completed) = open.tracker.toggle(lesson_id) else {
            debug!(lesson_id = %lesson_id, "toggle for unknown lesson ignored");
            return Ok(LessonToggle::UnknownLesson);
        };

        match self.persist(open).await {
            Ok((snapshot, enrollment_updated)) => {
                info!(
                    student_id = %open.student_id,
                    lesson_id = %lesson_id,
                    completed,
                    percent = snapshot.percent(),
                    "lesson toggled"
                );
                Ok(LessonToggle::Applied {
                    completed,
                    snapshot,
                    enrollment_updated,
                })
            }
            Err(PersistError::Save(err)) => {
                open.tracker.toggle(lesson_id);
                Err(err)
            }
            Err(PersistError::Ledger(err)) => {
                let restored = self
                    .progress
                    .save_completed_lessons(open.student_id, open.course.id(), &previous)
                    .await;
                match restored {
                    Ok(()) => {
                        open.tracker.toggle(lesson_id);
                    }
                    Err(restore_err) => warn!(
                        student_id = %open.student_id,
                        lesson_id = %lesson_id,
                        error = %restore_err,
                        "could not restore completed lessons; keeping toggle"
                    ),
                }
                Err(err)
            }
        }
    }

    /// Like [`LessonProgressService::toggle_lesson`], for an id in its string
    /// form. Malformed ids are treated as unknown lessons.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if persistence fails.
    pub async fn toggle_lesson_by_key(
        &self,
        open: &mut CourseProgress,
        key: &str,
    ) -> Result<LessonToggle, ProgressError> {
        match key.parse::<LessonId>() {
            Ok(lesson_id) => self.toggle_lesson(open, &lesson_id).await,
            Err(_) => {
                debug!(key, "toggle for malformed lesson id ignored");
                Ok(LessonToggle::UnknownLesson)
            }
        }
    }

    async fn persist(
        &self,
        open: &CourseProgress,
    ) -> Result<(ProgressSnapshot, bool), PersistError> {
        let course_id = open.course.id();
        self.progress
            .save_completed_lessons(open.student_id, course_id, &open.tracker.completed_ids())
            .await
            .map_err(|e| PersistError::Save(e.into()))?;
        let snapshot = open.tracker.snapshot();
        let updated = self
            .enrollments
            .update_enrollment_progress(open.student_id, course_id, &snapshot)
            .await
            .map_err(|e| PersistError::Ledger(e.into()))?;
        Ok((snapshot, updated))
    }
}

/// Which write of a toggle failed.
enum PersistError {
    Save(ProgressError),
    Ledger(ProgressError),
}
