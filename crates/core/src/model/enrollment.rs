use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{AccountId, CourseId};
use crate::progress::ProgressSnapshot;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("progress percent must be <= 100, got {0}")]
    InvalidProgressPercent(u8),
}

/// A student's enrollment in a course, with the last computed progress.
///
/// Keyed by `(student_id, course_id)`. Progress only changes through
/// `apply_progress`, which takes a `ProgressSnapshot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    student_id: AccountId,
    course_id: CourseId,
    progress_percent: u8,
    completed_lessons: u32,
    enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    /// A fresh enrollment with no progress.
    #[must_use]
    pub fn new(student_id: AccountId, course_id: CourseId, enrolled_at: DateTime<Utc>) -> Self {
        Self {
            student_id,
            course_id,
            progress_percent: 0,
            completed_lessons: 0,
            enrolled_at,
        }
    }

    /// Rebuild an enrollment read back from storage.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::InvalidProgressPercent` above 100.
    pub fn from_persisted(
        student_id: AccountId,
        course_id: CourseId,
        progress_percent: u8,
        completed_lessons: u32,
        enrolled_at: DateTime<Utc>,
    ) -> Result<Self, EnrollmentError> {
        if progress_percent > 100 {
            return Err(EnrollmentError::InvalidProgressPercent(progress_percent));
        }
        Ok(Self {
            student_id,
            course_id,
            progress_percent,
            completed_lessons,
            enrolled_at,
        })
    }

    #[must_use]
    pub fn student_id(&self) -> AccountId {
        self.student_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    #[must_use]
    pub fn completed_lessons(&self) -> u32 {
        self.completed_lessons
    }

    #[must_use]
    pub fn enrolled_at(&self) -> DateTime<Utc> {
        self.enrolled_at
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress_percent == 100
    }

    pub fn apply_progress(&mut self, snapshot: &ProgressSnapshot) {
        self.progress_percent = snapshot.percent();
        self.completed_lessons = snapshot.completed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn new_enrollment_starts_at_zero() {
        let e = Enrollment::new(AccountId::new(1), CourseId::new(2), fixed_now());
        assert_eq!(e.progress_percent(), 0);
        assert_eq!(e.completed_lessons(), 0);
        assert!(!e.is_complete());
    }

    #[test]
    fn apply_progress_copies_snapshot() {
        let mut e = Enrollment::new(AccountId::new(1), CourseId::new(2), fixed_now());
        e.apply_progress(&ProgressSnapshot::compute(3, 3));
        assert_eq!(e.progress_percent(), 100);
        assert_eq!(e.completed_lessons(), 3);
        assert!(e.is_complete());
    }

    #[test]
    fn from_persisted_rejects_out_of_range_percent() {
        let err = Enrollment::from_persisted(AccountId::new(1), CourseId::new(2), 101, 0, fixed_now())
            .unwrap_err();
        assert_eq!(err, EnrollmentError::InvalidProgressPercent(101));
    }
}
