use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use edu_core::ProgressSnapshot;
use edu_core::model::{AccountId, Course, CourseId, Enrollment};
use storage::repository::{CourseRepository, EnrollmentRepository, StorageError};

use crate::Clock;
use crate::error::EnrollmentServiceError;

/// A student's view of the catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentDashboard {
    /// Enrolled courses with their progress, in catalogue order.
    pub enrolled: Vec<(Course, Enrollment)>,
    /// Everything else, in catalogue order.
    pub available: Vec<Course>,
}

/// The enrollment ledger: one record per (student, course).
#[derive(Clone)]
pub struct EnrollmentService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            enrollments,
        }
    }

    /// Enroll a student. Enrolling twice returns the existing record unchanged.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::CourseNotFound` if the course does not
    /// exist and `EnrollmentServiceError::Storage` if persistence fails.
    #[instrument(skip(self))]
    pub async fn enroll(
        &self,
        student_id: AccountId,
        course_id: CourseId,
    ) -> Result<Enrollment, EnrollmentServiceError> {
        if self.courses.get_course(course_id).await?.is_none() {
            return Err(EnrollmentServiceError::CourseNotFound(course_id));
        }

        let inserted = self
            .enrollments
            .insert_enrollment(&Enrollment::new(student_id, course_id, self.clock.now()))
            .await?;
        if inserted {
            info!(student_id = %student_id, course_id = %course_id, "enrolled");
        } else {
            debug!(student_id = %student_id, course_id = %course_id, "already enrolled");
        }

        self.enrollments
            .get_enrollment(student_id, course_id)
            .await?
            .ok_or(EnrollmentServiceError::Storage(StorageError::NotFound))
    }

    /// Enrollments in the order they were made.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::Storage` if repository access fails.
    pub async fn list_for_student(
        &self,
        student_id: AccountId,
    ) -> Result<Vec<Enrollment>, EnrollmentServiceError> {
        Ok(self.enrollments.list_enrollments(student_id).await?)
    }

    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::Storage` if repository access fails.
    pub async fn is_enrolled(
        &self,
        student_id: AccountId,
        course_id: CourseId,
    ) -> Result<bool, EnrollmentServiceError> {
        Ok(self.get_enrollment(student_id, course_id).await?.is_some())
    }

    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::Storage` if repository access fails.
    pub async fn get_enrollment(
        &self,
        student_id: AccountId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, EnrollmentServiceError> {
        Ok(self.enrollments.get_enrollment(student_id, course_id).await?)
    }

    /// Store a freshly computed snapshot. Returns `false` without writing when
    /// the student is not enrolled.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::Storage` if persistence fails.
    pub async fn update_progress(
        &self,
        student_id: AccountId,
        course_id: CourseId,
        snapshot: &ProgressSnapshot,
    ) -> Result<bool, EnrollmentServiceError> {
        let updated = self
            .enrollments
            .update_enrollment_progress(student_id, course_id, snapshot)
            .await?;
        debug!(
            student_id = %student_id,
            course_id = %course_id,
            percent = snapshot.percent(),
            updated,
            "progress update"
        );
        Ok(updated)
    }

    /// Split the catalogue into enrolled and available courses.
    ///
    /// Enrollments whose course has been deleted do not appear.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::Storage` if repository access fails.
    pub async fn dashboard(
        &self,
        student_id: AccountId,
    ) -> Result<StudentDashboard, EnrollmentServiceError> {
        let (courses, enrollments) = futures::try_join!(
            self.courses.list_courses(),
            self.enrollments.list_enrollments(student_id)
        )?;

        let mut by_course: HashMap<CourseId, Enrollment> = enrollments
            .into_iter()
            .map(|e| (e.course_id(), e))
            .collect();

        let mut dashboard = StudentDashboard::default();
        for course in courses {
            match by_course.remove(&course.id()) {
                Some(enrollment) => dashboard.enrolled.push((course, enrollment)),
                None => dashboard.available.push(course),
            }
        }
        Ok(dashboard)
    }
}
