use edu_core::ProgressSnapshot;
use edu_core::model::{AccountId, CourseId, Enrollment};

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_enrollment_row, read_err, write_err};
use crate::repository::{EnrollmentRepository, StorageError};

const ENROLLMENT_COLUMNS: &str =
    "student_id, course_id, progress_percent, completed_lessons, enrolled_at";

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<bool, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO enrollments (
                student_id, course_id, progress_percent, completed_lessons, enrolled_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(student_id, course_id) DO NOTHING
            ",
        )
        .bind(id_to_i64("student_id", enrollment.student_id().value())?)
        .bind(id_to_i64("course_id", enrollment.course_id().value())?)
        .bind(i64::from(enrollment.progress_percent()))
        .bind(i64::from(enrollment.completed_lessons()))
        .bind(enrollment.enrolled_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(res.rows_affected() == 1)
    }

    async fn get_enrollment(
        &self,
        student_id: AccountId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE student_id = ?1 AND course_id = ?2"
        ))
        .bind(id_to_i64("student_id", student_id.value())?)
        .bind(id_to_i64("course_id", course_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?;

        row.as_ref().map(map_enrollment_row).transpose()
    }

    async fn list_enrollments(
        &self,
        student_id: AccountId,
    ) -> Result<Vec<Enrollment>, StorageError> {
        // rowid follows insertion, which is enrollment order.
        let rows = sqlx::query(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE student_id = ?1 ORDER BY rowid ASC"
        ))
        .bind(id_to_i64("student_id", student_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;

        rows.iter().map(map_enrollment_row).collect()
    }

    async fn update_enrollment_progress(
        &self,
        student_id: AccountId,
        course_id: CourseId,
        snapshot: &ProgressSnapshot,
    ) -> Result<bool, StorageError> {
        let res = sqlx::query(
            r"
            UPDATE enrollments
            SET progress_percent = ?3, completed_lessons = ?4
            WHERE student_id = ?1 AND course_id = ?2
            ",
        )
        .bind(id_to_i64("student_id", student_id.value())?)
        .bind(id_to_i64("course_id", course_id.value())?)
        .bind(i64::from(snapshot.percent()))
        .bind(i64::from(snapshot.completed()))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(res.rows_affected() > 0)
    }
}
