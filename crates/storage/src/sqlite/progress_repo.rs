use edu_core::model::{AccountId, CourseId, LessonId};

use super::SqliteRepository;
use super::mapping::{id_to_i64, read_err, ser, write_err};
use crate::repository::{LessonProgressRepository, StorageError};

#[async_trait::async_trait]
impl LessonProgressRepository for SqliteRepository {
    async fn load_completed_lessons(
        &self,
        student_id: AccountId,
        course_id: CourseId,
    ) -> Result<Vec<LessonId>, StorageError> {
        let raw: Option<String> = sqlx::query_scalar(
            "SELECT completed FROM lesson_progress WHERE student_id = ?1 AND course_id = ?2",
        )
        .bind(id_to_i64("student_id", student_id.value())?)
        .bind(id_to_i64("course_id", course_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?;

        match raw {
            Some(raw) => serde_json::from_str(&raw).map_err(ser),
            None => Ok(Vec::new()),
        }
    }

    async fn save_completed_lessons(
        &self,
        student_id: AccountId,
        course_id: CourseId,
        completed: &[LessonId],
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(completed).map_err(ser)?;
        sqlx::query(
            r"
            INSERT INTO lesson_progress (student_id, course_id, completed)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(student_id, course_id) DO UPDATE SET completed = excluded.completed
            ",
        )
        .bind(id_to_i64("student_id", student_id.value())?)
        .bind(id_to_i64("course_id", course_id.value())?)
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }
}
