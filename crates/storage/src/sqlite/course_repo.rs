use edu_core::model::{AccountId, Course, CourseId};

use super::SqliteRepository;
use super::mapping::{
    COURSE_COLUMNS, course_id_from_i64, id_to_i64, map_course_row, materials_to_json, read_err,
    ser, write_err,
};
use crate::repository::{CourseRepository, NewCourseRecord, StorageError};

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn insert_new_course(&self, course: NewCourseRecord) -> Result<CourseId, StorageError> {
        // Validate before touching the table so a bad record never gets an id.
        let probe = course.clone().into_course(CourseId::new(0)).map_err(ser)?;

        let res = sqlx::query(
            r"
            INSERT INTO courses (
                educator_id, educator_name, title, description, duration,
                lesson_count, thumbnail, materials, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(id_to_i64("educator_id", probe.educator_id().value())?)
        .bind(probe.educator_name())
        .bind(probe.title())
        .bind(probe.description())
        .bind(probe.duration())
        .bind(i64::from(probe.lesson_count()))
        .bind(probe.thumbnail().map(|t| t.as_str().to_owned()))
        .bind(materials_to_json(probe.materials())?)
        .bind(probe.created_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        course_id_from_i64(res.last_insert_rowid())
    }

    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (
                id, educator_id, educator_name, title, description, duration,
                lesson_count, thumbnail, materials, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                educator_id = excluded.educator_id,
                educator_name = excluded.educator_name,
                title = excluded.title,
                description = excluded.description,
                duration = excluded.duration,
                lesson_count = excluded.lesson_count,
                thumbnail = excluded.thumbnail,
                materials = excluded.materials,
                created_at = excluded.created_at
            ",
        )
        .bind(id_to_i64("course_id", course.id().value())?)
        .bind(id_to_i64("educator_id", course.educator_id().value())?)
        .bind(course.educator_name())
        .bind(course.title())
        .bind(course.description())
        .bind(course.duration())
        .bind(i64::from(course.lesson_count()))
        .bind(course.thumbnail().map(|t| t.as_str().to_owned()))
        .bind(materials_to_json(course.materials())?)
        .bind(course.created_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let row = sqlx::query(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1"))
            .bind(id_to_i64("course_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_err)?;

        row.as_ref().map(map_course_row).transpose()
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let rows = sqlx::query(&format!("SELECT {COURSE_COLUMNS} FROM courses ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(read_err)?;

        rows.iter().map(map_course_row).collect()
    }

    async fn list_courses_by_educator(
        &self,
        educator_id: AccountId,
    ) -> Result<Vec<Course>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE educator_id = ?1 ORDER BY id ASC"
        ))
        .bind(id_to_i64("educator_id", educator_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;

        rows.iter().map(map_course_row).collect()
    }

    async fn delete_course(&self, id: CourseId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM courses WHERE id = ?1")
            .bind(id_to_i64("course_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(write_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
