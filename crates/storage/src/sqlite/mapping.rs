use edu_core::model::{
    AccountId, ContentRef, Course, CourseDetails, CourseId, Enrollment, Material, MaterialId,
};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Map write failures, turning unique-key violations into `Conflict`.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

pub(crate) fn read_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn account_id_from_i64(v: i64) -> Result<AccountId, StorageError> {
    Ok(AccountId::new(i64_to_u64("account_id", v)?))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

//
// ─── MATERIALS (JSON column) ───────────────────────────────────────────────────
//

/// JSON shape of one entry in `courses.materials`.
#[derive(Debug, Serialize, Deserialize)]
struct MaterialRecord {
    id: MaterialId,
    name: String,
    #[serde(rename = "type")]
    mime_type: String,
    url: String,
    size: u64,
}

impl MaterialRecord {
    fn from_material(material: &Material) -> Self {
        Self {
            id: material.id(),
            name: material.name().to_owned(),
            mime_type: material.mime_type().to_owned(),
            url: material.content().as_str().to_owned(),
            size: material.size_bytes(),
        }
    }

    fn into_material(self) -> Result<Material, StorageError> {
        let content = ContentRef::parse(self.url).map_err(ser)?;
        Material::new(self.id, self.name, self.mime_type, content, self.size).map_err(ser)
    }
}

pub(crate) fn materials_to_json(materials: &[Material]) -> Result<String, StorageError> {
    let records: Vec<MaterialRecord> = materials.iter().map(MaterialRecord::from_material).collect();
    serde_json::to_string(&records).map_err(ser)
}

pub(crate) fn materials_from_json(raw: &str) -> Result<Vec<Material>, StorageError> {
    let records: Vec<MaterialRecord> = serde_json::from_str(raw).map_err(ser)?;
    records.into_iter().map(MaterialRecord::into_material).collect()
}

//
// ─── ROWS ──────────────────────────────────────────────────────────────────────
//

pub(crate) const COURSE_COLUMNS: &str = "id, educator_id, educator_name, title, description, \
     duration, lesson_count, thumbnail, materials, created_at";

pub(crate) fn map_course_row(row: &SqliteRow) -> Result<Course, StorageError> {
    let thumbnail = row
        .try_get::<Option<String>, _>("thumbnail")
        .map_err(ser)?
        .map(ContentRef::parse)
        .transpose()
        .map_err(ser)?;
    let materials = materials_from_json(&row.try_get::<String, _>("materials").map_err(ser)?)?;

    Course::new(
        course_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        account_id_from_i64(row.try_get::<i64, _>("educator_id").map_err(ser)?)?,
        row.try_get::<String, _>("educator_name").map_err(ser)?,
        CourseDetails {
            title: row.try_get("title").map_err(ser)?,
            description: row.try_get("description").map_err(ser)?,
            duration: row.try_get("duration").map_err(ser)?,
            lesson_count: u32_from_i64(
                "lesson_count",
                row.try_get::<i64, _>("lesson_count").map_err(ser)?,
            )?,
        },
        thumbnail,
        materials,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_enrollment_row(row: &SqliteRow) -> Result<Enrollment, StorageError> {
    let percent = row.try_get::<i64, _>("progress_percent").map_err(ser)?;
    let percent = u8::try_from(percent)
        .map_err(|_| StorageError::Serialization(format!("invalid progress_percent: {percent}")))?;

    Enrollment::from_persisted(
        account_id_from_i64(row.try_get::<i64, _>("student_id").map_err(ser)?)?,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        percent,
        u32_from_i64(
            "completed_lessons",
            row.try_get::<i64, _>("completed_lessons").map_err(ser)?,
        )?,
        row.try_get("enrolled_at").map_err(ser)?,
    )
    .map_err(ser)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materials_json_uses_upload_field_names() {
        let material = Material::new(
            MaterialId::new_random(),
            "slides.pdf",
            "application/pdf",
            ContentRef::encode("application/pdf", b"pdf"),
            3,
        )
        .unwrap();
        let json = materials_to_json(std::slice::from_ref(&material)).unwrap();
        assert!(json.contains("\"type\":\"application/pdf\""));
        assert!(json.contains("\"url\":\"data:application/pdf;base64,"));

        let back = materials_from_json(&json).unwrap();
        assert_eq!(back, vec![material]);
    }

    #[test]
    fn materials_json_rejects_non_data_urls() {
        let json = r#"[{"id":"6f9619ff-8b86-d011-b42d-00cf4fc964ff","name":"a","type":"text/plain","url":"blob:xyz","size":1}]"#;
        assert!(matches!(
            materials_from_json(json),
            Err(StorageError::Serialization(_))
        ));
    }
}
