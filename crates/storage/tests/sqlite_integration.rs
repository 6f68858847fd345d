use edu_core::ProgressSnapshot;
use edu_core::model::{
    AccountId, ContentRef, CourseDetails, CourseId, Enrollment, LessonId, Material, MaterialId,
    Role,
};
use edu_core::time::fixed_now;
use storage::repository::{
    AccountRepository, CourseRepository, EnrollmentRepository, LessonProgressRepository,
    NewAccountRecord, NewCourseRecord, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn course_record(educator: AccountId, title: &str, lessons: u32) -> NewCourseRecord {
    NewCourseRecord {
        educator_id: educator,
        educator_name: "Ada".into(),
        details: CourseDetails {
            title: title.into(),
            description: "Intro".into(),
            duration: "6 weeks".into(),
            lesson_count: lessons,
        },
        thumbnail: None,
        materials: Vec::new(),
        created_at: fixed_now(),
    }
}

#[tokio::test]
async fn accounts_and_session_persist() {
    let repo = connect("memdb_accounts").await;

    let id = repo
        .insert_new_account(NewAccountRecord {
            email: " Ada@Example.com".into(),
            name: "Ada".into(),
            role: Role::Educator,
            password_hash: "phc-string".into(),
        })
        .await
        .unwrap();

    let dup = repo
        .insert_new_account(NewAccountRecord {
            email: "ada@example.com".into(),
            name: "Other".into(),
            role: Role::Student,
            password_hash: "x".into(),
        })
        .await;
    assert!(matches!(dup, Err(StorageError::Conflict)));

    let record = repo
        .find_account_by_email("ADA@example.com")
        .await
        .unwrap()
        .expect("account");
    assert_eq!(record.account.id(), id);
    assert_eq!(record.account.email(), "ada@example.com");
    assert_eq!(record.account.role(), Role::Educator);
    assert_eq!(record.password_hash, "phc-string");

    assert_eq!(repo.active_session().await.unwrap(), None);
    repo.set_active_session(Some(id)).await.unwrap();
    assert_eq!(repo.active_session().await.unwrap(), Some(id));
    repo.set_active_session(None).await.unwrap();
    assert_eq!(repo.active_session().await.unwrap(), None);
}

#[tokio::test]
async fn courses_round_trip_with_thumbnail_and_materials() {
    let repo = connect("memdb_courses").await;
    let educator = AccountId::new(1);

    let mut record = course_record(educator, "Rust 101", 3);
    record.thumbnail = Some(ContentRef::encode("image/png", &[0x89, 0x50, 0x4e, 0x47]));
    record.materials = vec![
        Material::new(
            MaterialId::new_random(),
            "syllabus.txt",
            "text/plain",
            ContentRef::encode("text/plain", b"week 1"),
            6,
        )
        .unwrap(),
    ];
    let id = repo.insert_new_course(record).await.unwrap();

    let mut course = repo.get_course(id).await.unwrap().expect("course");
    assert_eq!(course.title(), "Rust 101");
    assert_eq!(course.lesson_count(), 3);
    assert!(course.thumbnail().is_some_and(ContentRef::is_image));
    assert_eq!(course.materials().len(), 1);
    assert_eq!(
        course.materials()[0].download().unwrap().bytes,
        b"week 1".to_vec()
    );

    course.set_title("Rust 102").unwrap();
    course.set_lesson_count(5).unwrap();
    repo.upsert_course(&course).await.unwrap();

    let reloaded = repo.get_course(id).await.unwrap().expect("course");
    assert_eq!(reloaded, course);
}

#[tokio::test]
async fn course_listing_and_delete() {
    let repo = connect("memdb_course_list").await;
    let a = AccountId::new(1);
    let b = AccountId::new(2);

    let first = repo.insert_new_course(course_record(a, "A", 1)).await.unwrap();
    repo.insert_new_course(course_record(b, "B", 1)).await.unwrap();
    repo.insert_new_course(course_record(a, "C", 0)).await.unwrap();

    let titles: Vec<String> = repo
        .list_courses_by_educator(a)
        .await
        .unwrap()
        .iter()
        .map(|c| c.title().to_owned())
        .collect();
    assert_eq!(titles, ["A", "C"]);
    assert_eq!(repo.list_courses().await.unwrap().len(), 3);

    repo.delete_course(first).await.unwrap();
    assert!(repo.get_course(first).await.unwrap().is_none());
    assert!(matches!(
        repo.delete_course(first).await,
        Err(StorageError::NotFound)
    ));

    let next = repo.insert_new_course(course_record(a, "D", 1)).await.unwrap();
    assert!(next.value() > first.value());
}

#[tokio::test]
async fn enrollments_are_keyed_and_survive_course_delete() {
    let repo = connect("memdb_enrollments").await;
    let student = AccountId::new(7);
    let course_a = repo
        .insert_new_course(course_record(AccountId::new(1), "A", 4))
        .await
        .unwrap();
    let course_b = repo
        .insert_new_course(course_record(AccountId::new(1), "B", 2))
        .await
        .unwrap();

    let enrollment = Enrollment::new(student, course_b, fixed_now());
    assert!(repo.insert_enrollment(&enrollment).await.unwrap());
    assert!(!repo.insert_enrollment(&enrollment).await.unwrap());
    assert!(
        repo.insert_enrollment(&Enrollment::new(student, course_a, fixed_now()))
            .await
            .unwrap()
    );

    let order: Vec<CourseId> = repo
        .list_enrollments(student)
        .await
        .unwrap()
        .iter()
        .map(Enrollment::course_id)
        .collect();
    assert_eq!(order, [course_b, course_a]);

    assert!(
        repo.update_enrollment_progress(student, course_a, &ProgressSnapshot::compute(1, 4))
            .await
            .unwrap()
    );
    assert!(
        !repo
            .update_enrollment_progress(
                AccountId::new(99),
                course_a,
                &ProgressSnapshot::compute(1, 4)
            )
            .await
            .unwrap()
    );
    let stored = repo
        .get_enrollment(student, course_a)
        .await
        .unwrap()
        .expect("enrollment");
    assert_eq!(stored.progress_percent(), 25);
    assert_eq!(stored.completed_lessons(), 1);

    repo.delete_course(course_a).await.unwrap();
    assert_eq!(repo.list_enrollments(student).await.unwrap().len(), 2);
}

#[tokio::test]
async fn lesson_progress_replaces_stored_set() {
    let repo = connect("memdb_progress").await;
    let student = AccountId::new(3);
    let course = CourseId::new(11);

    assert!(
        repo.load_completed_lessons(student, course)
            .await
            .unwrap()
            .is_empty()
    );

    let one = LessonId::new(course, 1).unwrap();
    let three = LessonId::new(course, 3).unwrap();
    repo.save_completed_lessons(student, course, &[one, three])
        .await
        .unwrap();
    assert_eq!(
        repo.load_completed_lessons(student, course).await.unwrap(),
        vec![one, three]
    );

    repo.save_completed_lessons(student, course, &[three])
        .await
        .unwrap();
    assert_eq!(
        repo.load_completed_lessons(student, course).await.unwrap(),
        vec![three]
    );

    let raw: String = sqlx::query_scalar(
        "SELECT completed FROM lesson_progress WHERE student_id = 3 AND course_id = 11",
    )
    .fetch_one(repo.pool())
    .await
    .unwrap();
    assert_eq!(raw, r#"["11-lesson-3"]"#);
}

#[tokio::test]
async fn unreadable_progress_surfaces_serialization_error() {
    let repo = connect("memdb_bad_progress").await;
    sqlx::query(
        "INSERT INTO lesson_progress (student_id, course_id, completed) VALUES (1, 1, 'nope')",
    )
    .execute(repo.pool())
    .await
    .unwrap();

    let err = repo
        .load_completed_lessons(AccountId::new(1), CourseId::new(1))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Serialization(_)));
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(versions, 1);
}

#[tokio::test]
async fn file_databases_use_write_ahead_logging() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("edu.sqlite3").display());
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode;")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}
