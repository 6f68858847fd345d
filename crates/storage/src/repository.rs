use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edu_core::ProgressSnapshot;
use edu_core::model::{
    Account, AccountId, ContentRef, Course, CourseDetails, CourseError, CourseId, Enrollment,
    LessonId, Material, Role, normalize_email,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Insert shape for a new account; the repository assigns the id.
#[derive(Clone)]
pub struct NewAccountRecord {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
}

/// An account together with its stored credential.
///
/// Only the identity service sees this; everything else gets a plain `Account`.
#[derive(Clone)]
pub struct AccountRecord {
    pub account: Account,
    pub password_hash: String,
}

impl fmt::Debug for NewAccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccountRecord")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountRecord")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

/// Insert shape for a new course; the repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewCourseRecord {
    pub educator_id: AccountId,
    pub educator_name: String,
    pub details: CourseDetails,
    pub thumbnail: Option<ContentRef>,
    pub materials: Vec<Material>,
    pub created_at: DateTime<Utc>,
}

impl NewCourseRecord {
    /// Take every field except the id from an already validated course.
    #[must_use]
    pub fn from_course(course: &Course) -> Self {
        Self {
            educator_id: course.educator_id(),
            educator_name: course.educator_name().to_owned(),
            details: course.details(),
            thumbnail: course.thumbnail().cloned(),
            materials: course.materials().to_vec(),
            created_at: course.created_at(),
        }
    }

    /// Build the domain course once an id has been assigned.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` if the fields fail course validation.
    pub fn into_course(self, id: CourseId) -> Result<Course, CourseError> {
        Course::new(
            id,
            self.educator_id,
            self.educator_name,
            self.details,
            self.thumbnail,
            self.materials,
            self.created_at,
        )
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Registered accounts plus the single active session.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Store a new account and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email is already registered.
    async fn insert_new_account(&self, record: NewAccountRecord) -> Result<AccountId, StorageError>;

    /// Fetch an account by ID, without its credential.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StorageError>;

    /// Fetch an account and its credential by email (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_account_by_email(&self, email: &str)
    -> Result<Option<AccountRecord>, StorageError>;

    /// Replace the active session; `None` logs out.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn set_active_session(&self, account: Option<AccountId>) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn active_session(&self) -> Result<Option<AccountId>, StorageError>;
}

/// Course records. Every write persists the whole record.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Store a new course under a fresh id that is never reused, even after deletes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn insert_new_course(&self, course: NewCourseRecord) -> Result<CourseId, StorageError>;

    /// Persist or replace a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// All courses in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError>;

    /// Courses owned by one educator, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_courses_by_educator(
        &self,
        educator_id: AccountId,
    ) -> Result<Vec<Course>, StorageError>;

    /// Remove a course. Enrollments and progress referencing it are left alone.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn delete_course(&self, id: CourseId) -> Result<(), StorageError>;
}

/// Enrollment ledger, one record per (student, course).
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Insert unless the key already exists.
    ///
    /// Returns `true` when a record was inserted, `false` when one was already present.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<bool, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_enrollment(
        &self,
        student_id: AccountId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError>;

    /// A student's enrollments in the order they were made.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_enrollments(&self, student_id: AccountId)
    -> Result<Vec<Enrollment>, StorageError>;

    /// Overwrite the progress columns of an existing enrollment.
    ///
    /// Returns `false` without writing when the student is not enrolled.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn update_enrollment_progress(
        &self,
        student_id: AccountId,
        course_id: CourseId,
        snapshot: &ProgressSnapshot,
    ) -> Result<bool, StorageError>;
}

/// Completed-lesson sets keyed by (student, course).
#[async_trait]
pub trait LessonProgressRepository: Send + Sync {
    /// Ids as last saved; may name lessons the course no longer has.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures or unreadable ids.
    async fn load_completed_lessons(
        &self,
        student_id: AccountId,
        course_id: CourseId,
    ) -> Result<Vec<LessonId>, StorageError>;

    /// Replace the stored set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the set cannot be stored.
    async fn save_completed_lessons(
        &self,
        student_id: AccountId,
        course_id: CourseId,
        completed: &[LessonId],
    ) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

fn poisoned<E: fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone)]
pub struct InMemoryRepository {
    accounts: Arc<Mutex<Vec<AccountRecord>>>,
    session: Arc<Mutex<Option<AccountId>>>,
    courses: Arc<Mutex<BTreeMap<CourseId, Course>>>,
    enrollments: Arc<Mutex<HashMap<AccountId, Vec<Enrollment>>>>,
    progress: Arc<Mutex<HashMap<(AccountId, CourseId), Vec<LessonId>>>>,
    next_account_id: Arc<AtomicU64>,
    next_course_id: Arc<AtomicU64>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(Mutex::new(Vec::new())),
            session: Arc::new(Mutex::new(None)),
            courses: Arc::new(Mutex::new(BTreeMap::new())),
            enrollments: Arc::new(Mutex::new(HashMap::new())),
            progress: Arc::new(Mutex::new(HashMap::new())),
            next_account_id: Arc::new(AtomicU64::new(1)),
            next_course_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

#[async_trait]
impl AccountRepository for InMemoryRepository {
    async fn insert_new_account(&self, record: NewAccountRecord) -> Result<AccountId, StorageError> {
        let mut guard = self.accounts.lock().map_err(poisoned)?;
        let email = normalize_email(&record.email);
        if guard.iter().any(|r| r.account.email() == email) {
            return Err(StorageError::Conflict);
        }
        let id = AccountId::new(self.next_account_id.fetch_add(1, Ordering::Relaxed));
        let account = Account::new(id, &email, record.name, record.role)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.push(AccountRecord {
            account,
            password_hash: record.password_hash,
        });
        Ok(id)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        let guard = self.accounts.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .find(|r| r.account.id() == id)
            .map(|r| r.account.clone()))
    }

    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AccountRecord>, StorageError> {
        let email = normalize_email(email);
        let guard = self.accounts.lock().map_err(poisoned)?;
        Ok(guard.iter().find(|r| r.account.email() == email).cloned())
    }

    async fn set_active_session(&self, account: Option<AccountId>) -> Result<(), StorageError> {
        *self.session.lock().map_err(poisoned)? = account;
        Ok(())
    }

    async fn active_session(&self) -> Result<Option<AccountId>, StorageError> {
        Ok(*self.session.lock().map_err(poisoned)?)
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn insert_new_course(&self, course: NewCourseRecord) -> Result<CourseId, StorageError> {
        let id = CourseId::new(self.next_course_id.fetch_add(1, Ordering::Relaxed));
        let course = course
            .into_course(id)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.courses.lock().map_err(poisoned)?.insert(id, course);
        Ok(id)
    }

    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.courses.lock().map_err(poisoned)?;
        guard.insert(course.id(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        Ok(guard.values().cloned().collect())
    }

    async fn list_courses_by_educator(
        &self,
        educator_id: AccountId,
    ) -> Result<Vec<Course>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .filter(|c| c.is_owned_by(educator_id))
            .cloned()
            .collect())
    }

    async fn delete_course(&self, id: CourseId) -> Result<(), StorageError> {
        let mut guard = self.courses.lock().map_err(poisoned)?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<bool, StorageError> {
        let mut guard = self.enrollments.lock().map_err(poisoned)?;
        let rows = guard.entry(enrollment.student_id()).or_default();
        if rows.iter().any(|e| e.course_id() == enrollment.course_id()) {
            return Ok(false);
        }
        rows.push(enrollment.clone());
        Ok(true)
    }

    async fn get_enrollment(
        &self,
        student_id: AccountId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let guard = self.enrollments.lock().map_err(poisoned)?;
        Ok(guard
            .get(&student_id)
            .and_then(|rows| rows.iter().find(|e| e.course_id() == course_id))
            .cloned())
    }

    async fn list_enrollments(
        &self,
        student_id: AccountId,
    ) -> Result<Vec<Enrollment>, StorageError> {
        let guard = self.enrollments.lock().map_err(poisoned)?;
        Ok(guard.get(&student_id).cloned().unwrap_or_default())
    }

    async fn update_enrollment_progress(
        &self,
        student_id: AccountId,
        course_id: CourseId,
        snapshot: &ProgressSnapshot,
    ) -> Result<bool, StorageError> {
        let mut guard = self.enrollments.lock().map_err(poisoned)?;
        let Some(enrollment) = guard
            .get_mut(&student_id)
            .and_then(|rows| rows.iter_mut().find(|e| e.course_id() == course_id))
        else {
            return Ok(false);
        };
        enrollment.apply_progress(snapshot);
        Ok(true)
    }
}

#[async_trait]
impl LessonProgressRepository for InMemoryRepository {
    async fn load_completed_lessons(
        &self,
        student_id: AccountId,
        course_id: CourseId,
    ) -> Result<Vec<LessonId>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard
            .get(&(student_id, course_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn save_completed_lessons(
        &self,
        student_id: AccountId,
        course_id: CourseId,
        completed: &[LessonId],
    ) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard.insert((student_id, course_id), completed.to_vec());
        Ok(())
    }
}

/// Aggregates the per-entity repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub accounts: Arc<dyn AccountRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub progress: Arc<dyn LessonProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self::from_backend(repo)
    }

    /// Use one backend value for every repository.
    pub fn from_backend<R>(repo: R) -> Self
    where
        R: AccountRepository
            + CourseRepository
            + EnrollmentRepository
            + LessonProgressRepository
            + Clone
            + 'static,
    {
        let accounts: Arc<dyn AccountRepository> = Arc::new(repo.clone());
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let enrollments: Arc<dyn EnrollmentRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn LessonProgressRepository> = Arc::new(repo);
        Self {
            accounts,
            courses,
            enrollments,
            progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edu_core::time::fixed_now;

    fn new_course(educator: u64, title: &str, lessons: u32) -> NewCourseRecord {
        NewCourseRecord {
            educator_id: AccountId::new(educator),
            educator_name: "Grace".into(),
            details: CourseDetails {
                title: title.into(),
                description: String::new(),
                duration: "4 weeks".into(),
                lesson_count: lessons,
            },
            thumbnail: None,
            materials: Vec::new(),
            created_at: fixed_now(),
        }
    }

    fn account(email: &str) -> NewAccountRecord {
        NewAccountRecord {
            email: email.into(),
            name: "Sam".into(),
            role: Role::Student,
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let repo = InMemoryRepository::new();
        repo.insert_new_account(account("sam@example.com"))
            .await
            .unwrap();
        let err = repo
            .insert_new_account(account("SAM@example.com "))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        let found = repo
            .find_account_by_email("Sam@Example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.password_hash, "hash");
    }

    #[tokio::test]
    async fn course_ids_are_not_reused_after_delete() {
        let repo = InMemoryRepository::new();
        let first = repo.insert_new_course(new_course(1, "A", 1)).await.unwrap();
        repo.delete_course(first).await.unwrap();
        let second = repo.insert_new_course(new_course(1, "B", 1)).await.unwrap();
        assert_ne!(first, second);
        assert!(matches!(
            repo.delete_course(first).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn lists_filter_by_educator_in_creation_order() {
        let repo = InMemoryRepository::new();
        repo.insert_new_course(new_course(1, "A", 1)).await.unwrap();
        repo.insert_new_course(new_course(2, "B", 1)).await.unwrap();
        repo.insert_new_course(new_course(1, "C", 1)).await.unwrap();

        let mine: Vec<String> = repo
            .list_courses_by_educator(AccountId::new(1))
            .await
            .unwrap()
            .iter()
            .map(|c| c.title().to_owned())
            .collect();
        assert_eq!(mine, ["A", "C"]);
        assert_eq!(repo.list_courses().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn enrollment_insert_is_keyed_and_progress_update_requires_record() {
        let repo = InMemoryRepository::new();
        let student = AccountId::new(5);
        let course = CourseId::new(9);
        let enrollment = Enrollment::new(student, course, fixed_now());

        assert!(repo.insert_enrollment(&enrollment).await.unwrap());
        assert!(!repo.insert_enrollment(&enrollment).await.unwrap());
        assert_eq!(repo.list_enrollments(student).await.unwrap().len(), 1);

        let snapshot = ProgressSnapshot::compute(1, 2);
        assert!(
            repo.update_enrollment_progress(student, course, &snapshot)
                .await
                .unwrap()
        );
        assert!(
            !repo
                .update_enrollment_progress(student, CourseId::new(10), &snapshot)
                .await
                .unwrap()
        );
        let stored = repo.get_enrollment(student, course).await.unwrap().unwrap();
        assert_eq!(stored.progress_percent(), 50);
        assert!(
            repo.get_enrollment(student, CourseId::new(10))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn deleting_course_keeps_enrollments_and_progress() {
        let storage = Storage::in_memory();
        let course_id = storage
            .courses
            .insert_new_course(new_course(1, "A", 2))
            .await
            .unwrap();
        let student = AccountId::new(3);
        storage
            .enrollments
            .insert_enrollment(&Enrollment::new(student, course_id, fixed_now()))
            .await
            .unwrap();
        let lesson = LessonId::new(course_id, 1).unwrap();
        storage
            .progress
            .save_completed_lessons(student, course_id, &[lesson])
            .await
            .unwrap();

        storage.courses.delete_course(course_id).await.unwrap();

        assert_eq!(
            storage.enrollments.list_enrollments(student).await.unwrap().len(),
            1
        );
        assert_eq!(
            storage
                .progress
                .load_completed_lessons(student, course_id)
                .await
                .unwrap(),
            vec![lesson]
        );
    }

    #[tokio::test]
    async fn session_round_trips() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.active_session().await.unwrap(), None);
        repo.set_active_session(Some(AccountId::new(4))).await.unwrap();
        assert_eq!(repo.active_session().await.unwrap(), Some(AccountId::new(4)));
        repo.set_active_session(None).await.unwrap();
        assert_eq!(repo.active_session().await.unwrap(), None);
    }

    #[test]
    fn account_record_debug_hides_credential() {
        let record = NewAccountRecord {
            password_hash: "secret-hash".into(),
            ..account("a@b.c")
        };
        assert!(!format!("{record:?}").contains("secret-hash"));
    }
}
