#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AccountRecord, AccountRepository, CourseRepository, EnrollmentRepository, InMemoryRepository,
    LessonProgressRepository, NewAccountRecord, NewCourseRecord, Storage, StorageError,
};
