mod account;
mod course;
mod enrollment;
mod ids;
mod lesson;
mod material;
pub mod media;

pub use ids::{AccountId, CourseId, LessonId, MaterialId, ParseIdError};
pub use media::{ContentRef, MediaError};

pub use account::{Account, AccountError, Role, normalize_email};
pub use course::{Course, CourseDetails, CourseError, MAX_LESSONS, parse_lesson_count};
pub use enrollment::{Enrollment, EnrollmentError};
pub use lesson::{Lesson, LessonKind, synthesize_lessons};
pub use material::{Material, MaterialDownload, MaterialError};
