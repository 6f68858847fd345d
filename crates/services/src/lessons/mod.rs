mod service;
mod tracker;

pub use crate::error::ProgressError;
pub use service::{CourseProgress, LessonProgressService, LessonToggle};
pub use tracker::LessonTracker;
