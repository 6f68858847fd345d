use serde::{Deserialize, Serialize};

use crate::model::ids::{CourseId, LessonId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonKind {
    Video,
    Document,
}

impl LessonKind {
    /// Odd positions are videos, even positions documents.
    #[must_use]
    pub fn for_index(index: u32) -> Self {
        if index % 2 == 1 {
            LessonKind::Video
        } else {
            LessonKind::Document
        }
    }
}

/// A lesson synthesized from a course's lesson count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    title: String,
    kind: LessonKind,
    completed: bool,
}

impl Lesson {
    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn kind(&self) -> LessonKind {
        self.kind
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }

    pub fn toggle(&mut self) {
        self.completed = !self.completed;
    }
}

/// Build lessons `1..=lesson_count` for a course, all incomplete.
///
/// Depends only on its arguments, so ids produced here on a later load match
/// ids persisted earlier.
#[must_use]
pub fn synthesize_lessons(course_id: CourseId, course_title: &str, lesson_count: u32) -> Vec<Lesson> {
    (1..=lesson_count)
        .filter_map(|index| {
            LessonId::new(course_id, index).map(|id| Lesson {
                id,
                title: format!("Lesson {index}: {course_title} - Part {index}"),
                kind: LessonKind::for_index(index),
                completed: false,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_exactly_n_lessons_with_stable_ids() {
        let course = CourseId::new(55);
        let lessons = synthesize_lessons(course, "Rust", 5);
        assert_eq!(lessons.len(), 5);

        let ids: Vec<String> = lessons.iter().map(|l| l.id().to_string()).collect();
        assert_eq!(
            ids,
            [
                "55-lesson-1",
                "55-lesson-2",
                "55-lesson-3",
                "55-lesson-4",
                "55-lesson-5"
            ]
        );
        assert!(lessons.iter().all(|l| !l.is_completed()));
        assert_eq!(synthesize_lessons(course, "Rust", 5), lessons);
    }

    #[test]
    fn kinds_alternate_starting_with_video() {
        let lessons = synthesize_lessons(CourseId::new(1), "Rust", 4);
        let kinds: Vec<_> = lessons.iter().map(Lesson::kind).collect();
        assert_eq!(
            kinds,
            [
                LessonKind::Video,
                LessonKind::Document,
                LessonKind::Video,
                LessonKind::Document
            ]
        );
    }

    #[test]
    fn titles_follow_template() {
        let lessons = synthesize_lessons(CourseId::new(1), "Ownership", 2);
        assert_eq!(lessons[1].title(), "Lesson 2: Ownership - Part 2");
    }

    #[test]
    fn zero_lessons_is_empty() {
        assert!(synthesize_lessons(CourseId::new(1), "Empty", 0).is_empty());
    }

    #[test]
    fn toggle_flips_completion() {
        let mut lesson = synthesize_lessons(CourseId::new(1), "Rust", 1).remove(0);
        lesson.toggle();
        assert!(lesson.is_completed());
        lesson.toggle();
        assert!(!lesson.is_completed());
    }
}
