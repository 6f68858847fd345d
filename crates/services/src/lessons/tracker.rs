use edu_core::ProgressSnapshot;
use edu_core::model::{Course, CourseId, Lesson, LessonId};

/// Completion state for one course as seen by one student.
///
/// Lessons are synthesized from the course; completion is layered on top from
/// the persisted id set. Mutation needs `&mut self`, so a toggle and the
/// snapshot that follows it cannot interleave with another toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonTracker {
    course_id: CourseId,
    lessons: Vec<Lesson>,
}

impl LessonTracker {
    /// All lessons of `course`, none completed.
    #[must_use]
    pub fn new(course: &Course) -> Self {
        Self {
            course_id: course.id(),
            lessons: course.lessons(),
        }
    }

    /// Mark the stored ids as completed.
    ///
    /// Returns how many ids were ignored because they name no current lesson
    /// (another course, or an index beyond a reduced lesson count).
    pub fn rehydrate(&mut self, completed: &[LessonId]) -> usize {
        let mut stale = 0;
        for id in completed {
            match self.position(id) {
                Some(pos) => self.lessons[pos].set_completed(true),
                None => stale += 1,
            }
        }
        stale
    }

    /// Flip one lesson. Returns the new state, or `None` for an unknown id.
    pub fn toggle(&mut self, lesson_id: &LessonId) -> Option<bool> {
        let pos = self.position(lesson_id)?;
        let lesson = &mut self.lessons[pos];
        lesson.toggle();
        Some(lesson.is_completed())
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::from_lessons(&self.lessons)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.snapshot().is_complete()
    }

    /// Completed ids in lesson order.
    #[must_use]
    pub fn completed_ids(&self) -> Vec<LessonId> {
        self.lessons
            .iter()
            .filter(|l| l.is_completed())
            .map(Lesson::id)
            .collect()
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    // Lesson n sits at index n - 1.
    fn position(&self, lesson_id: &LessonId) -> Option<usize> {
        if lesson_id.course_id() != self.course_id {
            return None;
        }
        let pos = usize::try_from(lesson_id.index()).ok()?.checked_sub(1)?;
        (pos < self.lessons.len()).then_some(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edu_core::model::{AccountId, CourseDetails};
    use edu_core::time::fixed_now;

    fn course(id: u64, lessons: u32) -> Course {
        Course::new(
            CourseId::new(id),
            AccountId::new(1),
            "Ada",
            CourseDetails {
                title: "Rust".into(),
                lesson_count: lessons,
                ..CourseDetails::default()
            },
            None,
            Vec::new(),
            fixed_now(),
        )
        .unwrap()
    }

    fn lesson(course: u64, index: u32) -> LessonId {
        LessonId::new(CourseId::new(course), index).unwrap()
    }

    #[test]
    fn toggling_one_and_three_of_four_is_half_done() {
        let mut tracker = LessonTracker::new(&course(7, 4));
        assert_eq!(tracker.toggle(&lesson(7, 1)), Some(true));
        assert_eq!(tracker.toggle(&lesson(7, 3)), Some(true));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.completed(), 2);
        assert_eq!(snapshot.percent(), 50);
        assert_eq!(tracker.completed_ids(), vec![lesson(7, 1), lesson(7, 3)]);
    }

    #[test]
    fn completed_count_tracks_odd_toggle_counts() {
        let mut tracker = LessonTracker::new(&course(7, 5));
        let sequence = [1, 2, 1, 3, 3, 3, 5, 2, 2];
        for index in sequence {
            tracker.toggle(&lesson(7, index));
        }
        // 1 twice, 2 three times, 3 three times, 5 once.
        assert_eq!(tracker.snapshot().completed(), 3);
        assert_eq!(
            tracker.completed_ids(),
            vec![lesson(7, 2), lesson(7, 3), lesson(7, 5)]
        );
    }

    #[test]
    fn unknown_lessons_change_nothing() {
        let mut tracker = LessonTracker::new(&course(7, 2));
        let before = tracker.clone();
        assert_eq!(tracker.toggle(&lesson(7, 3)), None);
        assert_eq!(tracker.toggle(&lesson(8, 1)), None);
        assert_eq!(tracker, before);
    }

    #[test]
    fn rehydrate_skips_stale_ids() {
        let mut tracker = LessonTracker::new(&course(7, 2));
        let stale = tracker.rehydrate(&[lesson(7, 2), lesson(7, 4), lesson(9, 1)]);
        assert_eq!(stale, 2);
        assert_eq!(tracker.completed_ids(), vec![lesson(7, 2)]);
    }

    #[test]
    fn empty_course_is_never_complete() {
        let tracker = LessonTracker::new(&course(7, 0));
        assert_eq!(tracker.snapshot().percent(), 0);
        assert!(!tracker.is_complete());
    }

    #[test]
    fn all_done_is_complete() {
        let mut tracker = LessonTracker::new(&course(7, 3));
        tracker.rehydrate(&[lesson(7, 1), lesson(7, 2), lesson(7, 3)]);
        assert!(tracker.is_complete());
    }
}
