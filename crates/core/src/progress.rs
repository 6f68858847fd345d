use crate::model::Lesson;

/// Aggregate completion for one (student, course) pair.
///
/// The only constructors go through the rounding rule below, so a snapshot can
/// never carry a percentage that disagrees with its counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    completed: u32,
    total: u32,
    percent: u8,
}

impl ProgressSnapshot {
    /// `round(100 * completed / total)`, half rounding up; 0 when `total` is 0.
    ///
    /// `completed` is capped at `total`.
    #[must_use]
    pub fn compute(completed: u32, total: u32) -> Self {
        if total == 0 {
            return Self::default();
        }
        let completed = completed.min(total);
        let numerator = 200 * u64::from(completed) + u64::from(total);
        let percent = numerator / (2 * u64::from(total));
        Self {
            completed,
            total,
            percent: u8::try_from(percent).unwrap_or(100),
        }
    }

    #[must_use]
    pub fn from_lessons(lessons: &[Lesson]) -> Self {
        let completed = lessons.iter().filter(|l| l.is_completed()).count();
        Self::compute(
            u32::try_from(completed).unwrap_or(u32::MAX),
            u32::try_from(lessons.len()).unwrap_or(u32::MAX),
        )
    }

    #[must_use]
    pub fn completed(&self) -> u32 {
        self.completed
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// A course counts as finished once the rounded percentage reaches 100.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.percent == 100
    }
}
