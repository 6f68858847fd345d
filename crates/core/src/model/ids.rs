use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an Account
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(u64);

impl AccountId {
    /// Creates a new `AccountId`
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Unique identifier for a Course
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourseId(u64);

impl CourseId {
    /// Creates a new `CourseId`
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Unique identifier for an uploaded course material.
///
/// Random rather than sequential: materials are minted during ingestion,
/// before any repository sees them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(Uuid);

impl MaterialId {
    /// Creates a fresh random `MaterialId`
    #[must_use]
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing uuid
    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying uuid
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

/// Identifier of a synthesized lesson: `{course_id}-lesson-{index}`.
///
/// Lessons are never stored, so the id is derived purely from the course and
/// the 1-based position. A stored id stays meaningful across reloads as long as
/// the course still has at least `index` lessons.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LessonId {
    course_id: CourseId,
    index: u32,
}

impl LessonId {
    /// Returns `None` for index 0; lessons are numbered from 1.
    #[must_use]
    pub fn new(course_id: CourseId, index: u32) -> Option<Self> {
        (index > 0).then_some(Self { course_id, index })
    }

    /// The course this lesson belongs to
    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    /// 1-based position within the course
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }
}

const LESSON_SEPARATOR: &str = "-lesson-";

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.0)
    }
}

impl fmt::Debug for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CourseId({})", self.0)
    }
}

impl fmt::Debug for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MaterialId({})", self.0)
    }
}

impl fmt::Debug for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LessonId({self})")
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{LESSON_SEPARATOR}{}", self.course_id, self.index)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for AccountId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(AccountId::new)
            .map_err(|_| ParseIdError { kind: "AccountId" })
    }
}

impl FromStr for CourseId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(CourseId::new)
            .map_err(|_| ParseIdError { kind: "CourseId" })
    }
}

impl FromStr for MaterialId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(MaterialId)
            .map_err(|_| ParseIdError { kind: "MaterialId" })
    }
}

impl FromStr for LessonId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseIdError { kind: "LessonId" };
        let (course, index) = s.rsplit_once(LESSON_SEPARATOR).ok_or_else(err)?;
        let course_id = course.parse::<CourseId>().map_err(|_| err())?;
        let index = index.parse::<u32>().map_err(|_| err())?;
        LessonId::new(course_id, index).ok_or_else(err)
    }
}

impl TryFrom<String> for LessonId {
    type Error = ParseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LessonId> for String {
    fn from(value: LessonId) -> Self {
        value.to_string()
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
