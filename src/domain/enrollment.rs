use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
  #[default]
  Active,
  Completed,
  Dropped,
}

impl EnrollmentStatus {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "active" => Some(Self::Active),
      "completed" => Some(Self::Completed),
      "dropped" => Some(Self::Dropped),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::Completed => "completed",
      Self::Dropped => "dropped",
    }
  }
}

/// A student's enrollment in a course, unique per (student, course)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
  pub id: i64,
  pub student_id: i64,
  pub course_id: i64,
  pub status: EnrollmentStatus,
  pub enrolled_at: DateTime<Utc>,
  pub completed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
  /// Only active enrollments grant access to course content
  pub fn is_active(&self) -> bool {
    self.status == EnrollmentStatus::Active
  }
}

/// Completion state of one lesson for one student.
/// The only persisted source of progress; percentages are derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
  pub student_id: i64,
  pub lesson_id: i64,
  pub is_completed: bool,
  pub completed_at: Option<DateTime<Utc>>,
}
