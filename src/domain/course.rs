use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a course
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
  #[default]
  Draft,
  Published,
  Archived,
}

impl CourseStatus {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "draft" => Some(Self::Draft),
      "published" => Some(Self::Published),
      "archived" => Some(Self::Archived),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Draft => "draft",
      Self::Published => "published",
      Self::Archived => "archived",
    }
  }
}

/// What a lesson contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
  #[default]
  Video,
  Text,
  Quiz,
}

impl ContentKind {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "video" => Some(Self::Video),
      "text" => Some(Self::Text),
      "quiz" => Some(Self::Quiz),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Video => "video",
      Self::Text => "text",
      Self::Quiz => "quiz",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
  pub id: i64,
  pub module_id: i64,
  pub position: i64,
  pub title: String,
  pub kind: ContentKind,
  /// Opaque storage locator of the media asset (None for lessons without media)
  #[serde(skip_serializing)]
  pub media_locator: Option<String>,
  pub is_free_preview: bool,
}

impl Lesson {
  pub fn has_media(&self) -> bool {
    self
      .media_locator
      .as_deref()
      .map(|m| !m.trim().is_empty())
      .unwrap_or(false)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
  pub id: i64,
  pub course_id: i64,
  pub position: i64,
  pub title: String,
  pub lessons: Vec<Lesson>,
}

/// A course with its full module/lesson tree, in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
  pub id: i64,
  pub instructor_id: i64,
  pub title: String,
  pub description: Option<String>,
  pub status: CourseStatus,
  pub created_at: DateTime<Utc>,
  pub modules: Vec<Module>,
}

impl Course {
  pub fn is_published(&self) -> bool {
    self.status == CourseStatus::Published
  }

  pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
    self.modules.iter().flat_map(|m| m.lessons.iter())
  }

  pub fn lesson_count(&self) -> usize {
    self.modules.iter().map(|m| m.lessons.len()).sum()
  }

  /// Find a lesson anywhere in this course's module tree
  pub fn find_lesson(&self, lesson_id: i64) -> Option<&Lesson> {
    self.lessons().find(|l| l.id == lesson_id)
  }

  pub fn contains_lesson(&self, lesson_id: i64) -> bool {
    self.find_lesson(lesson_id).is_some()
  }
}

#[cfg(test)]
pub(crate) mod fixtures {
  use super::*;

  pub fn lesson(id: i64, module_id: i64, media: Option<&str>, preview: bool) -> Lesson {
    Lesson {
      id,
      module_id,
      position: id,
      title: format!("Lesson {}", id),
      kind: ContentKind::Video,
      media_locator: media.map(String::from),
      is_free_preview: preview,
    }
  }

  /// Course with one module per entry of `lessons_per_module`, lesson ids numbered from 1
  pub fn course(id: i64, instructor_id: i64, status: CourseStatus, lessons_per_module: &[usize]) -> Course {
    let mut next_lesson = 1;
    let modules = lessons_per_module
      .iter()
      .enumerate()
      .map(|(idx, &count)| {
        let module_id = id * 100 + idx as i64;
        let lessons = (0..count)
          .map(|_| {
            let l = lesson(
              id * 1000 + next_lesson,
              module_id,
              Some(&format!("courses/{}/lesson-{}.mp4", id, next_lesson)),
              false,
            );
            next_lesson += 1;
            l
          })
          .collect();
        Module {
          id: module_id,
          course_id: id,
          position: idx as i64,
          title: format!("Module {}", idx + 1),
          lessons,
        }
      })
      .collect();

    Course {
      id,
      instructor_id,
      title: format!("Course {}", id),
      description: None,
      status,
      created_at: Utc::now(),
      modules,
    }
  }
}
