pub mod course;
pub mod enrollment;
pub mod user;

pub use course::{ContentKind, Course, CourseStatus, Lesson, Module};
pub use enrollment::{Enrollment, EnrollmentStatus, LessonProgress};
pub use user::{Identity, Role};
