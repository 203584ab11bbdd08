use serde::{Deserialize, Serialize};

/// Platform role of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  #[default]
  Student,
  Instructor,
  Admin,
  SuperAdmin,
}

impl Role {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "student" => Some(Self::Student),
      "instructor" => Some(Self::Instructor),
      "admin" => Some(Self::Admin),
      "super_admin" => Some(Self::SuperAdmin),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Student => "student",
      Self::Instructor => "instructor",
      Self::Admin => "admin",
      Self::SuperAdmin => "super_admin",
    }
  }

  /// Admins and super-admins bypass enrollment and ownership checks
  pub fn is_admin(&self) -> bool {
    matches!(self, Self::Admin | Self::SuperAdmin)
  }

  /// Roles allowed to create and manage courses
  pub fn can_author(&self) -> bool {
    !matches!(self, Self::Student)
  }
}

/// Who is making a request, as supplied by the session layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
  pub user_id: i64,
  pub role: Role,
}

impl Identity {
  pub fn new(user_id: i64, role: Role) -> Self {
    Self { user_id, role }
  }
}
