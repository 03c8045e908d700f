//! User account models.

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Account type chosen at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// Recruiters browse pitches.
    Recruiter,
    /// Talent upload pitches.
    Talent,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Recruiter => "recruiter",
            UserType::Talent => "talent",
        }
    }

    /// Parse the stored/submitted form. Matching is exact, as in the database check constraint.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "recruiter" => Some(UserType::Recruiter),
            "talent" => Some(UserType::Talent),
            _ => None,
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User as returned to clients (never carries the password hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub user_type: UserType,
    pub segment: Option<String>,
}

/// Registration payload.
///
/// Fields default to empty so that missing values surface as a 400 from
/// the handler instead of a body rejection.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(max = 255))]
    pub name: String,

    #[serde(default)]
    #[validate(email, length(max = 255))]
    pub email: String,

    #[serde(default)]
    #[validate(length(max = 128))]
    pub password: String,

    #[serde(default)]
    pub user_type: String,

    #[serde(default)]
    #[validate(length(max = 100))]
    pub segment: Option<String>,
}

impl RegisterRequest {
    /// True when every required field is present and non-empty.
    pub fn has_required_fields(&self) -> bool {
        !self.name.is_empty()
            && !self.email.is_empty()
            && !self.password.is_empty()
            && !self.user_type.is_empty()
    }

    /// Segment with empty strings treated as absent.
    pub fn normalized_segment(&self) -> Option<String> {
        self.segment
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Login payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}
