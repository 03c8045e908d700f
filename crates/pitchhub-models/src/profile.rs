//! Talent and recruiter profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Maximum number of skills kept on a profile.
pub const MAX_SKILLS: usize = 50;

/// Maximum number of external links kept on a profile.
pub const MAX_LINKS: usize = 10;

/// Stored profile document (one per user, keyed by user id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    /// Object key of the profile photo in the profiles container.
    pub photo_file_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Create an empty profile for a user.
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            headline: None,
            bio: None,
            location: None,
            skills: Vec::new(),
            links: Vec::new(),
            photo_file_name: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update. Absent fields are left unchanged.
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(headline) = update.headline {
            self.headline = Some(headline);
        }
        if let Some(bio) = update.bio {
            self.bio = Some(bio);
        }
        if let Some(location) = update.location {
            self.location = Some(location);
        }
        if let Some(skills) = update.skills {
            self.skills = dedup_trimmed(skills);
        }
        if let Some(links) = update.links {
            self.links = dedup_trimmed(links);
        }
        self.updated_at = Utc::now();
    }
}

fn dedup_trimmed(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for v in values {
        let v = v.trim();
        if !v.is_empty() && !out.iter().any(|o| o == v) {
            out.push(v.to_string());
        }
    }
    out
}

/// Partial profile update.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(max = 200))]
    pub headline: Option<String>,
    #[validate(length(max = 5000))]
    pub bio: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(length(max = 50))]
    pub skills: Option<Vec<String>>,
    #[validate(length(max = 10))]
    pub links: Option<Vec<String>>,
}

/// Profile as returned to clients, with a freshly minted photo URL.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub user_id: String,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub links: Vec<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileView {
    pub fn from_profile(profile: Profile, photo_url: Option<String>) -> Self {
        Self {
            user_id: profile.user_id,
            headline: profile.headline,
            bio: profile.bio,
            location: profile.location,
            skills: profile.skills,
            links: profile.links,
            photo_url,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}
