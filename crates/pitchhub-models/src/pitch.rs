//! Pitch records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Document identifier of a pitch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PitchId(pub String);

impl PitchId {
    /// Generate a new random pitch ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PitchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PitchId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PitchId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A pitch file uploaded by a talent user.
///
/// `file_name` is the object key in the pitches container. `file_url` is the
/// capability URL handed out at upload time and is only kept so that records
/// written without a key can still be resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pitch {
    pub id: PitchId,
    /// String form of the relational user id.
    pub user_id: String,
    pub file_name: Option<String>,
    pub category: Option<String>,
    pub note: Option<String>,
    pub file_url: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl Pitch {
    /// Create a new pitch record stamped with the current time.
    pub fn new(
        user_id: impl Into<String>,
        file_name: impl Into<String>,
        category: Option<String>,
        note: Option<String>,
        file_url: impl Into<String>,
    ) -> Self {
        Self {
            id: PitchId::new(),
            user_id: user_id.into(),
            file_name: Some(file_name.into()),
            category,
            note,
            file_url: Some(file_url.into()),
            uploaded_at: Utc::now(),
        }
    }
}

/// Uploader details joined from the users table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uploader {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

impl Uploader {
    /// Placeholder used when the user row no longer exists.
    pub fn unknown(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: "Unknown".to_string(),
            email: "Unknown".to_string(),
        }
    }
}

/// Pitch as returned by the listing route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PitchListItem {
    #[serde(rename = "_id")]
    pub id: PitchId,
    pub user_id: Uploader,
    pub file_name: Option<String>,
    pub category: Option<String>,
    pub note: Option<String>,
    pub file_url: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl PitchListItem {
    /// Build a list item from a stored pitch, its uploader and a freshly minted URL.
    pub fn from_pitch(pitch: Pitch, uploader: Uploader, file_url: Option<String>) -> Self {
        Self {
            id: pitch.id,
            user_id: uploader,
            file_name: pitch.file_name,
            category: pitch.category,
            note: pitch.note,
            file_url: file_url.or(pitch.file_url),
            uploaded_at: pitch.uploaded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_item_prefers_fresh_url() {
        let pitch = Pitch::new("3", "deck.pdf", Some("Music".into()), None, "https://old");
        let item = PitchListItem::from_pitch(
            pitch,
            Uploader::unknown("3"),
            Some("https://fresh".into()),
        );
        assert_eq!(item.file_url.as_deref(), Some("https://fresh"));

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["userId"]["_id"], "3");
        assert_eq!(json["userId"]["name"], "Unknown");
        assert_eq!(json["fileName"], "deck.pdf");
        assert!(json.get("_id").is_some());
    }

    #[test]
    fn test_list_item_keeps_stored_url_without_fresh_one() {
        let pitch = Pitch::new("3", "deck.pdf", None, None, "https://old");
        let item = PitchListItem::from_pitch(pitch, Uploader::unknown("3"), None);
        assert_eq!(item.file_url.as_deref(), Some("https://old"));
    }
}
