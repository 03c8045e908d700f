//! Profile documents, one per user, keyed by user id.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use pitchhub_models::Profile;

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, ToFirestoreValue, Value};

/// Collection holding user profiles.
pub const PROFILES_COLLECTION: &str = "profiles";

/// Repository for profile documents.
#[derive(Clone)]
pub struct ProfileRepository {
    client: FirestoreClient,
}

impl ProfileRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, user_id: &str) -> FirestoreResult<Option<Profile>> {
        self.client
            .get_document(PROFILES_COLLECTION, user_id)
            .await?
            .map(|doc| document_to_profile(&doc))
            .transpose()
    }

    /// Write the whole profile, creating it if needed.
    pub async fn save(&self, profile: &Profile) -> FirestoreResult<()> {
        self.client
            .set_document(
                PROFILES_COLLECTION,
                &profile.user_id,
                profile_to_fields(profile),
            )
            .await?;
        info!(user_id = %profile.user_id, "Saved profile");
        Ok(())
    }

    /// Delete the profile document. The photo object is left in place.
    pub async fn delete(&self, user_id: &str) -> FirestoreResult<()> {
        self.client
            .delete_document(PROFILES_COLLECTION, user_id)
            .await?;
        info!(user_id = %user_id, "Deleted profile");
        Ok(())
    }
}

fn profile_to_fields(profile: &Profile) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("user_id".to_string(), profile.user_id.to_firestore_value());
    fields.insert("headline".to_string(), profile.headline.to_firestore_value());
    fields.insert("bio".to_string(), profile.bio.to_firestore_value());
    fields.insert("location".to_string(), profile.location.to_firestore_value());
    fields.insert("skills".to_string(), profile.skills.to_firestore_value());
    fields.insert("links".to_string(), profile.links.to_firestore_value());
    fields.insert(
        "photo_file_name".to_string(),
        profile.photo_file_name.to_firestore_value(),
    );
    fields.insert("created_at".to_string(), profile.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), profile.updated_at.to_firestore_value());
    fields
}

fn document_to_profile(doc: &Document) -> FirestoreResult<Profile> {
    let user_id = doc
        .get::<String>("user_id")
        .or_else(|| doc.id().map(str::to_string))
        .ok_or_else(|| FirestoreError::invalid_document("profile document has no user id"))?;

    let created_at: DateTime<Utc> = doc.get("created_at").unwrap_or_else(Utc::now);
    let updated_at: DateTime<Utc> = doc.get("updated_at").unwrap_or(created_at);

    Ok(Profile {
        user_id,
        headline: doc.get("headline"),
        bio: doc.get("bio"),
        location: doc.get("location"),
        skills: doc.get("skills").unwrap_or_default(),
        links: doc.get("links").unwrap_or_default(),
        photo_file_name: doc.get("photo_file_name"),
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_fields_round_trip() {
        let mut profile = Profile::new("17");
        profile.headline = Some("Drummer".into());
        profile.skills = vec!["drums".into(), "production".into()];
        profile.photo_file_name = Some("17/me.png".into());

        let mut doc = Document::new(profile_to_fields(&profile));
        doc.name = Some("projects/p/databases/(default)/documents/profiles/17".into());

        let back = document_to_profile(&doc).unwrap();
        assert_eq!(back.user_id, "17");
        assert_eq!(back.headline.as_deref(), Some("Drummer"));
        assert_eq!(back.skills, profile.skills);
        assert!(back.links.is_empty());
        assert_eq!(back.photo_file_name.as_deref(), Some("17/me.png"));
        assert!(back.bio.is_none());
    }

    #[test]
    fn test_sparse_document_uses_name_for_user_id() {
        let doc: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/profiles/4",
            "fields": {"bio": {"stringValue": "hi"}}
        }))
        .unwrap();
        let profile = document_to_profile(&doc).unwrap();
        assert_eq!(profile.user_id, "4");
        assert_eq!(profile.bio.as_deref(), Some("hi"));
        assert!(profile.skills.is_empty());
    }
}
