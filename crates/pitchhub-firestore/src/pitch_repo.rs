//! Pitch documents in the top-level `pitches` collection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use pitchhub_models::{Pitch, PitchId};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Direction, Document, FieldOperator, StructuredQuery, ToFirestoreValue, Value};

/// Collection holding pitch metadata.
pub const PITCHES_COLLECTION: &str = "pitches";

/// Category value meaning "no filter" in listing requests.
pub const ALL_CATEGORIES: &str = "All";

/// Repository for pitch documents.
#[derive(Clone)]
pub struct PitchRepository {
    client: FirestoreClient,
}

impl PitchRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Insert a new pitch record.
    pub async fn create(&self, pitch: &Pitch) -> FirestoreResult<()> {
        self.client
            .create_document(PITCHES_COLLECTION, pitch.id.as_str(), pitch_to_fields(pitch))
            .await?;
        info!(
            pitch_id = %pitch.id,
            user_id = %pitch.user_id,
            category = pitch.category.as_deref().unwrap_or(""),
            "Created pitch record"
        );
        Ok(())
    }

    pub async fn get(&self, id: &PitchId) -> FirestoreResult<Option<Pitch>> {
        self.client
            .get_document(PITCHES_COLLECTION, id.as_str())
            .await?
            .map(|doc| document_to_pitch(&doc))
            .transpose()
    }

    /// Delete the pitch document. The stored object is left in place.
    pub async fn delete(&self, id: &PitchId) -> FirestoreResult<()> {
        self.client
            .delete_document(PITCHES_COLLECTION, id.as_str())
            .await?;
        info!(pitch_id = %id, "Deleted pitch record");
        Ok(())
    }

    /// Most recent pitch in `category`, if any.
    pub async fn latest_by_category(&self, category: &str) -> FirestoreResult<Option<Pitch>> {
        let query = StructuredQuery::collection(PITCHES_COLLECTION)
            .filter(
                "category",
                FieldOperator::Equal,
                category.to_firestore_value(),
            )
            .order_by("uploaded_at", Direction::Descending)
            .limit(1);

        let docs = self.client.run_query(query).await?;
        docs.first().map(document_to_pitch).transpose()
    }

    /// All pitches, newest first, optionally restricted to one category.
    ///
    /// `None` and `Some("All")` both mean every category.
    pub async fn list(&self, category: Option<&str>) -> FirestoreResult<Vec<Pitch>> {
        let mut query = StructuredQuery::collection(PITCHES_COLLECTION);
        if let Some(category) = category.filter(|c| !c.is_empty() && *c != ALL_CATEGORIES) {
            query = query.filter(
                "category",
                FieldOperator::Equal,
                category.to_firestore_value(),
            );
        }
        let query = query.order_by("uploaded_at", Direction::Descending);

        self.client
            .run_query(query)
            .await?
            .iter()
            .map(document_to_pitch)
            .collect()
    }
}

fn pitch_to_fields(pitch: &Pitch) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("user_id".to_string(), pitch.user_id.to_firestore_value());
    fields.insert("file_name".to_string(), pitch.file_name.to_firestore_value());
    fields.insert("category".to_string(), pitch.category.to_firestore_value());
    fields.insert("note".to_string(), pitch.note.to_firestore_value());
    fields.insert("file_url".to_string(), pitch.file_url.to_firestore_value());
    fields.insert("uploaded_at".to_string(), pitch.uploaded_at.to_firestore_value());
    fields
}

fn document_to_pitch(doc: &Document) -> FirestoreResult<Pitch> {
    let id = doc
        .id()
        .ok_or_else(|| FirestoreError::invalid_document("pitch document has no name"))?;
    let user_id = doc
        .get::<String>("user_id")
        .ok_or_else(|| FirestoreError::invalid_document(format!("pitch {} has no user_id", id)))?;
    let uploaded_at: DateTime<Utc> = doc
        .get("uploaded_at")
        .or_else(|| {
            doc.create_time
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(Into::into)
        })
        .ok_or_else(|| {
            FirestoreError::invalid_document(format!("pitch {} has no uploaded_at", id))
        })?;

    Ok(Pitch {
        id: PitchId::from(id),
        user_id,
        file_name: doc.get("file_name"),
        category: doc.get("category"),
        note: doc.get("note"),
        file_url: doc.get("file_url"),
        uploaded_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_to_pitch() {
        let doc: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/pitches/p-1",
            "fields": {
                "user_id": {"stringValue": "12"},
                "file_name": {"stringValue": "deck.pdf"},
                "category": {"stringValue": "Music"},
                "note": {"nullValue": null},
                "uploaded_at": {"timestampValue": "2024-05-01T10:00:00Z"}
            }
        }))
        .unwrap();

        let pitch = document_to_pitch(&doc).unwrap();
        assert_eq!(pitch.id.as_str(), "p-1");
        assert_eq!(pitch.user_id, "12");
        assert_eq!(pitch.file_name.as_deref(), Some("deck.pdf"));
        assert!(pitch.note.is_none());
        assert!(pitch.file_url.is_none());
    }

    #[test]
    fn test_uploaded_at_falls_back_to_create_time() {
        let doc: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/pitches/p-2",
            "createTime": "2023-01-02T03:04:05.123456Z",
            "fields": {"user_id": {"integerValue": "3"}}
        }))
        .unwrap();

        let pitch = document_to_pitch(&doc).unwrap();
        assert_eq!(pitch.user_id, "3");
        assert_eq!(pitch.uploaded_at.to_rfc3339(), "2023-01-02T03:04:05.123456+00:00");
    }

    #[test]
    fn test_missing_user_is_invalid() {
        let doc: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/pitches/p-3",
            "fields": {"uploaded_at": {"timestampValue": "2024-05-01T10:00:00Z"}}
        }))
        .unwrap();
        assert!(matches!(
            document_to_pitch(&doc),
            Err(FirestoreError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_fields_round_trip() {
        let pitch = Pitch::new(
            "9",
            "talk.mp4",
            Some("Film".to_string()),
            None,
            "https://acct.blob.core.windows.net/pitches/talk.mp4?sig=x",
        );
        let mut doc = Document::new(pitch_to_fields(&pitch));
        doc.name = Some(format!("projects/p/databases/(default)/documents/pitches/{}", pitch.id));

        let back = document_to_pitch(&doc).unwrap();
        assert_eq!(back.id, pitch.id);
        assert_eq!(back.category.as_deref(), Some("Film"));
        assert_eq!(back.uploaded_at, pitch.uploaded_at);
    }
}
