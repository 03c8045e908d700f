//! Capability URL behavior against an in-memory object store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use pitchhub_storage::{
    BlobBackend, BlobHeaders, BlobWriter, Container, SasSigner, StorageConfig, StorageError,
    StorageResult,
};

#[derive(Default)]
struct MemoryStore {
    objects: Mutex<HashMap<(Container, String), (Vec<u8>, BlobHeaders)>>,
    writes: Mutex<HashMap<String, usize>>,
}

impl MemoryStore {
    fn write_count(&self, key: &str) -> usize {
        self.writes.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    /// Resolve a capability URL back to the stored bytes, ignoring the signature.
    fn get(&self, signer: &SasSigner, url: &str) -> Option<Vec<u8>> {
        let path = url.split('?').next()?;
        let rest = path.strip_prefix(signer.endpoint())?.trim_start_matches('/');
        let (container_name, key) = rest.split_once('/')?;
        let container = [Container::Pitches, Container::Profiles]
            .into_iter()
            .find(|c| signer.container_name(*c) == container_name)?;
        let key = urlencoding::decode(key).ok()?.into_owned();
        self.objects
            .lock()
            .unwrap()
            .get(&(container, key))
            .map(|(bytes, _)| bytes.clone())
    }
}

#[async_trait]
impl BlobBackend for MemoryStore {
    async fn put_blob(
        &self,
        container: Container,
        key: &str,
        data: Vec<u8>,
        headers: &BlobHeaders,
    ) -> StorageResult<()> {
        self.objects
            .lock()
            .unwrap()
            .insert((container, key.to_string()), (data, headers.clone()));
        *self.writes.lock().unwrap().entry(key.to_string()).or_default() += 1;
        Ok(())
    }
}

struct FailingStore;

#[async_trait]
impl BlobBackend for FailingStore {
    async fn put_blob(
        &self,
        _container: Container,
        _key: &str,
        _data: Vec<u8>,
        _headers: &BlobHeaders,
    ) -> StorageResult<()> {
        Err(StorageError::upload_failed("HTTP 403: AuthenticationFailed"))
    }
}

fn signer() -> SasSigner {
    SasSigner::new(&StorageConfig::new("pitchacct", "c2hhcmVkLWFjY291bnQta2V5")).unwrap()
}

fn setup() -> (Arc<MemoryStore>, BlobWriter) {
    let store = Arc::new(MemoryStore::default());
    let writer = BlobWriter::new(store.clone(), signer());
    (store, writer)
}

fn unsigned(url: &str) -> &str {
    url.split('?').next().unwrap()
}

#[tokio::test]
async fn test_store_then_issue_share_unsigned_path() {
    let (_store, writer) = setup();

    let stored = writer
        .store(b"png bytes".to_vec(), "a.png", Container::Pitches)
        .await
        .unwrap();
    let minted = writer.signer().issue("a.png", Container::Pitches).unwrap();

    assert_eq!(unsigned(&stored), unsigned(&minted));
    assert_eq!(
        unsigned(&stored),
        "https://pitchacct.blob.core.windows.net/pitches/a.png"
    );
}

#[tokio::test]
async fn test_issue_never_writes() {
    let (store, writer) = setup();
    writer
        .store(b"v1".to_vec(), "a.png", Container::Pitches)
        .await
        .unwrap();
    assert_eq!(store.write_count("a.png"), 1);

    let now = Utc::now();
    for i in 0..25 {
        writer
            .signer()
            .issue_at("a.png", Container::Pitches, now + Duration::seconds(i))
            .unwrap();
    }
    assert_eq!(store.write_count("a.png"), 1);
}

#[tokio::test]
async fn test_overwrite_visible_through_earlier_url() {
    let (store, writer) = setup();

    let first = writer
        .store(b"old".to_vec(), "a.png", Container::Pitches)
        .await
        .unwrap();
    writer
        .store(b"new".to_vec(), "a.png", Container::Pitches)
        .await
        .unwrap();

    assert_eq!(store.get(writer.signer(), &first).unwrap(), b"new".to_vec());
    assert_eq!(store.write_count("a.png"), 2);
}

#[tokio::test]
async fn test_store_sets_inline_headers() {
    let (store, writer) = setup();
    writer
        .store(b"%PDF".to_vec(), "Deck.PDF", Container::Pitches)
        .await
        .unwrap();

    let objects = store.objects.lock().unwrap();
    let (_, headers) = objects
        .get(&(Container::Pitches, "Deck.PDF".to_string()))
        .unwrap();
    assert_eq!(headers.content_type, "application/pdf");
    assert!(headers.content_disposition.starts_with("inline;"));
}

#[tokio::test]
async fn test_containers_are_separate_namespaces() {
    let (store, writer) = setup();
    let pitch = writer
        .store(b"pitch".to_vec(), "a.png", Container::Pitches)
        .await
        .unwrap();
    let photo = writer
        .store(b"photo".to_vec(), "a.png", Container::Profiles)
        .await
        .unwrap();

    assert_ne!(unsigned(&pitch), unsigned(&photo));
    assert_eq!(store.get(writer.signer(), &pitch).unwrap(), b"pitch".to_vec());
    assert_eq!(store.get(writer.signer(), &photo).unwrap(), b"photo".to_vec());
}

#[tokio::test]
async fn test_backend_error_yields_no_url() {
    let writer = BlobWriter::new(Arc::new(FailingStore), signer());
    let err = writer
        .store(b"x".to_vec(), "a.png", Container::Pitches)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::UploadFailed(msg) if msg.contains("403")));
}

#[tokio::test]
async fn test_invalid_key_is_not_written() {
    let (store, writer) = setup();
    let err = writer
        .store(b"x".to_vec(), "../escape.png", Container::Pitches)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidKey(_)));
    assert!(store.objects.lock().unwrap().is_empty());
}
