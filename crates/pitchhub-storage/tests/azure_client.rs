//! Blob REST client against a mock service.

use std::sync::Arc;

use pitchhub_storage::{AzureBlobClient, BlobWriter, Container, StorageConfig, StorageError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (MockServer, AzureBlobClient) {
    let server = MockServer::start().await;
    let config = StorageConfig::new("devstoreaccount1", "ZGV2a2V5LTAxMjM0NTY3ODk=")
        .with_endpoint(format!("{}/devstoreaccount1", server.uri()));
    let client = AzureBlobClient::new(&config).unwrap();
    (server, client)
}

#[tokio::test]
async fn test_put_blob_sends_block_blob_with_write_grant() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/devstoreaccount1/pitches/my%20deck.pdf"))
        .and(query_param("sp", "cw"))
        .and(query_param("sr", "b"))
        .and(query_param("spr", "https,http"))
        .and(header("x-ms-blob-type", "BlockBlob"))
        .and(header("x-ms-blob-content-type", "application/pdf"))
        .and(header(
            "x-ms-blob-content-disposition",
            "inline; filename=\"my deck.pdf\"",
        ))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let writer = BlobWriter::new(Arc::new(client.clone()), client.signer().clone());
    let url = writer
        .store(b"%PDF-1.7".to_vec(), "my deck.pdf", Container::Pitches)
        .await
        .unwrap();

    assert!(url.starts_with(&format!(
        "{}/devstoreaccount1/pitches/my%20deck.pdf?",
        server.uri()
    )));
    assert!(url.contains("&sp=r&"));
}

#[tokio::test]
async fn test_put_blob_surfaces_auth_failure() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403).set_body_string("AuthenticationFailed"))
        .mount(&server)
        .await;

    let writer = BlobWriter::new(Arc::new(client.clone()), client.signer().clone());
    let err = writer
        .store(b"x".to_vec(), "a.png", Container::Pitches)
        .await
        .unwrap_err();
    match err {
        StorageError::UploadFailed(msg) => {
            assert!(msg.contains("403"));
            assert!(msg.contains("AuthenticationFailed"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_returns_bytes_and_content_type() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devstoreaccount1/pitches/a.png"))
        .and(query_param("sp", "r"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(b"\x89PNG".to_vec()),
        )
        .mount(&server)
        .await;

    let url = client.signer().issue("a.png", Container::Pitches).unwrap();
    let blob = client.fetch(&url).await.unwrap();
    assert_eq!(blob.bytes, b"\x89PNG".to_vec());
    assert_eq!(blob.content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_fetch_missing_object() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = client.signer().issue("gone.pdf", Container::Pitches).unwrap();
    assert!(matches!(
        client.fetch(&url).await.unwrap_err(),
        StorageError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_fetch_keeps_upstream_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("AuthenticationFailed"))
        .mount(&server)
        .await;

    let url = client.signer().issue("a.png", Container::Pitches).unwrap();
    match client.fetch(&url).await.unwrap_err() {
        StorageError::Rejected { status, message } => {
            assert_eq!(status, 403);
            assert!(message.contains("AuthenticationFailed"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_connectivity_accepts_missing_probe() {
    let (server, client) = setup().await;

    Mock::given(method("HEAD"))
        .and(path("/devstoreaccount1/profiles/.readiness-probe"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    client.check_connectivity(Container::Profiles).await.unwrap();
}

#[tokio::test]
async fn test_connectivity_rejects_bad_key() {
    let (server, client) = setup().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    assert!(matches!(
        client.check_connectivity(Container::Pitches).await.unwrap_err(),
        StorageError::Unreachable(_)
    ));
}

#[tokio::test]
async fn test_missing_credential_makes_no_request() {
    let server = MockServer::start().await;
    let config = StorageConfig::new("devstoreaccount1", "")
        .with_endpoint(format!("{}/devstoreaccount1", server.uri()));

    let err = AzureBlobClient::new(&config).err().unwrap();
    assert!(err.is_config_error());

    let received = server.received_requests().await.unwrap_or_default();
    assert!(received.is_empty());
}
