//! Full poll, download and verification cycle against an HTTP server.

mod common;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use selfupdate::{HttpSource, Source, Version};
use tokio::io::AsyncReadExt;
use wiremock::MockServer;

const ARTIFACT_LEN: usize = 19_320_832;

#[tokio::test]
async fn downloads_and_authenticates_a_release() {
    let artifact: Vec<u8> = (0..ARTIFACT_LEN).map(|i| (i.wrapping_mul(31) % 256) as u8).collect();
    let signing_key = SigningKey::from_bytes(&[7u8; 32]);
    let verifying_key = signing_key.verifying_key();
    let unrelated_key = SigningKey::from_bytes(&[42u8; 32]).verifying_key();
    let published = signing_key.sign(&artifact);

    let server = MockServer::start().await;
    common::serve_object(&server, "/releases/app", artifact.clone()).await;
    common::serve_object(&server, "/releases/app.ed25519", published.to_bytes().to_vec()).await;

    let source = HttpSource::new(
        reqwest::Client::new(),
        &format!("{}/releases/app", server.uri()),
    );

    let last_seen = Version::from_unix(100, 0).unwrap();
    let remote = source.latest_version().await.unwrap();
    assert!(remote.is_newer_than(&last_seen));

    let signature = source.fetch_signature().await.unwrap();
    let download = source.fetch(Some(&last_seen)).await.unwrap();
    assert_eq!(download.content_length, Some(ARTIFACT_LEN as u64));

    let mut body = Vec::new();
    let mut reader = download.reader;
    reader.read_to_end(&mut body).await.unwrap();
    drop(reader);
    assert_eq!(body.len(), ARTIFACT_LEN);

    let signature = Signature::from_bytes(signature.as_bytes());
    assert!(verifying_key.verify(&body, &signature).is_ok());
    assert!(unrelated_key.verify(&body, &signature).is_err());
}

#[tokio::test]
async fn abandoned_downloads_release_the_connection() {
    let server = MockServer::start().await;
    common::serve_object(&server, "/app", vec![1u8; 1 << 20]).await;

    let source = HttpSource::new(reqwest::Client::new(), &format!("{}/app", server.uri()));
    let download = source.fetch(None).await.unwrap();

    let mut head = [0u8; 16];
    let mut reader = download.reader;
    reader.read_exact(&mut head).await.unwrap();
    drop(reader);

    // the client stays usable after a partial read
    assert!(!source.latest_version().await.unwrap().is_zero());
}
