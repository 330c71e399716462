//! Keychain-resolved credentials flowing into RemoteImage requests.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use oci_remote::{
    Digest, HelperOutput, HelperRunner, Keychain, Reference, RegistryError, RemoteImage,
};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StaticHelper {
    stdout: &'static str,
}

#[async_trait]
impl HelperRunner for StaticHelper {
    async fn get(&self, _program: &str, _host: &str) -> io::Result<HelperOutput> {
        Ok(HelperOutput {
            success: true,
            stdout: self.stdout.to_string(),
            stderr: String::new(),
        })
    }
}

fn write_config(content: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.json"), content).unwrap();
    dir
}

async fn mock_blob(mock_server: &MockServer, authorization: &str) -> Digest {
    let blob = b"blob payload".to_vec();
    let digest = Digest::sha256_of(&blob);

    Mock::given(method("GET"))
        .and(path(format!("/v2/app/blobs/{}", digest)))
        .and(header("authorization", authorization))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(blob))
        .expect(1)
        .mount(mock_server)
        .await;

    digest
}

#[tokio::test]
async fn test_inline_auth_reaches_registry() {
    let mock_server = MockServer::start().await;
    let host = mock_server.uri().trim_start_matches("http://").to_string();
    let digest = mock_blob(&mock_server, "Basic Zm9vOmJhcg==").await;

    let dir = write_config(&format!(
        r#"{{"auths": {{"{}": {{"auth": "Zm9vOmJhcg=="}}}}}}"#,
        host
    ));
    let auth = Keychain::new()
        .with_config_dir(dir.path())
        .resolve(&host)
        .await
        .unwrap();

    let image = RemoteImage::new(
        Reference::with_tag(host, "app", "latest"),
        auth,
        reqwest::Client::new(),
    );
    let bytes = image.blob(&digest).await.unwrap().into_bytes().await.unwrap();
    assert_eq!(&bytes[..], b"blob payload");
}

#[tokio::test]
async fn test_helper_identity_token_reaches_registry() {
    let mock_server = MockServer::start().await;
    let host = mock_server.uri().trim_start_matches("http://").to_string();
    let digest = mock_blob(&mock_server, "Bearer idt-from-helper").await;

    let dir = write_config(r#"{"credStore": "fake"}"#);
    let auth = Keychain::new()
        .with_config_dir(dir.path())
        .with_runner(Arc::new(StaticHelper {
            stdout: r#"{"Username": "<token>", "Secret": "idt-from-helper"}"#,
        }))
        .resolve(&host)
        .await
        .unwrap();

    assert_eq!(auth.helper().map(|h| h.helper.as_str()), Some("fake"));

    let image = RemoteImage::new(
        Reference::with_tag(host, "app", "latest"),
        auth,
        reqwest::Client::new(),
    );
    image.blob(&digest).await.unwrap().into_bytes().await.unwrap();
}

#[tokio::test]
async fn test_broken_helper_output_fails_resolution() {
    let dir = write_config(r#"{"credHelpers": {"test.io": "fake"}}"#);
    let result = Keychain::new()
        .with_config_dir(dir.path())
        .with_runner(Arc::new(StaticHelper { stdout: "garbage" }))
        .resolve("test.io")
        .await;

    assert!(matches!(result, Err(RegistryError::HelperInvocation { .. })));
}
