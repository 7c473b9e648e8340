//! Credential discovery and token exchange for the GCS client.
//!
//! Lives in its own test binary because one test sets
//! `GOOGLE_APPLICATION_CREDENTIALS` for the whole process.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use pdf2md_service::storage::CREDENTIALS_ENV;
use pdf2md_service::{GcsClient, ObjectRef, ObjectStore, StorageConfig};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRIVATE_KEY: &str = include_str!("fixtures/test-service-account.pem");
const PUBLIC_KEY: &str = include_str!("fixtures/test-service-account.pub.pem");

fn write_key_file(dir: &Path, value: Value) -> PathBuf {
    let path = dir.join("key.json");
    std::fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();
    path
}

fn storage_config(server: &MockServer, credentials_file: Option<PathBuf>) -> StorageConfig {
    StorageConfig {
        endpoint: server.uri(),
        access_token: None,
        anonymous: false,
        credentials_file,
    }
}

async fn mount_object(server: &MockServer, token: &str, downloads: u64) {
    Mock::given(method("GET"))
        .and(path("/storage/v1/b/docs/o/a.pdf"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()))
        .expect(downloads)
        .mount(server)
        .await;
}

/// Pull the `assertion` field out of a form-encoded token request.
fn assertion_from(body: &[u8]) -> String {
    std::str::from_utf8(body)
        .unwrap()
        .split('&')
        .find_map(|pair| pair.strip_prefix("assertion="))
        .expect("token request carries an assertion")
        .to_string()
}

#[tokio::test]
async fn service_account_from_env_var_signs_exchanges_and_caches() {
    let server = MockServer::start().await;
    let token_uri = format!("{}/token", server.uri());
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "sa-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_object(&server, "sa-token", 2).await;

    let dir = tempfile::tempdir().unwrap();
    let key = write_key_file(
        dir.path(),
        json!({
            "type": "service_account",
            "project_id": "demo",
            "private_key_id": "key-1",
            "private_key": PRIVATE_KEY,
            "client_email": "converter@demo.iam.gserviceaccount.com",
            "token_uri": token_uri
        }),
    );
    std::env::set_var(CREDENTIALS_ENV, &key);

    let client = GcsClient::new(&storage_config(&server, None)).unwrap();
    let object = ObjectRef::parse("gs://docs/a.pdf").unwrap();
    for name in ["one.pdf", "two.pdf"] {
        let written = client.download_to(&object, &dir.path().join(name)).await.unwrap();
        assert_eq!(written, 4);
    }
    std::env::remove_var(CREDENTIALS_ENV);

    let requests = server.received_requests().await.unwrap();
    let exchange = requests
        .iter()
        .find(|r| r.url.path() == "/token")
        .expect("token exchange happened");
    let jwt = assertion_from(&exchange.body);

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[token_uri.as_str()]);
    let decoded = jsonwebtoken::decode::<Value>(
        &jwt,
        &DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap(),
        &validation,
    )
    .expect("assertion verifies against the account's public key");
    assert_eq!(decoded.header.kid.as_deref(), Some("key-1"));
    assert_eq!(decoded.claims["iss"], "converter@demo.iam.gserviceaccount.com");
    assert_eq!(
        decoded.claims["scope"],
        "https://www.googleapis.com/auth/devstorage.read_only"
    );
}

#[tokio::test]
async fn gcloud_user_credentials_exchange_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=1%2F%2Frefresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "user-token",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_object(&server, "user-token", 1).await;

    let dir = tempfile::tempdir().unwrap();
    let key = write_key_file(
        dir.path(),
        json!({
            "type": "authorized_user",
            "client_id": "cid.apps.googleusercontent.com",
            "client_secret": "shh",
            "refresh_token": "1//refresh",
            "token_uri": format!("{}/oauth/token", server.uri())
        }),
    );

    let client = GcsClient::new(&storage_config(&server, Some(key))).unwrap();
    client
        .download_to(&ObjectRef::parse("gs://docs/a.pdf").unwrap(), &dir.path().join("a.pdf"))
        .await
        .unwrap();
}

#[tokio::test]
async fn rejected_token_exchange_is_a_credentials_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;
    mount_object(&server, "never", 0).await;

    let dir = tempfile::tempdir().unwrap();
    let key = write_key_file(
        dir.path(),
        json!({
            "type": "service_account",
            "private_key": PRIVATE_KEY,
            "client_email": "converter@demo.iam.gserviceaccount.com",
            "token_uri": format!("{}/token", server.uri())
        }),
    );

    let client = GcsClient::new(&storage_config(&server, Some(key))).unwrap();
    let err = client
        .download_to(&ObjectRef::parse("gs://docs/a.pdf").unwrap(), &dir.path().join("a.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, pdf2md_service::FetchError::Credentials(_)), "{err:?}");
}
