//! Google Cloud Storage client over the JSON API.
//!
//! Objects are streamed with `GET {endpoint}/storage/v1/b/{bucket}/o/{key}?alt=media`
//! straight into the destination file, so large PDFs never sit in memory.
//! Bearer tokens come from [`super::credentials`].

use super::credentials::{TokenCache, TokenSource};
use super::{ObjectRef, ObjectStore};
use crate::config::StorageConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// [`ObjectStore`] backed by the Cloud Storage JSON API.
#[derive(Clone)]
pub struct GcsClient {
    http: reqwest::Client,
    endpoint: String,
    tokens: Arc<TokenCache>,
}

impl GcsClient {
    pub fn new(config: &StorageConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pdf2md-service/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            tokens: Arc::new(TokenCache::new(TokenSource::from_config(config)?)),
        })
    }

    /// Replace the token source, e.g. to point at a stub metadata server.
    pub fn with_token_source(mut self, tokens: TokenSource) -> Self {
        self.tokens = Arc::new(TokenCache::new(tokens));
        self
    }

    /// Media download URL for `object`. The key is percent-encoded as a
    /// single path segment, slashes included.
    pub fn media_url(&self, object: &ObjectRef) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}?alt=media",
            self.endpoint,
            urlencoding::encode(&object.bucket),
            urlencoding::encode(&object.key)
        )
    }
}

#[async_trait]
impl ObjectStore for GcsClient {
    async fn download_to(&self, object: &ObjectRef, destination: &Path) -> Result<u64, FetchError> {
        let url = self.media_url(object);
        info!("Downloading {object}");

        let mut request = self.http.get(&url);
        if let Some(token) = self.tokens.bearer(&self.http).await? {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let bucket = object.bucket.clone();
            let key = object.key.clone();
            return Err(match status {
                StatusCode::NOT_FOUND => FetchError::ObjectNotFound { bucket, key },
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::AccessDenied {
                    bucket,
                    key,
                    status: status.as_u16(),
                },
                _ => FetchError::UnexpectedStatus {
                    bucket,
                    key,
                    status: status.as_u16(),
                },
            });
        }

        let write_err = |source: std::io::Error| FetchError::Write {
            path: destination.to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::create(destination).await.map_err(write_err)?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::Network(e.to_string()))?;
            file.write_all(&chunk).await.map_err(write_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(write_err)?;

        debug!("Wrote {written} bytes to {}", destination.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> GcsClient {
        let config = StorageConfig {
            endpoint: endpoint.to_string(),
            access_token: None,
            anonymous: true,
            credentials_file: None,
        };
        GcsClient::new(&config).unwrap()
    }

    #[test]
    fn media_url_encodes_key_as_one_segment() {
        let c = client("https://storage.googleapis.com/");
        let object = ObjectRef::parse("gs://docs/reports/q1 final.pdf").unwrap();
        assert_eq!(
            c.media_url(&object),
            "https://storage.googleapis.com/storage/v1/b/docs/o/reports%2Fq1%20final.pdf?alt=media"
        );
    }
}
