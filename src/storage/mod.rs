//! Object store access: resolve a `gs://bucket/key` reference into a local file.
//!
//! The HTTP layer only learns whether the download worked; the cause of a
//! failure is logged here and nowhere else.

mod credentials;
mod gcs;

pub use credentials::{AuthorizedUser, ServiceAccount, TokenSource, CREDENTIALS_ENV};
pub use gcs::GcsClient;

use crate::error::FetchError;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use tracing::{error, info};

/// Scheme prefix every object reference must carry.
pub const GCS_SCHEME: &str = "gs://";

/// A parsed `gs://bucket/key` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    /// Split a reference into bucket (first segment) and key (the rest).
    pub fn parse(reference: &str) -> Result<Self, FetchError> {
        let invalid = |reason: &str| FetchError::InvalidReference {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        let rest = reference
            .strip_prefix(GCS_SCHEME)
            .ok_or_else(|| invalid("GCS path must start with gs://"))?;

        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(invalid("missing bucket name"));
        }
        if key.is_empty() {
            return Err(invalid("missing object key"));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", GCS_SCHEME, self.bucket, self.key)
    }
}

/// Read access to an object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write the full content of `object` to `destination`, replacing any
    /// existing content. Returns the number of bytes written.
    async fn download_to(&self, object: &ObjectRef, destination: &Path) -> Result<u64, FetchError>;
}

/// Download `source_reference` into `destination`.
///
/// Every failure, including a malformed reference, is logged and reported as
/// `false`.
pub async fn fetch(store: &dyn ObjectStore, source_reference: &str, destination: &Path) -> bool {
    let object = match ObjectRef::parse(source_reference) {
        Ok(object) => object,
        Err(e) => {
            error!("Error downloading from GCS: {e}");
            return false;
        }
    };

    match store.download_to(&object, destination).await {
        Ok(bytes) => {
            info!(
                "Successfully downloaded {object} ({bytes} bytes) to {}",
                destination.display()
            );
            true
        }
        Err(e) => {
            error!("Error downloading from GCS: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn parses_bucket_and_nested_key() {
        let r = ObjectRef::parse("gs://my-bucket/reports/2024/q1.pdf").unwrap();
        assert_eq!(r.bucket, "my-bucket");
        assert_eq!(r.key, "reports/2024/q1.pdf");
        assert_eq!(r.to_string(), "gs://my-bucket/reports/2024/q1.pdf");
    }

    #[test]
    fn rejects_other_schemes() {
        for bad in ["s3://bucket/a.pdf", "https://storage.googleapis.com/b/a.pdf", "/tmp/a.pdf", ""] {
            assert!(
                matches!(ObjectRef::parse(bad), Err(FetchError::InvalidReference { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_missing_bucket_or_key() {
        assert!(ObjectRef::parse("gs://bucket-only").is_err());
        assert!(ObjectRef::parse("gs://bucket/").is_err());
        assert!(ObjectRef::parse("gs:///key.pdf").is_err());
    }

    struct CountingStore {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ObjectStore for CountingStore {
        async fn download_to(&self, object: &ObjectRef, destination: &Path) -> Result<u64, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::ObjectNotFound {
                    bucket: object.bucket.clone(),
                    key: object.key.clone(),
                });
            }
            std::fs::write(destination, b"%PDF").map_err(|source| FetchError::Write {
                path: destination.to_path_buf(),
                source,
            })?;
            Ok(4)
        }
    }

    #[tokio::test]
    async fn fetch_rejects_bad_scheme_without_calling_store() {
        let store = CountingStore {
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let dir = tempfile::tempdir().unwrap();
        let ok = fetch(&store, "s3://bucket/a.pdf", &dir.path().join("a.pdf")).await;
        assert!(!ok);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_reports_store_failure_as_false() {
        let store = CountingStore {
            calls: AtomicUsize::new(0),
            fail: true,
        };
        let dir = tempfile::tempdir().unwrap();
        assert!(!fetch(&store, "gs://bucket/a.pdf", &dir.path().join("a.pdf")).await);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_writes_destination() {
        let store = CountingStore {
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.pdf");
        assert!(fetch(&store, "gs://bucket/a.pdf", &dest).await);
        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF");
    }
}
