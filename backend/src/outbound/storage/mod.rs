//! `ObjectStorage` adapter backed by the `object_store` crate.
//!
//! Production uses an S3-compatible bucket (AWS, R2, MinIO, B2); tests and
//! credential-less development runs use the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use tracing::debug;

use crate::domain::ports::{DeleteSummary, KeyListing, ObjectStorage, ObjectStorageError};

const DELETE_CONCURRENCY: usize = 8;

/// Connection details for an S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Clone)]
pub struct ObjectStoreStorage {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreStorage {
    /// Connect to an S3-compatible bucket.
    pub fn s3(settings: &S3Settings) -> Result<Self, ObjectStorageError> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&settings.bucket)
            .with_region(&settings.region)
            .with_access_key_id(&settings.access_key_id)
            .with_secret_access_key(&settings.secret_access_key);
        if let Some(endpoint) = &settings.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_virtual_hosted_style_request(false);
            if endpoint.starts_with("http://") {
                builder = builder.with_allow_http(true);
            }
        }
        let store = builder
            .build()
            .map_err(|err| ObjectStorageError::configuration(err.to_string()))?;
        Ok(Self::from_store(Arc::new(store)))
    }

    /// Process-local store; contents vanish on drop.
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemory::new()))
    }

    pub fn from_store(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ObjectStorage for ObjectStoreStorage {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), ObjectStorageError> {
        self.store
            .put(&ObjectPath::from(key), PutPayload::from(bytes))
            .await
            .map_err(|err| ObjectStorageError::write(key, err.to_string()))?;
        Ok(())
    }

    async fn list(&self, prefix: &str, max_keys: usize) -> Result<KeyListing, ObjectStorageError> {
        let path = (!prefix.is_empty()).then(|| ObjectPath::from(prefix));
        let mut entries = self.store.list(path.as_ref());
        let mut listing = KeyListing::default();
        while let Some(entry) = entries.next().await {
            let meta = entry.map_err(|err| ObjectStorageError::list(prefix, err.to_string()))?;
            if listing.keys.len() == max_keys {
                listing.truncated = true;
                break;
            }
            listing.keys.push(meta.location.to_string());
        }
        debug!(
            prefix = %prefix,
            keys = listing.keys.len(),
            truncated = listing.truncated,
            "listed objects"
        );
        Ok(listing)
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStorageError> {
        let read = async {
            self.store
                .get(&ObjectPath::from(key))
                .await?
                .bytes()
                .await
        };
        read.await.map_err(|err| match err {
            object_store::Error::NotFound { .. } => ObjectStorageError::not_found(key),
            other => ObjectStorageError::read(key, other.to_string()),
        })
    }

    async fn delete_many(&self, keys: &[String]) -> Result<DeleteSummary, ObjectStorageError> {
        let results: Vec<(String, object_store::Result<()>)> = stream::iter(keys.iter().cloned())
            .map(|key| {
                let store = Arc::clone(&self.store);
                async move {
                    let result = store.delete(&ObjectPath::from(key.as_str())).await;
                    (key, result)
                }
            })
            .buffer_unordered(DELETE_CONCURRENCY)
            .collect()
            .await;

        let mut summary = DeleteSummary::default();
        for (key, result) in results {
            match result {
                Ok(()) => summary.deleted += 1,
                Err(err) => {
                    debug!(key = %key, error = %err, "delete failed");
                    summary.failed.push(key);
                }
            }
        }
        Ok(summary)
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), ObjectStorageError> {
        self.store
            .copy(&ObjectPath::from(from), &ObjectPath::from(to))
            .await
            .map_err(|err| ObjectStorageError::copy(from, to, err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn storage() -> ObjectStoreStorage {
        ObjectStoreStorage::in_memory()
    }

    async fn seed(storage: &ObjectStoreStorage, keys: &[&str]) {
        for key in keys {
            storage
                .put(key, Bytes::from(key.to_string()))
                .await
                .expect("put succeeds");
        }
    }

    #[rstest]
    #[tokio::test]
    async fn put_then_get_returns_bytes(storage: ObjectStoreStorage) {
        let key = "year=2025/month=01/day=01/user=a/x.parquet";
        storage
            .put(key, Bytes::from_static(b"payload"))
            .await
            .expect("put succeeds");
        let bytes = storage.get(key).await.expect("get succeeds");
        assert_eq!(bytes.as_ref(), b"payload");
    }

    #[rstest]
    #[tokio::test]
    async fn get_missing_is_not_found(storage: ObjectStoreStorage) {
        let err = storage.get("nope.parquet").await.expect_err("missing");
        assert_eq!(err, ObjectStorageError::not_found("nope.parquet"));
    }

    #[rstest]
    #[tokio::test]
    async fn list_is_segment_scoped_and_capped(storage: ObjectStoreStorage) {
        seed(
            &storage,
            &[
                "year=2025/month=01/day=01/user=a/1.parquet",
                "year=2025/month=01/day=01/user=b/2.parquet",
                "year=2025/month=01/day=01/user=c/3.parquet",
                "year=2025/month=01/day=10/user=a/4.parquet",
            ],
        )
        .await;

        let all_day = storage
            .list("year=2025/month=01/day=01/", 10)
            .await
            .expect("list succeeds");
        assert_eq!(all_day.keys.len(), 3);
        assert!(!all_day.truncated);

        let capped = storage
            .list("year=2025/month=01/day=01/", 2)
            .await
            .expect("list succeeds");
        assert_eq!(capped.keys.len(), 2);
        assert!(capped.truncated);

        let exact = storage.list("", 4).await.expect("list succeeds");
        assert_eq!(exact.keys.len(), 4);
        assert!(!exact.truncated);
    }

    #[rstest]
    #[tokio::test]
    async fn copy_preserves_bytes_and_delete_removes(storage: ObjectStoreStorage) {
        let from = "year=2025/month=01/day=01/user=a/1.parquet";
        let to = "year=2025/month=01/day=01/user=anonymous/1.parquet";
        seed(&storage, &[from]).await;

        storage.copy(from, to).await.expect("copy succeeds");
        let summary = storage
            .delete_many(&[from.to_owned()])
            .await
            .expect("delete succeeds");

        assert_eq!(summary.deleted, 1);
        assert!(summary.failed.is_empty());
        assert_eq!(storage.get(to).await.expect("copied").as_ref(), from.as_bytes());
        assert!(storage.get(from).await.is_err());
    }
}
