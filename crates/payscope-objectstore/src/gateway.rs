use std::sync::Arc;

use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use payscope_core::error::PayScopeError;
use tracing::instrument;

/// Size and entity tag of a stored object, as returned by `head`.
#[derive(Debug, Clone)]
pub struct ObjectHead {
    pub size: usize,
    pub etag: Option<String>,
}

fn to_dependency_error(object_key: &str, source: object_store::Error) -> PayScopeError {
    PayScopeError::DependencyUnavailable {
        dependency: "object_store".to_string(),
        detail: format!("{object_key}: {source}"),
    }
}

/// Gateway over the raw/extracted/normalized object namespace. Keys are
/// deterministic (see `keys.rs`); server-side encryption is mandatory and
/// validated once at construction rather than per-call.
pub struct ObjectStoreGateway {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreGateway {
    /// Wraps an already-configured `ObjectStore` backend. `sse_enabled` must
    /// reflect that the backing bucket enforces server-side encryption;
    /// callers are expected to have confirmed this against the bucket
    /// policy before construction. A bucket without SSE fails startup
    /// (spec.md §4.1), so this constructor itself returns an error instead
    /// of silently degrading.
    pub fn new(store: Arc<dyn ObjectStore>, sse_enabled: bool) -> Result<Self, PayScopeError> {
        if !sse_enabled {
            return Err(PayScopeError::Configuration {
                detail: "object store bucket does not enforce server-side encryption".to_string(),
            });
        }
        Ok(Self { store })
    }

    #[instrument(skip(self, bytes), fields(object_key = %object_key, len = bytes.len()))]
    pub async fn put(&self, object_key: &str, bytes: Vec<u8>) -> Result<String, PayScopeError> {
        let path = ObjectPath::from(object_key);
        let payload = PutPayload::from(bytes);
        let result = self
            .store
            .put(&path, payload)
            .await
            .map_err(|e| to_dependency_error(object_key, e))?;
        Ok(result.e_tag.unwrap_or_default())
    }

    #[instrument(skip(self), fields(object_key = %object_key))]
    pub async fn get(&self, object_key: &str) -> Result<Bytes, PayScopeError> {
        let path = ObjectPath::from(object_key);
        let result = self
            .store
            .get(&path)
            .await
            .map_err(|e| to_dependency_error(object_key, e))?;
        result
            .bytes()
            .await
            .map_err(|e| to_dependency_error(object_key, e))
    }

    /// Removes an object, for the retention sweep (spec.md §3.2). A
    /// missing key is not an error: the sweep is idempotent across
    /// restarts, so a key deleted by a previous run is simply skipped.
    #[instrument(skip(self), fields(object_key = %object_key))]
    pub async fn delete(&self, object_key: &str) -> Result<(), PayScopeError> {
        let path = ObjectPath::from(object_key);
        match self.store.delete(&path).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(to_dependency_error(object_key, e)),
        }
    }

    #[instrument(skip(self), fields(object_key = %object_key))]
    pub async fn head(&self, object_key: &str) -> Result<ObjectHead, PayScopeError> {
        let path = ObjectPath::from(object_key);
        let meta = self
            .store
            .head(&path)
            .await
            .map_err(|e| to_dependency_error(object_key, e))?;
        Ok(ObjectHead {
            size: meta.size,
            etag: meta.e_tag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    #[test]
    fn rejects_construction_without_sse() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let err = ObjectStoreGateway::new(store, false).unwrap_err();
        assert_eq!(err.error_class(), "configuration_error");
    }

    #[tokio::test]
    async fn put_then_get_round_trips_bytes() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let gateway = ObjectStoreGateway::new(store, true).unwrap();
        let key = "raw/00000000-0000-0000-0000-000000000000/00000000-0000-0000-0000-000000000000/report.csv";
        gateway.put(key, b"a,b,c\n1,2,3\n".to_vec()).await.unwrap();
        let fetched = gateway.get(key).await.unwrap();
        assert_eq!(&fetched[..], b"a,b,c\n1,2,3\n");
        let head = gateway.head(key).await.unwrap();
        assert_eq!(head.size, 12);
    }

    #[tokio::test]
    async fn get_missing_key_is_dependency_error() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        let gateway = ObjectStoreGateway::new(store, true).unwrap();
        let err = gateway.get("raw/missing").await.unwrap_err();
        assert_eq!(err.error_class(), "dependency_unavailable");
    }

    /// Same round-trip as `put_then_get_round_trips_bytes`, against a real
    /// disk-backed store rather than `InMemory`, isolated in a fresh temp
    /// directory per test run so repeated runs never collide.
    #[tokio::test]
    async fn put_then_get_round_trips_bytes_on_local_disk() {
        let dir = tempfile::tempdir().unwrap();
        let local = object_store::local::LocalFileSystem::new_with_prefix(dir.path()).unwrap();
        let store: Arc<dyn ObjectStore> = Arc::new(local);
        let gateway = ObjectStoreGateway::new(store, true).unwrap();
        let key = "extracted/00000000-0000-0000-0000-000000000000/intermediate.json";
        gateway.put(key, br#"{"elements":[]}"#.to_vec()).await.unwrap();
        let fetched = gateway.get(key).await.unwrap();
        assert_eq!(&fetched[..], br#"{"elements":[]}"#);

        gateway.delete(key).await.unwrap();
        let err = gateway.get(key).await.unwrap_err();
        assert_eq!(err.error_class(), "dependency_unavailable");

        // Deleting an already-deleted key is still success (spec.md §3.2
        // retention sweep idempotence), not a dependency error.
        gateway.delete(key).await.unwrap();
    }
}
