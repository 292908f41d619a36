use std::{io::ErrorKind, marker::PhantomData, path::PathBuf, sync::Arc};
use tokio::{fs, sync::Mutex};
use tracing::{debug, info};

use configs::OnMissing;

use crate::errors::ServiceError;

/// Generic JSON file-backed ordered collection.
///
/// The file is the only source of truth: nothing is cached between calls.
/// Mutations hold a per-collection lock across read, transform and write, so
/// concurrent writers in this process are applied one after another. Reads
/// never take the lock; writes land through a temp file and `rename` so a
/// reader sees either the old or the new array.
pub struct JsonCollectionStore<T> {
    file_path: PathBuf,
    on_missing: OnMissing,
    write_lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCollectionStore<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    /// Initialize the store from a path. The file itself is only touched on
    /// first use, according to `on_missing`.
    pub async fn new<P: Into<PathBuf>>(path: P, on_missing: OnMissing) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.ok();
            }
        }

        Ok(Arc::new(Self { file_path, on_missing, write_lock: Mutex::new(()), _marker: PhantomData }))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.file_path
    }

    /// Read the whole collection.
    pub async fn load(&self) -> Result<Vec<T>, ServiceError> {
        if let Some(items) = self.read_snapshot().await? {
            return Ok(items);
        }
        if self.on_missing == OnMissing::Fail {
            return Err(self.missing_error());
        }
        // Re-check under the lock so a concurrent first write is never clobbered.
        let _guard = self.write_lock.lock().await;
        match self.read_snapshot().await? {
            Some(items) => Ok(items),
            None => {
                self.save(&[]).await?;
                info!(path = %self.file_path.display(), "initialized empty collection");
                Ok(Vec::new())
            }
        }
    }

    /// Apply a mutation to the collection and persist it.
    ///
    /// `f` sees the freshly read array; when it returns an error nothing is
    /// written and the error is handed back unchanged.
    pub async fn mutate<F, R>(&self, f: F) -> Result<R, ServiceError>
    where
        F: FnOnce(&mut Vec<T>) -> Result<R, ServiceError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut items = match self.read_snapshot().await? {
            Some(items) => items,
            None if self.on_missing == OnMissing::InitializeEmpty => Vec::new(),
            None => return Err(self.missing_error()),
        };
        let out = f(&mut items)?;
        self.save(&items).await?;
        Ok(out)
    }

    async fn read_snapshot(&self) -> Result<Option<Vec<T>>, ServiceError> {
        let bytes = match fs::read(&self.file_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ServiceError::Storage(format!("cannot read {}: {}", self.file_path.display(), e)))
            }
        };
        let items: Vec<T> = serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::Storage(format!("cannot parse {}: {}", self.file_path.display(), e)))?;
        debug!(path = %self.file_path.display(), count = items.len(), "collection read");
        Ok(Some(items))
    }

    async fn save(&self, items: &[T]) -> Result<(), ServiceError> {
        let data = serde_json::to_vec_pretty(items).map_err(|e| ServiceError::Storage(e.to_string()))?;
        let mut tmp = self.file_path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, data)
            .await
            .map_err(|e| ServiceError::Storage(format!("cannot write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.file_path)
            .await
            .map_err(|e| ServiceError::Storage(format!("cannot replace {}: {}", self.file_path.display(), e)))?;
        Ok(())
    }

    fn missing_error(&self) -> ServiceError {
        ServiceError::Storage(format!("{} does not exist", self.file_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("json_collection_{}_{}.json", tag, uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn missing_file_fails_when_configured_to() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("fail");
        let store = JsonCollectionStore::<String>::new(&tmp, OnMissing::Fail).await?;
        assert!(matches!(store.load().await, Err(ServiceError::Storage(_))));
        assert!(matches!(store.mutate(|v| { v.push("a".into()); Ok(()) }).await, Err(ServiceError::Storage(_))));
        assert!(tokio::fs::metadata(&tmp).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_is_created_empty_on_first_read() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("init");
        let store = JsonCollectionStore::<String>::new(&tmp, OnMissing::InitializeEmpty).await?;
        assert!(store.load().await?.is_empty());
        let raw = tokio::fs::read_to_string(&tmp).await?;
        assert_eq!(raw.trim(), "[]");
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn unparseable_file_is_a_storage_error() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("garbage");
        tokio::fs::write(&tmp, b"{not json").await?;
        let store = JsonCollectionStore::<String>::new(&tmp, OnMissing::InitializeEmpty).await?;
        assert!(matches!(store.load().await, Err(ServiceError::Storage(_))));
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn failed_mutation_writes_nothing() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("rollback");
        let store = JsonCollectionStore::<String>::new(&tmp, OnMissing::InitializeEmpty).await?;
        store.mutate(|v| { v.push("a".into()); Ok(()) }).await?;
        let res = store
            .mutate(|v| {
                v.clear();
                Err::<(), _>(ServiceError::Validation("nope".into()))
            })
            .await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));
        assert_eq!(store.load().await?, vec!["a".to_string()]);
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_mutations_do_not_lose_updates() -> Result<(), anyhow::Error> {
        let tmp = tmp_path("race");
        let store = JsonCollectionStore::<u32>::new(&tmp, OnMissing::InitializeEmpty).await?;
        let mut handles = Vec::new();
        for i in 0..20u32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.mutate(|v| { v.push(i); Ok(()) }).await }));
        }
        for h in handles {
            h.await??;
        }
        let mut all = store.load().await?;
        all.sort_unstable();
        assert_eq!(all, (0..20).collect::<Vec<_>>());
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
