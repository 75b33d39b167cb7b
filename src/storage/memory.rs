use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{CloudStorage, ObjectInfo, StorageError, StorageProvider, StorageResult};

/// In-process object store keyed by `(container, key)`
///
/// Used by tests and by callers that stage manifests locally.
pub struct MemoryStorage {
    provider: StorageProvider,
    objects: RwLock<BTreeMap<(String, String), Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Insert an object without going through the async API
    pub fn insert(&self, container: &str, key: &str, body: impl Into<Vec<u8>>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert((container.to_string(), key.to_string()), body.into());
        }
    }

    pub fn contains(&self, container: &str, key: &str) -> bool {
        self.objects
            .read()
            .map(|objects| objects.contains_key(&(container.to_string(), key.to_string())))
            .unwrap_or(false)
    }

    fn poisoned() -> StorageError {
        StorageError::Backend("memory storage lock poisoned".to_string())
    }
}

#[async_trait]
impl CloudStorage for MemoryStorage {
    fn provider(&self) -> StorageProvider {
        self.provider
    }

    async fn list_objects(&self, container: &str, prefix: &str) -> StorageResult<Vec<ObjectInfo>> {
        let objects = self.objects.read().map_err(|_| Self::poisoned())?;
        Ok(objects
            .iter()
            .filter(|((c, key), _)| c == container && key.starts_with(prefix))
            .map(|((_, key), body)| ObjectInfo {
                key: key.clone(),
                size: body.len() as u64,
            })
            .collect())
    }

    async fn get_object(&self, container: &str, key: &str) -> StorageResult<Vec<u8>> {
        let objects = self.objects.read().map_err(|_| Self::poisoned())?;
        objects
            .get(&(container.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", container, key)))
    }

    async fn put_object(&self, container: &str, key: &str, body: Vec<u8>) -> StorageResult<()> {
        let mut objects = self.objects.write().map_err(|_| Self::poisoned())?;
        objects.insert((container.to_string(), key.to_string()), body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_filters_by_container_and_prefix() {
        let storage = MemoryStorage::new(StorageProvider::S3);
        storage.insert("b", "exp/part_0.csv", "a");
        storage.insert("b", "exp/part_1.csv", "bb");
        storage.insert("b", "other/x.csv", "c");
        storage.insert("c", "exp/part_2.csv", "d");

        let listed = storage.list_objects("b", "exp/").await.unwrap();
        let keys: Vec<_> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["exp/part_0.csv", "exp/part_1.csv"]);
        assert_eq!(listed[1].size, 2);
    }

    #[tokio::test]
    async fn test_get_missing_object() {
        let storage = MemoryStorage::new(StorageProvider::Gcs);
        assert!(matches!(
            storage.get_object("b", "missing").await,
            Err(StorageError::NotFound(_))
        ));
        storage.put_object("b", "k", b"v".to_vec()).await.unwrap();
        assert!(storage.contains("b", "k"));
    }
}
