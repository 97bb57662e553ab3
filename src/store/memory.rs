use crate::error::Result;
use crate::store::ObjectStore;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// In-process object store, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects
            .read()
            .await
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store() -> Result<()> {
        let store = MemoryObjectStore::new();
        assert!(store.is_empty().await);

        store.put("2010/a.parquet", vec![1]).await?;
        store.put("2010/b.parquet", vec![2]).await?;
        store.put("2011/a.parquet", vec![3]).await?;
        store.put("annual_update_log.csv", vec![4]).await?;

        assert_eq!(store.list("2010/").await?, vec!["2010/a.parquet", "2010/b.parquet"]);
        assert_eq!(store.get("2011/a.parquet").await?, Some(vec![3]));

        store.delete("2011/a.parquet").await?;
        store.delete("missing").await?;
        assert_eq!(store.len().await, 3);
        Ok(())
    }
}
