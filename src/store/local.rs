use crate::error::{Result, SyncError};
use crate::store::ObjectStore;
use async_trait::async_trait;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

/// Object store backed by a directory tree; keys map to relative paths.
///
/// Writes go to a temporary file in the target directory and are renamed
/// into place, so a reader never sees a partially written object.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(SyncError::store(key, "key is not a relative path"));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::store(key, e)),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        let owned_key = key.to_string();

        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await?
            .map_err(|e| SyncError::store(owned_key, e))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::store(key, e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let root = self.root.clone();
        let owned_prefix = prefix.to_string();

        let mut keys = tokio::task::spawn_blocking(move || {
            let mut keys = Vec::new();
            collect_keys(&root, &root, &mut keys)?;
            Ok::<_, std::io::Error>(keys)
        })
        .await?
        .map_err(|e| SyncError::store(prefix, e))?;

        keys.retain(|k| k.starts_with(&owned_prefix));
        keys.sort();
        Ok(keys)
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "key has no parent"))?;
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn collect_keys(root: &Path, dir: &Path, keys: &mut Vec<String>) -> std::io::Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_keys(root, &path, keys)?;
            continue;
        }

        // In-flight temp files from `write_atomically`
        if entry.file_name().to_string_lossy().starts_with(".tmp") {
            continue;
        }

        if let Ok(relative) = path.strip_prefix(root) {
            let key: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            keys.push(key.join("/"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_delete() -> Result<()> {
        let dir = TempDir::new()?;
        let store = LocalObjectStore::new(dir.path());

        assert_eq!(store.get("2010/010010-99999.parquet").await?, None);

        store.put("2010/010010-99999.parquet", b"one".to_vec()).await?;
        store.put("2010/010010-99999.parquet", b"two".to_vec()).await?;
        assert_eq!(
            store.get("2010/010010-99999.parquet").await?,
            Some(b"two".to_vec())
        );

        store.delete("2010/010010-99999.parquet").await?;
        store.delete("2010/010010-99999.parquet").await?;
        assert_eq!(store.get("2010/010010-99999.parquet").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_by_prefix() -> Result<()> {
        let dir = TempDir::new()?;
        let store = LocalObjectStore::new(dir.path().join("mirror"));

        assert!(store.list("").await?.is_empty());

        store.put("isd-inventory.csv", Vec::new()).await?;
        store.put("2011/010020-99999.parquet", Vec::new()).await?;
        store.put("2010/010010-99999.parquet", Vec::new()).await?;
        store.put("2010/010020-99999.parquet", Vec::new()).await?;

        assert_eq!(
            store.list("2010/").await?,
            vec!["2010/010010-99999.parquet", "2010/010020-99999.parquet"]
        );
        assert_eq!(store.list("").await?.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let store = LocalObjectStore::new("unused");
        assert!(matches!(
            store.get("../secret").await,
            Err(SyncError::StoreUnavailable { .. })
        ));
        assert!(store.put("/etc/passwd", Vec::new()).await.is_err());
        assert!(store.delete("").await.is_err());
    }
}
