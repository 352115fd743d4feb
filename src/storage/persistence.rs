//! JSON snapshot files for the in-memory store.

use crate::core::{CmsError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};

// ============================================================================
// Snapshot Format
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub created_at: i64,
    pub tree: Value,
}

impl StoreSnapshot {
    pub const VERSION: u32 = 1;

    pub fn new(tree: Value) -> Self {
        Self {
            version: Self::VERSION,
            created_at: chrono::Utc::now().timestamp_millis(),
            tree,
        }
    }
}

// ============================================================================
// Snapshot File
// ============================================================================

/// Location of a snapshot on disk. Saves replace the file atomically.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub async fn save(&self, tree: Value) -> Result<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &StoreSnapshot::new(tree)))
            .await
            .map_err(|e| CmsError::Io(format!("snapshot writer panicked: {}", e)))?
    }

    /// `Ok(None)` when no snapshot has been written yet.
    pub async fn load(&self) -> Result<Option<StoreSnapshot>> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(CmsError::Io(format!(
                    "Failed to read snapshot '{}': {}",
                    self.path.display(),
                    err
                )));
            }
        };
        let snapshot: StoreSnapshot = serde_json::from_slice(&data)?;
        if snapshot.version > StoreSnapshot::VERSION {
            return Err(CmsError::Serialization(format!(
                "snapshot version {} is newer than supported version {}",
                snapshot.version,
                StoreSnapshot::VERSION
            )));
        }
        Ok(Some(snapshot))
    }
}

fn write_atomically(path: &Path, snapshot: &StoreSnapshot) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
    serde_json::to_writer_pretty(&mut temp, snapshot)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path)
        .map_err(|e| CmsError::Io(format!("Failed to replace snapshot: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let file = SnapshotFile::new(dir.path().join("absent.json"));
        assert!(file.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_keeps_tree() {
        let dir = TempDir::new().unwrap();
        let file = SnapshotFile::new(dir.path().join("nested/site.json"));
        let tree = json!({"features": {"k": {"name": "A", "order": 0}}});

        file.save(tree.clone()).await.unwrap();
        let loaded = file.load().await.unwrap().unwrap();

        assert_eq!(loaded.tree, tree);
        assert_eq!(loaded.version, StoreSnapshot::VERSION);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(SnapshotFile::new(&path).load().await.is_err());
    }
}
