///! Persisted state store
///!
///! Holds the current document behind an `ArcSwapOption` so readers never
///! block. Writers go through [`StateStore::update`], which backs up the
///! current version, writes the new one atomically and only then swaps the
///! in-memory reference.

use arc_swap::ArcSwapOption;
use corona_common::CoronaState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{EngineError, Result};

pub struct StateStore {
    data_file: PathBuf,
    backup_file: PathBuf,
    current: ArcSwapOption<CoronaState>,
    write_lock: Mutex<()>,
}

impl StateStore {
    /// Empty store writing to `data_file` and `backup_file`
    pub fn new(data_file: impl Into<PathBuf>, backup_file: impl Into<PathBuf>) -> Self {
        Self {
            data_file: data_file.into(),
            backup_file: backup_file.into(),
            current: ArcSwapOption::empty(),
            write_lock: Mutex::new(()),
        }
    }

    /// Load the persisted document, falling back to the backup if the
    /// primary file is unreadable. Never fails; worst case is an empty store.
    pub async fn load(data_file: impl Into<PathBuf>, backup_file: impl Into<PathBuf>) -> Self {
        let store = Self::new(data_file, backup_file);

        let state = match read_state(&store.data_file).await {
            Ok(Some(state)) => {
                tracing::info!(
                    "Loaded cached data from {} ({} regions, as of {:?})",
                    store.data_file.display(),
                    state.regions.len(),
                    state.source_updated_at
                );
                Some(state)
            }
            Ok(None) => {
                tracing::info!("No cached data at {}, starting empty", store.data_file.display());
                None
            }
            Err(e) => {
                tracing::warn!("Failed to load {}: {}. Trying backup", store.data_file.display(), e);
                match read_state(&store.backup_file).await {
                    Ok(Some(state)) => {
                        tracing::warn!("Restored cached data from backup {}", store.backup_file.display());
                        Some(state)
                    }
                    Ok(None) => {
                        tracing::error!("No backup at {}, starting empty", store.backup_file.display());
                        None
                    }
                    Err(e) => {
                        tracing::error!(
                            "Backup {} is unusable as well: {}. Starting empty",
                            store.backup_file.display(),
                            e
                        );
                        None
                    }
                }
            }
        };

        store.current.store(state.map(Arc::new));
        store
    }

    /// Current snapshot; lock-free
    pub fn read(&self) -> Option<Arc<CoronaState>> {
        self.current.load_full()
    }

    /// Persist `state` and make it the current snapshot.
    ///
    /// On error neither the in-memory snapshot nor the primary file change.
    pub async fn update(&self, state: CoronaState) -> Result<Arc<CoronaState>> {
        let _guard = self.write_lock.lock().await;

        if let Some(current) = self.current.load_full() {
            if let Err(e) = write_state(&self.backup_file, &current).await {
                tracing::warn!("Failed to back up cached data to {}: {}", self.backup_file.display(), e);
            }
        }

        write_state(&self.data_file, &state).await?;

        let state = Arc::new(state);
        self.current.store(Some(state.clone()));
        tracing::debug!("Persisted cached data to {}", self.data_file.display());
        Ok(state)
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    pub fn backup_file(&self) -> &Path {
        &self.backup_file
    }
}

/// Read a document; a missing file is `None`
async fn read_state(path: &Path) -> Result<Option<CoronaState>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(EngineError::persistence(format!("read {}: {}", path.display(), e)));
        }
    };
    let state = serde_json::from_slice(&bytes)
        .map_err(|e| EngineError::persistence(format!("decode {}: {}", path.display(), e)))?;
    Ok(Some(state))
}

/// Write a document atomically (temp file, then rename)
async fn write_state(path: &Path, state: &CoronaState) -> Result<()> {
    let io_err = |op: &str, e: std::io::Error| {
        EngineError::persistence(format!("{} {}: {}", op, path.display(), e))
    };

    let bytes = serde_json::to_vec_pretty(state)
        .map_err(|e| EngineError::persistence(format!("encode {}: {}", path.display(), e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_err("create directory for", e))?;
    }

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp)
        .await
        .map_err(|e| io_err("create temp file for", e))?;
    file.write_all(&bytes).await.map_err(|e| io_err("write", e))?;
    file.flush().await.map_err(|e| io_err("flush", e))?;
    file.sync_all().await.map_err(|e| io_err("sync", e))?;
    drop(file);

    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| io_err("rename temp file to", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn state(cases: i64) -> CoronaState {
        let mut state = CoronaState::default();
        state.country.cases = cases;
        state.source_updated_at = NaiveDate::from_ymd_opt(2021, 10, 18);
        state
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = StateStore::load(dir.path().join("data.json"), dir.path().join("data.backup.json")).await;
        assert!(store.read().is_none());
    }

    #[tokio::test]
    async fn test_update_writes_backup_of_previous() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("data.json");
        let backup = dir.path().join("data.backup.json");
        let store = StateStore::new(&data, &backup);

        store.update(state(1)).await.unwrap();
        assert!(!backup.exists());

        store.update(state(2)).await.unwrap();
        assert_eq!(store.read().unwrap().country.cases, 2);

        let backed_up: CoronaState = serde_json::from_slice(&std::fs::read(&backup).unwrap()).unwrap();
        assert_eq!(backed_up.country.cases, 1);

        let reloaded = StateStore::load(&data, &backup).await;
        assert_eq!(reloaded.read().unwrap().as_ref(), &state(2));
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("data.json"), dir.path().join("data.backup.json"));

        store.update(state(3)).await.unwrap();

        assert!(store.data_file().exists());
        assert!(!store.data_file().with_extension("tmp").exists());
        let on_disk: CoronaState =
            serde_json::from_slice(&std::fs::read(store.data_file()).unwrap()).unwrap();
        assert_eq!(on_disk, state(3));
    }

    #[tokio::test]
    async fn test_corrupt_primary_falls_back_to_backup() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("data.json");
        let backup = dir.path().join("data.backup.json");

        std::fs::write(&data, "{ truncated").unwrap();
        std::fs::write(&backup, serde_json::to_vec(&state(7)).unwrap()).unwrap();

        let store = StateStore::load(&data, &backup).await;
        assert_eq!(store.read().unwrap().country.cases, 7);

        std::fs::write(&backup, "also broken").unwrap();
        let store = StateStore::load(&data, &backup).await;
        assert!(store.read().is_none());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_snapshot() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let store = StateStore::new(blocker.join("data.json"), dir.path().join("data.backup.json"));
        let err = store.update(state(1)).await.unwrap_err();
        assert_eq!(err.category(), "persistence");
        assert!(store.read().is_none());
    }

    #[tokio::test]
    async fn test_readers_keep_their_snapshot() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("data.json"), dir.path().join("data.backup.json"));

        store.update(state(1)).await.unwrap();
        let snapshot = store.read().unwrap();
        store.update(state(2)).await.unwrap();

        assert_eq!(snapshot.country.cases, 1);
        assert_eq!(store.read().unwrap().country.cases, 2);
    }
}
