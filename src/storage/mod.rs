//! Persistence for the thread ledger.
//!
//! Every mutation is written through a [`ThreadStore`] before it lands in
//! memory, so a crash never leaves the in-memory ledger ahead of disk.
//! Two backends share the same record format (one JSON document per thread):
//! - **JSONL**: append-only log, latest line per id wins on load
//! - **SQLite**: one row per thread, replaced on save

mod jsonl;
mod sqlite;

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{StorageBackend, StorageConfig};
use crate::domain::Thread;
use crate::error::{Result, SchedulerError};

pub use jsonl::JsonlThreadStore;
pub use sqlite::SqliteThreadStore;

/// Durable home for thread records.
pub trait ThreadStore: Send + Sync {
    /// Load the latest version of every stored thread, ordered by id.
    fn load_all(&self) -> Result<Vec<Thread>>;

    /// Persist one thread record, replacing any earlier version.
    fn save(&self, thread: &Thread) -> Result<()>;

    /// Persist several records as one unit.
    fn save_all(&self, threads: &[Thread]) -> Result<()> {
        for thread in threads {
            self.save(thread)?;
        }
        Ok(())
    }
}

/// Open the configured backend, or `None` for the in-memory backend.
pub fn open_store(config: &StorageConfig, project_dir: &Path) -> Result<Option<Box<dyn ThreadStore>>> {
    let store: Box<dyn ThreadStore> = match config.backend {
        StorageBackend::Memory => return Ok(None),
        StorageBackend::Jsonl => Box::new(JsonlThreadStore::open_at(&store_dir(config, project_dir)?)?),
        StorageBackend::Sqlite => Box::new(SqliteThreadStore::open_at(&store_dir(config, project_dir)?)?),
    };
    Ok(Some(store))
}

/// Directory holding the ledger for `project_dir`.
///
/// With `per-project` set this is `<dir>/<project-hash>/`, otherwise `<dir>/`.
pub fn store_dir(config: &StorageConfig, project_dir: &Path) -> Result<PathBuf> {
    let dir = if config.per_project {
        config.dir.join(compute_project_hash(project_dir)?)
    } else {
        config.dir.clone()
    };
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Compute a stable hash for a project directory.
///
/// Uses SHA256 of the canonical path, truncated to 16 hex chars.
pub fn compute_project_hash(project_dir: &Path) -> Result<String> {
    let canonical = project_dir.canonicalize().map_err(|e| {
        SchedulerError::Storage(format!("Failed to canonicalize {}: {}", project_dir.display(), e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    let result = hasher.finalize();

    Ok(hex::encode(&result[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(backend: StorageBackend, dir: &Path, per_project: bool) -> StorageConfig {
        StorageConfig {
            backend,
            dir: dir.to_path_buf(),
            per_project,
        }
    }

    #[test]
    fn test_compute_project_hash_consistent() {
        let temp = TempDir::new().unwrap();
        let hash1 = compute_project_hash(temp.path()).unwrap();
        let hash2 = compute_project_hash(temp.path()).unwrap();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 16);
    }

    #[test]
    fn test_compute_project_hash_differs_per_dir() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        assert_ne!(
            compute_project_hash(a.path()).unwrap(),
            compute_project_hash(b.path()).unwrap()
        );
    }

    #[test]
    fn test_compute_project_hash_missing_dir() {
        let temp = TempDir::new().unwrap();
        assert!(compute_project_hash(&temp.path().join("nope")).is_err());
    }

    #[test]
    fn test_store_dir_per_project() {
        let root = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();

        let dir = store_dir(&config(StorageBackend::Jsonl, root.path(), true), project.path()).unwrap();
        assert_eq!(dir.parent().unwrap(), root.path());
        assert!(dir.exists());

        let flat = store_dir(&config(StorageBackend::Jsonl, root.path(), false), project.path()).unwrap();
        assert_eq!(flat, root.path());
    }

    #[test]
    fn test_open_store_memory_is_none() {
        let root = TempDir::new().unwrap();
        let store = open_store(&config(StorageBackend::Memory, root.path(), false), root.path()).unwrap();
        assert!(store.is_none());
    }

    #[test]
    fn test_open_store_backends() {
        let root = TempDir::new().unwrap();
        for backend in [StorageBackend::Jsonl, StorageBackend::Sqlite] {
            let store = open_store(&config(backend, root.path(), false), root.path())
                .unwrap()
                .unwrap();
            assert!(store.load_all().unwrap().is_empty());
        }
    }
}
