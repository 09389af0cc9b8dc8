//! JSONL thread log.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::ThreadStore;
use crate::domain::Thread;
use crate::error::{Result, SchedulerError};

const LOG_FILE: &str = "threads.jsonl";

/// Append-only JSONL file of thread snapshots.
#[derive(Debug, Clone)]
pub struct JsonlThreadStore {
    path: PathBuf,
}

impl JsonlThreadStore {
    /// Open or create the log inside `dir`.
    pub fn open_at(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(LOG_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, lines: &str) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(lines.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

impl ThreadStore for JsonlThreadStore {
    fn load_all(&self) -> Result<Vec<Thread>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let lines: Vec<String> = reader.lines().collect::<std::io::Result<_>>()?;
        let last = lines.iter().rposition(|line| !line.trim().is_empty());

        // Later lines supersede earlier ones
        let mut latest = BTreeMap::new();
        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let thread: Thread = match serde_json::from_str(line) {
                Ok(thread) => thread,
                // A crash mid-append can leave a partial final record
                Err(e) if Some(index) == last => {
                    tracing::warn!(path = %self.path.display(), line = index + 1, error = %e, "Skipping torn trailing record");
                    continue;
                }
                Err(e) => {
                    return Err(SchedulerError::Storage(format!(
                        "{} line {}: {}",
                        self.path.display(),
                        index + 1,
                        e
                    )));
                }
            };
            latest.insert(thread.id(), thread);
        }

        tracing::debug!(path = %self.path.display(), count = latest.len(), "Loaded thread log");
        Ok(latest.into_values().collect())
    }

    fn save(&self, thread: &Thread) -> Result<()> {
        self.save_all(std::slice::from_ref(thread))
    }

    fn save_all(&self, threads: &[Thread]) -> Result<()> {
        if threads.is_empty() {
            return Ok(());
        }
        let mut buffer = String::new();
        for thread in threads {
            buffer.push_str(&serde_json::to_string(thread)?);
            buffer.push('\n');
        }
        self.append(&buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ThreadStatus;
    use crate::id::ThreadId;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn thread(id: u64, progress: u8) -> Thread {
        let mut t = Thread::new(
            ThreadId::new(id),
            format!("thread {id}"),
            5,
            BTreeSet::new(),
            String::new(),
            ThreadStatus::Active,
        );
        t.progress = progress;
        t
    }

    #[test]
    fn test_empty_log_loads_nothing() {
        let temp = TempDir::new().unwrap();
        let store = JsonlThreadStore::open_at(temp.path()).unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_latest_version_wins() {
        let temp = TempDir::new().unwrap();
        let store = JsonlThreadStore::open_at(temp.path()).unwrap();

        store.save(&thread(2, 0)).unwrap();
        store.save(&thread(1, 0)).unwrap();
        store.save(&thread(2, 40)).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id(), ThreadId::new(1));
        assert_eq!(loaded[1].progress(), 40);

        let lines = fs::read_to_string(store.path()).unwrap().lines().count();
        assert_eq!(lines, 3);
    }

    #[test]
    fn test_reopen_sees_saved_records() {
        let temp = TempDir::new().unwrap();
        JsonlThreadStore::open_at(temp.path())
            .unwrap()
            .save_all(&[thread(1, 10), thread(2, 20)])
            .unwrap();

        let reopened = JsonlThreadStore::open_at(temp.path()).unwrap();
        assert_eq!(reopened.load_all().unwrap().len(), 2);
    }

    #[test]
    fn test_corrupt_line_is_storage_error() {
        let temp = TempDir::new().unwrap();
        let store = JsonlThreadStore::open_at(temp.path()).unwrap();
        fs::write(store.path(), "{not json}\n").unwrap();
        store.save(&thread(1, 10)).unwrap();

        let err = store.load_all().unwrap_err();
        assert!(matches!(err, SchedulerError::Storage(msg) if msg.contains("line 1")));
    }

    #[test]
    fn test_torn_trailing_line_is_skipped() {
        let temp = TempDir::new().unwrap();
        let store = JsonlThreadStore::open_at(temp.path()).unwrap();
        store.save_all(&[thread(1, 10), thread(2, 20)]).unwrap();
        store.save(&thread(2, 50)).unwrap();

        let mut content = fs::read_to_string(store.path()).unwrap();
        let cut = content.trim_end().rfind('\n').unwrap() + 1;
        content.truncate(cut + 12);
        fs::write(store.path(), content).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].progress(), 20);
    }
}
