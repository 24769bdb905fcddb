// ── JSON file store ──
//
// The database is a single JSON document. Commits hold an exclusive lock
// on a `<db>.lock` sidecar while they re-read the file, apply against
// what is on disk and replace it with a temp-file rename, so concurrent
// writers serialize and a stale verify surfaces as a conflict. Readers
// never lock: the rename is atomic.

use std::fs::{File, OpenOptions};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::apply::{Applied, apply};
use super::{CommitStatus, StoreView, Transaction};
use crate::error::CoreError;
use crate::model::Database;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct FileStore {
    path: PathBuf,
    cached: Arc<Database>,
    /// Generation of the cached snapshot, `None` before the first load.
    generation: Option<u64>,
    seqno: u64,
    last_error: Option<String>,
}

impl FileStore {
    /// Nothing is read until the first `refresh()`. A missing file is an
    /// empty database.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Arc::new(Database::default()),
            generation: None,
            seqno: 0,
            last_error: None,
        }
    }

    /// Lock, load, apply and write in one critical section.
    fn commit_locked(&self, txn: &Transaction) -> Result<CommitStatus, CoreError> {
        let mut lock = fd_lock::RwLock::new(open_lock_file(&self.path)?);
        let _guard = lock.write()?;

        let current = load(&self.path)?;
        Ok(match apply(txn, &current) {
            Applied::Unchanged => CommitStatus::Unchanged,
            Applied::Changed(_) if txn.is_dry_run() => {
                debug!("dry run: transaction validated, not applied");
                CommitStatus::Success
            }
            Applied::Changed(next) => {
                save(&self.path, &next)?;
                debug!(
                    generation = next.generation,
                    comment = %txn.comment(),
                    path = %self.path.display(),
                    "transaction committed"
                );
                CommitStatus::Success
            }
            Applied::Conflict(reason) => {
                debug!(%reason, "commit conflict");
                CommitStatus::TryAgain
            }
            Applied::Invalid(reason) => CommitStatus::Error(reason),
        })
    }
}

impl StoreView for FileStore {
    fn refresh(&mut self) {
        match load(&self.path) {
            Ok(db) => {
                self.last_error = None;
                if self.generation != Some(db.generation) {
                    self.generation = Some(db.generation);
                    self.cached = Arc::new(db);
                    self.seqno += 1;
                }
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read database");
                self.last_error = Some(e.to_string());
            }
        }
    }

    fn current_sequence_number(&self) -> u64 {
        self.seqno
    }

    fn is_alive(&self) -> bool {
        self.last_error.is_none()
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    fn snapshot(&self) -> Arc<Database> {
        Arc::clone(&self.cached)
    }

    fn commit(&mut self, txn: &Transaction) -> impl Future<Output = CommitStatus> + Send {
        let status = self
            .commit_locked(txn)
            .unwrap_or_else(|e| CommitStatus::Error(e.to_string()));
        async move { status }
    }

    fn block_until_change(&mut self) -> impl Future<Output = ()> + Send {
        let path = self.path.clone();
        let seen = self.generation;
        async move {
            loop {
                tokio::time::sleep(POLL_INTERVAL).await;
                match load(&path) {
                    Ok(db) if Some(db.generation) == seen => {}
                    // Changed, or unreadable: either way `refresh` has news.
                    _ => return,
                }
            }
        }
    }
}

fn load(path: &Path) -> Result<Database, CoreError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(serde_json::from_str(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Database::default()),
        Err(e) => Err(e.into()),
    }
}

fn open_lock_file(path: &Path) -> Result<File, CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut lock_path = path.as_os_str().to_owned();
    lock_path.push(".lock");
    Ok(OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(PathBuf::from(lock_path))?)
}

fn save(path: &Path, db: &Database) -> Result<(), CoreError> {
    let json = serde_json::to_string_pretty(db)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
