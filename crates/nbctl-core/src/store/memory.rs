// ── In-process store ──
//
// The authoritative database is an atomically swapped snapshot; a
// `watch` channel carries its generation so views can wait for changes
// without polling.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tracing::debug;

use super::apply::{Applied, apply};
use super::{CommitStatus, StoreView, Transaction};
use crate::model::Database;

struct Shared {
    db: ArcSwap<Database>,
    /// Serializes apply-and-publish so commits never interleave.
    commit_lock: Mutex<()>,
    generation: watch::Sender<u64>,
    closed: AtomicBool,
}

/// A database shared by any number of [`MemoryView`] clients.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_database(Database::default())
    }

    pub fn with_database(db: Database) -> Self {
        let (generation, _) = watch::channel(db.generation);
        Self {
            shared: Arc::new(Shared {
                db: ArcSwap::from_pointee(db),
                commit_lock: Mutex::new(()),
                generation,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Open a new client view. Its first `refresh()` loads the snapshot.
    pub fn connect(&self) -> MemoryView {
        MemoryView {
            store: self.clone(),
            rx: self.shared.generation.subscribe(),
            cached: Arc::new(Database::default()),
            seqno: 0,
            loaded_generation: None,
        }
    }

    /// The authoritative current state.
    pub fn snapshot(&self) -> Arc<Database> {
        self.shared.db.load_full()
    }

    /// Drop every view's connection.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.generation.send_modify(|_| {});
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    fn commit_txn(&self, txn: &Transaction) -> CommitStatus {
        if self.is_closed() {
            return CommitStatus::Error("connection closed".into());
        }
        let _guard = self
            .shared
            .commit_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let current = self.shared.db.load_full();
        match apply(txn, &current) {
            Applied::Unchanged => CommitStatus::Unchanged,
            Applied::Changed(_) if txn.is_dry_run() => {
                debug!("dry run: transaction validated, not applied");
                CommitStatus::Success
            }
            Applied::Changed(next) => {
                let generation = next.generation;
                self.shared.db.store(Arc::new(next));
                self.shared.generation.send_replace(generation);
                debug!(generation, comment = %txn.comment(), "transaction committed");
                CommitStatus::Success
            }
            Applied::Conflict(reason) => {
                debug!(%reason, "commit conflict");
                CommitStatus::TryAgain
            }
            Applied::Invalid(reason) => CommitStatus::Error(reason),
        }
    }
}

/// One client's replica of a [`MemoryStore`].
pub struct MemoryView {
    store: MemoryStore,
    rx: watch::Receiver<u64>,
    cached: Arc<Database>,
    seqno: u64,
    /// Generation of `cached`, `None` before the first load.
    loaded_generation: Option<u64>,
}

impl StoreView for MemoryView {
    fn refresh(&mut self) {
        if self.store.is_closed() {
            return;
        }
        // Mark the channel seen before loading, so a commit racing with
        // this refresh still wakes the next `block_until_change`.
        drop(self.rx.borrow_and_update());
        let db = self.store.snapshot();
        if self.loaded_generation != Some(db.generation) {
            self.loaded_generation = Some(db.generation);
            self.cached = db;
            self.seqno += 1;
        }
    }

    fn current_sequence_number(&self) -> u64 {
        self.seqno
    }

    fn is_alive(&self) -> bool {
        !self.store.is_closed()
    }

    fn last_error(&self) -> Option<String> {
        self.store.is_closed().then(|| "connection closed".to_owned())
    }

    fn snapshot(&self) -> Arc<Database> {
        Arc::clone(&self.cached)
    }

    fn commit(&mut self, txn: &Transaction) -> impl Future<Output = CommitStatus> + Send {
        let status = self.store.commit_txn(txn);
        async move { status }
    }

    fn block_until_change(&mut self) -> impl Future<Output = ()> + Send {
        let rx = &mut self.rx;
        async move {
            // A closed sender also wakes us; `refresh` then reports the loss.
            let _ = rx.changed().await;
        }
    }
}
