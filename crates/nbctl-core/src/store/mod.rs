// ── Store views ──
//
// A `StoreView` is one client's cached replica of the northbound
// database. Its sequence number advances only when `refresh()` actually
// observes a new state, which is what the retry driver keys on.

mod apply;
pub mod file;
pub mod memory;
pub mod txn;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::CoreError;
use crate::model::Database;

pub use file::FileStore;
pub use memory::{MemoryStore, MemoryView};
pub use txn::Transaction;

/// Result of submitting a transaction to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitStatus {
    Success,
    /// Nothing to change; treated like success.
    Unchanged,
    /// The store changed underneath the transaction; retry from scratch.
    TryAgain,
    Aborted,
    Error(String),
}

pub trait StoreView: Send {
    /// Non-blocking poll for a newer snapshot.
    fn refresh(&mut self);

    fn current_sequence_number(&self) -> u64;

    fn is_alive(&self) -> bool;

    fn last_error(&self) -> Option<String>;

    /// The most recently refreshed snapshot.
    fn snapshot(&self) -> Arc<Database>;

    fn open_transaction(&self) -> Transaction {
        Transaction::new(self.snapshot())
    }

    fn commit(&mut self, txn: &Transaction) -> impl Future<Output = CommitStatus> + Send;

    /// Wait until a `refresh()` would observe a new state.
    fn block_until_change(&mut self) -> impl Future<Output = ()> + Send;
}

/// Where the database lives, parsed from `--db`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    File(PathBuf),
    Memory,
}

impl Locator {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        if let Some(path) = raw.strip_prefix("file:") {
            if !path.is_empty() {
                return Ok(Self::File(PathBuf::from(path)));
            }
        } else if raw == "memory:" {
            return Ok(Self::Memory);
        }
        Err(CoreError::UnsupportedDatabase {
            locator: raw.to_owned(),
        })
    }
}
