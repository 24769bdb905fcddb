//! Transactional command executor for the logical network northbound store.
//!
//! A command batch runs as a single optimistic transaction against a
//! [`StoreView`], a client's cached replica of the database:
//!
//! - **[`driver`]**: the retry loop. It refreshes the view and attempts
//!   the batch at most once per observed sequence number, then blocks
//!   until the store changes whenever an attempt conflicts or a command
//!   asks to wait.
//!
//! - **[`executor`]**: a single attempt. Prerequisites, every command's
//!   `run` phase inside one [`Transaction`], the [`SymbolTable`] audit,
//!   the commit, and post-commit processing.
//!
//! - **[`command`]** / **[`handlers`]**: the static command registry. Each
//!   command declares its arity, options and read/write mode, and
//!   implements the [`Handler`] phases.
//!
//! - **Domain model** ([`model`]): logical switches own their logical
//!   ports and ACLs through membership alone. Unreferenced ports and ACLs
//!   are garbage collected at commit.
//!
//! - **Stores** ([`store`]): [`MemoryStore`] for in-process use and
//!   [`FileStore`] for a JSON database on disk, both with the same
//!   verify-then-commit semantics.

pub mod command;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod model;
pub mod store;
pub mod symbol;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{
    CommandOutput, CommandSyntax, Handler, Mode, ParsedCommand, Table, find_command,
    parse_commands, registry,
};
pub use config::RunConfig;
pub use driver::{run, run_with_timeout, timeout_from_secs};
pub use error::{CoreError, LookupKind};
pub use executor::{Attempt, attempt, is_read_write};
pub use model::{Acl, AclAction, Database, Direction, LogicalPort, LogicalSwitch, TableKind};
pub use store::{CommitStatus, FileStore, Locator, MemoryStore, MemoryView, StoreView, Transaction};
pub use symbol::{Symbol, SymbolTable, SymbolWarning};
