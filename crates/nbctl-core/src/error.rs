// ── Core error types ──
//
// Every fatal condition a command batch can hit. Recoverable conditions
// (optimistic-concurrency conflicts, `try_again` requests) are never
// errors: they travel as `CommitStatus::TryAgain` / `Attempt::TryAgain`.

use thiserror::Error;

/// Which identifier form a failed lookup was attempted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum LookupKind {
    #[strum(serialize = "UUID")]
    Uuid,
    #[strum(serialize = "name")]
    Name,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── User input errors ────────────────────────────────────────────
    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Multiple logical switches named '{name}'.  Use a UUID.")]
    Ambiguous { name: String },

    #[error("{id}: {entity} {by} not found")]
    NotFound {
        entity: &'static str,
        id: String,
        by: LookupKind,
    },

    #[error("{name}: an {entity} with this name already exists")]
    AlreadyExists { entity: &'static str, name: String },

    /// An existing row does not match what a `--may-exist` caller asked for.
    #[error("{name}: {reason}")]
    Conflict { name: String, reason: String },

    // ── Schema / consistency errors ──────────────────────────────────
    #[error("{0}")]
    SchemaViolation(String),

    #[error(
        "row id \"{name}\" is referenced but never created (e.g. with \"-- --id={name} create ...\")"
    )]
    UnresolvedSymbol { name: String },

    // ── Transaction errors ───────────────────────────────────────────
    #[error("transaction aborted")]
    TransactionAborted,

    #[error("transaction error: {message}")]
    TransactionFailed { message: String },

    // ── Connectivity ─────────────────────────────────────────────────
    #[error("{db}: database connection failed ({reason})")]
    ConnectionFailed { db: String, reason: String },

    #[error("{db}: timed out after {timeout_secs}s")]
    Timeout { db: String, timeout_secs: u64 },

    #[error("{locator}: unsupported database locator (expected \"file:PATH\" or \"memory:\")")]
    UnsupportedDatabase { locator: String },

    // ── Persistence ──────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid database contents: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn conflict(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conflict {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
