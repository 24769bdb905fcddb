//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use nbctl_config::ConfigError;
use nbctl_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Input ────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(nbctl::usage), help("Run: nbctl --commands to list commands and their arguments"))]
    Usage { message: String },

    #[error("{message}")]
    #[diagnostic(code(nbctl::invalid_argument))]
    InvalidArgument { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(nbctl::ambiguous),
        help("Run: nbctl lswitch-list to find the UUID of the switch you mean")
    )]
    Ambiguous { message: String },

    #[error("{message}")]
    #[diagnostic(code(nbctl::not_found), help("Use --if-exists to ignore a missing target"))]
    NotFound { message: String },

    #[error("{message}")]
    #[diagnostic(code(nbctl::conflict))]
    Conflict { message: String },

    // ── Database contents ────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(nbctl::schema_violation),
        help("The database is inconsistent; inspect it with: nbctl list Logical_Switch")
    )]
    SchemaViolation { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(nbctl::unresolved_symbol),
        help("Every @name used as a value must also appear in a --id=@name create command")
    )]
    UnresolvedSymbol { message: String },

    #[error("{message}")]
    #[diagnostic(code(nbctl::transaction))]
    Transaction { message: String },

    // ── Database access ──────────────────────────────────────────────
    #[error("Could not use database {db}: {reason}")]
    #[diagnostic(
        code(nbctl::connection_failed),
        help("Check the --db locator (or OVN_NB_DB) and that the database file is readable")
    )]
    ConnectionFailed { db: String, reason: String },

    #[error("Timed out after {seconds}s waiting on {db}")]
    #[diagnostic(
        code(nbctl::timeout),
        help("Increase the limit with --timeout, or use --timeout 0 to wait forever")
    )]
    Timeout { db: String, seconds: u64 },

    #[error("Unsupported database locator '{locator}'")]
    #[diagnostic(code(nbctl::unsupported_db), help("Use file:PATH or memory:"))]
    UnsupportedDatabase { locator: String },

    #[error("Database error: {message}")]
    #[diagnostic(code(nbctl::database))]
    Database { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid configuration in {path}: {source}")]
    #[diagnostic(code(nbctl::config), help("Fix or remove {path}, or pass --config"))]
    Config {
        #[source]
        source: Box<ConfigError>,
        path: String,
    },

    // ── Process ──────────────────────────────────────────────────────
    #[error("Interrupted")]
    #[diagnostic(code(nbctl::interrupted))]
    Interrupted,

    #[error("Internal error: {message}")]
    #[diagnostic(code(nbctl::internal))]
    Internal { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render JSON output: {0}")]
    #[diagnostic(code(nbctl::json))]
    Json(#[from] serde_json::Error),

    #[error("Could not render YAML output: {0}")]
    #[diagnostic(code(nbctl::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage { .. }
            | Self::InvalidArgument { .. }
            | Self::Ambiguous { .. }
            | Self::UnsupportedDatabase { .. } => exit_code::USAGE,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Interrupted => exit_code::INTERRUPTED,
            _ => exit_code::GENERAL,
        }
    }

    pub fn config(source: ConfigError, path: &std::path::Path) -> Self {
        Self::Config {
            source: Box::new(source),
            path: path.display().to_string(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::Usage(_) => Self::Usage { message },
            CoreError::InvalidArgument(_) => Self::InvalidArgument { message },
            CoreError::Ambiguous { .. } => Self::Ambiguous { message },
            CoreError::NotFound { .. } => Self::NotFound { message },
            CoreError::AlreadyExists { .. } | CoreError::Conflict { .. } => {
                Self::Conflict { message }
            }
            CoreError::SchemaViolation(_) => Self::SchemaViolation { message },
            CoreError::UnresolvedSymbol { .. } => Self::UnresolvedSymbol { message },
            CoreError::TransactionAborted | CoreError::TransactionFailed { .. } => {
                Self::Transaction { message }
            }
            CoreError::ConnectionFailed { db, reason } => Self::ConnectionFailed { db, reason },
            CoreError::Timeout { db, timeout_secs } => Self::Timeout {
                db,
                seconds: timeout_secs,
            },
            CoreError::UnsupportedDatabase { locator } => Self::UnsupportedDatabase { locator },
            CoreError::Io(_) | CoreError::Serialization(_) => Self::Database { message },
            CoreError::Internal(_) => Self::Internal { message },
        }
    }
}
