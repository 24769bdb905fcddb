//! Clap derive structures for the `nbctl` CLI.
//!
//! Global options come first; everything from the first command word on
//! is the command batch, handed to the core parser untouched so per-command
//! options (`--may-exist`, `--id=@name`) and `--` separators survive.

use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nbctl -- transactional client for the logical network northbound store
#[derive(Debug, Parser)]
#[command(
    name = "nbctl",
    version,
    about = "Manage logical switches, ports and ACLs in the northbound database",
    long_about = "Runs a batch of commands as one transaction against the northbound \
        database.\n\n\
        Separate commands with --, e.g.\n  \
        nbctl lswitch-add sw0 -- lport-add sw0 vm1 -- lport-set-addresses vm1 unknown\n\n\
        The batch is retried from scratch whenever another client changes the \
        database first.",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    /// Commands to run, separated by `--`
    #[arg(
        value_name = "COMMAND",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub batch: Vec<String>,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Database locator: file:PATH or memory:
    #[arg(long, env = "OVN_NB_DB")]
    pub db: Option<String>,

    /// Give up after this many seconds (0 waits forever)
    #[arg(long, short = 't', value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Check the batch and its commit without changing the database
    #[arg(long)]
    pub dry_run: bool,

    /// Print each command's output on a single line
    #[arg(long)]
    pub oneline: bool,

    /// Format for table results
    #[arg(long, short = 'f')]
    pub format: Option<OutputFormat>,

    /// Alternate configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// List the available commands and exit
    #[arg(long = "commands")]
    pub list_commands: bool,

    /// Print shell completions and exit
    #[arg(long, value_name = "SHELL")]
    pub completions: Option<clap_complete::Shell>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

// ── Output Format ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One `column : value` block per record (default)
    List,
    /// Bordered table
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
}
