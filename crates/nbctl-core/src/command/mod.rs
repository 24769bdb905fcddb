// ── Command API ──
//
// Every command is a `CommandSyntax` descriptor in a static registry: its
// arity and accepted options are declared once and checked by the shared
// parser, and its behavior lives behind the `Handler` trait's three
// phases.

pub mod context;
pub mod parse;
pub mod table;

use std::fmt;

use serde::Serialize;

use crate::error::CoreError;
use crate::handlers;

pub use context::{Context, PostContext, PrereqContext};
pub use parse::{ParsedCommand, parse_commands};
pub use table::Table;

/// Whether a command can modify the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Mode {
    ReadOnly,
    ReadWrite,
}

/// The phases a command takes part in.
///
/// `prerequisites` sees only the refreshed snapshot and must not write.
/// `run` does the work inside the transaction. `postprocess` runs only
/// after a successful (or no-op) commit.
pub trait Handler: Sync {
    fn prerequisites(&self, _ctx: &PrereqContext<'_>) -> Result<(), CoreError> {
        Ok(())
    }

    fn run(&self, ctx: &mut Context<'_>) -> Result<(), CoreError>;

    fn postprocess(&self, _ctx: &mut PostContext<'_>) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Declarative description of one command.
pub struct CommandSyntax {
    pub name: &'static str,
    pub min_args: usize,
    /// `usize::MAX` for no upper bound.
    pub max_args: usize,
    /// Argument synopsis for help output.
    pub arguments: &'static str,
    /// Accepted options. A trailing `=` means the option takes a value.
    pub options: &'static [&'static str],
    pub mode: Mode,
    pub handler: &'static dyn Handler,
}

impl fmt::Debug for CommandSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSyntax")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("options", &self.options)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl CommandSyntax {
    /// One-line usage, e.g. `lswitch-add [--may-exist] [--add-duplicate] [LSWITCH]`.
    pub fn usage(&self) -> String {
        let mut parts = vec![self.name.to_owned()];
        parts.extend(self.options.iter().map(|opt| {
            if opt.ends_with('=') {
                format!("[{opt}VALUE]")
            } else {
                format!("[{opt}]")
            }
        }));
        if !self.arguments.is_empty() {
            parts.push(self.arguments.to_owned());
        }
        parts.join(" ")
    }
}

/// All registered commands, in help order.
pub fn registry() -> &'static [CommandSyntax] {
    handlers::COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static CommandSyntax> {
    registry().iter().find(|syntax| syntax.name == name)
}

/// What a command leaves behind for printing.
///
/// Only flushed after the batch commits; a retried attempt discards it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    pub output: String,
    pub table: Option<Table>,
}
