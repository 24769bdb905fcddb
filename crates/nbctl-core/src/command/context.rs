// ── Per-command execution contexts ──

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::{CommandOutput, Table};
use crate::model::Database;
use crate::store::Transaction;
use crate::symbol::SymbolTable;

pub type Options = BTreeMap<String, Option<String>>;

fn arg_at(args: &[String], index: usize) -> &str {
    args.get(index).map_or("", String::as_str)
}

/// Read-only view handed to `prerequisites`.
pub struct PrereqContext<'a> {
    pub args: &'a [String],
    pub options: &'a Options,
    pub db: &'a Database,
}

impl PrereqContext<'_> {
    pub fn arg(&self, index: usize) -> &str {
        arg_at(self.args, index)
    }
}

/// Everything a command's `run` phase may touch.
pub struct Context<'a> {
    pub args: &'a [String],
    pub options: &'a Options,
    pub txn: &'a mut Transaction,
    pub symbols: &'a mut SymbolTable,
    pub output: &'a mut CommandOutput,
    /// Set to abandon this attempt and rerun the batch after the next
    /// store change.
    pub try_again: bool,
}

impl Context<'_> {
    /// Positional argument; arity was checked at parse time.
    pub fn arg(&self, index: usize) -> &str {
        arg_at(self.args, index)
    }

    pub fn has_option(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    /// The transaction's view of the database.
    pub fn db(&self) -> &Database {
        self.txn.db()
    }

    pub fn write_line(&mut self, line: impl AsRef<str>) {
        let _ = writeln!(self.output.output, "{}", line.as_ref());
    }

    pub fn set_table(&mut self, table: Table) {
        self.output.table = Some(table);
    }
}

/// Post-commit view handed to `postprocess`.
pub struct PostContext<'a> {
    pub args: &'a [String],
    pub options: &'a Options,
    pub txn: &'a Transaction,
    pub output: &'a mut CommandOutput,
}
