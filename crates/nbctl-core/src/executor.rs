// ── Command executor ──
//
// One attempt at a command batch: prerequisites against the snapshot,
// every `run` phase inside a single transaction, the symbol audit, one
// commit, then postprocess. Nothing escapes an attempt that ends in
// `TryAgain`; the driver starts the next one from scratch.

use tracing::{debug, warn};

use crate::command::{CommandOutput, Context, Mode, ParsedCommand, PostContext, PrereqContext};
use crate::config::RunConfig;
use crate::error::CoreError;
use crate::store::{CommitStatus, StoreView};
use crate::symbol::SymbolTable;

/// How one attempt ended, short of a fatal error.
#[derive(Debug)]
pub enum Attempt {
    /// Committed (or nothing to commit). One output per command, in order.
    Committed {
        status: CommitStatus,
        outputs: Vec<CommandOutput>,
    },
    /// Conflict or a command asked to wait; rerun after the next change.
    TryAgain,
}

/// Whether any command in the batch can write.
pub fn is_read_write(commands: &[ParsedCommand]) -> bool {
    commands.iter().any(|c| c.syntax.mode == Mode::ReadWrite)
}

pub async fn attempt<S: StoreView>(
    store: &mut S,
    commands: &[ParsedCommand],
    config: &RunConfig,
) -> Result<Attempt, CoreError> {
    let snapshot = store.snapshot();
    for command in commands {
        command.syntax.handler.prerequisites(&PrereqContext {
            args: &command.args,
            options: &command.options,
            db: &snapshot,
        })?;
    }

    let mut txn = store.open_transaction();
    txn.set_dry_run(config.dry_run);
    if !config.comment.is_empty() {
        txn.add_comment(config.comment.clone());
    }

    let mut symbols = SymbolTable::new();
    let mut outputs: Vec<CommandOutput> = Vec::with_capacity(commands.len());
    for command in commands {
        let mut output = CommandOutput::default();
        let mut ctx = Context {
            args: &command.args,
            options: &command.options,
            txn: &mut txn,
            symbols: &mut symbols,
            output: &mut output,
            try_again: false,
        };
        command.syntax.handler.run(&mut ctx)?;
        if ctx.try_again {
            debug!(command = command.syntax.name, "command requested another attempt");
            txn.abort();
            return Ok(Attempt::TryAgain);
        }
        outputs.push(output);
    }

    for warning in symbols.audit()? {
        warn!("{warning}");
    }

    let status = store.commit(&txn).await;
    txn.mark_finished();
    debug!(?status, generation = snapshot.generation, "commit finished");

    match status {
        CommitStatus::Success | CommitStatus::Unchanged => {
            for (command, output) in commands.iter().zip(outputs.iter_mut()) {
                command.syntax.handler.postprocess(&mut PostContext {
                    args: &command.args,
                    options: &command.options,
                    txn: &txn,
                    output,
                })?;
            }
            Ok(Attempt::Committed { status, outputs })
        }
        CommitStatus::TryAgain => Ok(Attempt::TryAgain),
        CommitStatus::Aborted => Err(CoreError::TransactionAborted),
        CommitStatus::Error(message) => Err(CoreError::TransactionFailed { message }),
    }
}
