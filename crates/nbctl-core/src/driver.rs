// ── Retry driver ──
//
// Attempts the batch at most once per observed sequence number. A
// conflict or `try_again` parks the driver on `block_until_change()`
// until the store moves, then the whole batch reruns from scratch.

use std::time::Duration;

use tracing::{debug, info};

use crate::command::{CommandOutput, ParsedCommand};
use crate::config::RunConfig;
use crate::error::CoreError;
use crate::executor::{Attempt, attempt, is_read_write};
use crate::store::StoreView;

/// Run `commands` until they commit or fail.
///
/// Returns one output per command, in order. Outputs from abandoned
/// attempts are never returned.
pub async fn run<S: StoreView>(
    store: &mut S,
    commands: &[ParsedCommand],
    config: &RunConfig,
) -> Result<Vec<CommandOutput>, CoreError> {
    if is_read_write(commands) {
        info!(comment = %config.comment, "executing write batch");
    } else {
        debug!(comment = %config.comment, "executing read-only batch");
    }

    let mut last_seqno: Option<u64> = None;
    let mut attempts = 0_u32;
    loop {
        store.refresh();
        if !store.is_alive() {
            return Err(CoreError::ConnectionFailed {
                db: config.db.clone(),
                reason: store
                    .last_error()
                    .unwrap_or_else(|| "connection closed".to_owned()),
            });
        }

        let seqno = store.current_sequence_number();
        if last_seqno != Some(seqno) {
            last_seqno = Some(seqno);
            attempts += 1;
            debug!(attempt = attempts, seqno, "attempting batch");
            match attempt(store, commands, config).await? {
                Attempt::Committed { status, outputs } => {
                    debug!(attempts, ?status, "batch finished");
                    return Ok(outputs);
                }
                Attempt::TryAgain => debug!(seqno, "waiting for the next store change"),
            }
        }

        store.block_until_change().await;
    }
}

/// [`run`] bounded by `config.timeout`. `None` or zero waits forever.
pub async fn run_with_timeout<S: StoreView>(
    store: &mut S,
    commands: &[ParsedCommand],
    config: &RunConfig,
) -> Result<Vec<CommandOutput>, CoreError> {
    match config.timeout.filter(|t| !t.is_zero()) {
        Some(limit) => tokio::time::timeout(limit, run(store, commands, config))
            .await
            .map_err(|_| CoreError::Timeout {
                db: config.db.clone(),
                timeout_secs: limit.as_secs(),
            })?,
        None => run(store, commands, config).await,
    }
}

/// Convenience for callers holding seconds from a flag or config file.
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::future::Future;
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::command::parse_commands;
    use crate::model::Database;
    use crate::store::{CommitStatus, MemoryStore, MemoryView, Transaction};

    /// Lets another client slip in one write before this client's first
    /// commit, so the first attempt always conflicts.
    struct Interfering {
        inner: MemoryView,
        rival: Option<(MemoryStore, Vec<&'static str>)>,
        commits: u32,
    }

    impl StoreView for Interfering {
        fn refresh(&mut self) {
            self.inner.refresh();
        }

        fn current_sequence_number(&self) -> u64 {
            self.inner.current_sequence_number()
        }

        fn is_alive(&self) -> bool {
            self.inner.is_alive()
        }

        fn last_error(&self) -> Option<String> {
            self.inner.last_error()
        }

        fn snapshot(&self) -> Arc<Database> {
            self.inner.snapshot()
        }

        fn commit(&mut self, txn: &Transaction) -> impl Future<Output = CommitStatus> + Send {
            self.commits += 1;
            let rival = self.rival.take();
            let inner = &mut self.inner;
            async move {
                if let Some((store, words)) = rival {
                    let mut other = store.connect();
                    run(&mut other, &parse_commands(&words).unwrap(), &RunConfig::new("memory:"))
                        .await
                        .unwrap();
                }
                inner.commit(txn).await
            }
        }

        fn block_until_change(&mut self) -> impl Future<Output = ()> + Send {
            self.inner.block_until_change()
        }
    }

    async fn seeded(words: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        let mut view = store.connect();
        run(&mut view, &parse_commands(words).unwrap(), &RunConfig::new("memory:"))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn conflicting_port_add_is_retried_cleanly() {
        let store = seeded(&["lswitch-add", "sw0"]).await;
        let mut view = Interfering {
            inner: store.connect(),
            rival: Some((store.clone(), vec!["lport-add", "sw0", "rival"])),
            commits: 0,
        };

        let commands = parse_commands(&["lport-add", "sw0", "mine"]).unwrap();
        run(&mut view, &commands, &RunConfig::new("memory:")).await.unwrap();

        assert_eq!(view.commits, 2);
        let db = store.snapshot();
        let sw = db.require_switch("sw0").unwrap();
        let mut names: Vec<&str> = db.ports_of(sw).map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["mine", "rival"]);
        assert_eq!(db.ports.len(), 2);
    }

    #[tokio::test]
    async fn wait_until_resumes_after_another_client_commits() {
        let store = MemoryStore::new();
        let mut view = store.connect();
        let commands =
            parse_commands(&["wait-until", "Logical_Switch", "sw0", "--", "lswitch-list"]).unwrap();

        let writer = store.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let mut other = writer.connect();
            let add = parse_commands(&["lswitch-add", "sw0"]).unwrap();
            run(&mut other, &add, &RunConfig::new("memory:")).await.unwrap();
        });

        let outputs = run(&mut view, &commands, &RunConfig::new("memory:")).await.unwrap();
        handle.await.unwrap();
        assert_eq!(outputs.len(), 2);
        assert!(outputs[1].output.contains("(sw0)"));
    }

    #[tokio::test]
    async fn timeout_expires_while_waiting() {
        let store = MemoryStore::new();
        let mut view = store.connect();
        let commands = parse_commands(&["wait-until", "Logical_Switch", "ghost"]).unwrap();
        let mut config = RunConfig::new("memory:");
        config.timeout = Some(Duration::from_millis(30));

        let err = run_with_timeout(&mut view, &commands, &config).await.unwrap_err();
        assert!(matches!(err, CoreError::Timeout { .. }));
    }

    #[tokio::test]
    async fn closed_store_is_a_connection_failure() {
        let store = MemoryStore::new();
        let mut view = store.connect();
        store.close();
        let commands = parse_commands(&["lswitch-list"]).unwrap();
        let err = run(&mut view, &commands, &RunConfig::new("memory:")).await.unwrap_err();
        assert!(matches!(err, CoreError::ConnectionFailed { .. }));
    }

    #[test]
    fn zero_seconds_means_no_timeout() {
        assert_eq!(timeout_from_secs(0), None);
        assert_eq!(timeout_from_secs(5), Some(Duration::from_secs(5)));
    }
}
