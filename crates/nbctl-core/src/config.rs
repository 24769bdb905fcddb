// ── Run configuration ──

use std::time::Duration;

/// Settings for one invocation, threaded explicitly through the driver
/// and executor.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Database locator, used in error messages.
    pub db: String,
    /// Validate and commit-check, but never apply.
    pub dry_run: bool,
    /// Collapse each command's output onto one line.
    pub oneline: bool,
    /// Overall deadline; `None` waits forever.
    pub timeout: Option<Duration>,
    /// Attached to every commit for the store's log.
    pub comment: String,
}

impl RunConfig {
    pub fn new(db: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            ..Self::default()
        }
    }

    /// Build the commit comment from the raw command-line arguments.
    pub fn with_comment_from_args<S: AsRef<str>>(mut self, args: &[S]) -> Self {
        let joined: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        self.comment = format!("nbctl: {}", joined.join(" "));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_joins_args() {
        let config = RunConfig::new("memory:").with_comment_from_args(&["lswitch-add", "sw0"]);
        assert_eq!(config.comment, "nbctl: lswitch-add sw0");
        assert!(config.timeout.is_none());
    }
}
