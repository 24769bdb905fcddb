mod cli;
mod config;
mod error;
mod output;

use std::fmt::Write as _;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use nbctl_core::{
    CommandOutput, CoreError, FileStore, Locator, MemoryStore, ParsedCommand, RunConfig,
    parse_commands, registry, run_with_timeout,
};

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    // Shell completions generation
    if let Some(shell) = cli.global.completions {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "nbctl", &mut std::io::stdout());
        return Ok(());
    }

    if cli.global.list_commands {
        let mut listing = String::new();
        for syntax in registry() {
            let _ = writeln!(listing, "{:<12}{}", syntax.mode.to_string(), syntax.usage());
        }
        return output::print_output(&listing);
    }

    // Validate the whole batch before touching the database.
    let commands = parse_commands(&cli.batch)?;
    let settings = config::resolve(&cli.global, &cli.batch)?;
    let locator = Locator::parse(&settings.run.db)?;
    tracing::debug!(?locator, commands = commands.len(), "dispatching batch");

    let outputs = tokio::select! {
        result = execute(locator, &commands, &settings.run) => result?,
        _ = tokio::signal::ctrl_c() => return Err(CliError::Interrupted),
    };

    let rendered = output::render(&outputs, settings.format, settings.run.oneline)?;
    output::print_output(&rendered)
}

async fn execute(
    locator: Locator,
    commands: &[ParsedCommand],
    config: &RunConfig,
) -> Result<Vec<CommandOutput>, CoreError> {
    match locator {
        Locator::File(path) => {
            let mut store = FileStore::open(path);
            run_with_timeout(&mut store, commands, config).await
        }
        Locator::Memory => {
            let store = MemoryStore::new();
            run_with_timeout(&mut store.connect(), commands, config).await
        }
    }
}
