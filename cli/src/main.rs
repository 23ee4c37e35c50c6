mod commands;
mod config;
mod storage;
mod transport;

use clap::Parser;
use color_eyre::eyre::{bail, Result};
use todo_core::{SessionContext, TodoClient, TodoController};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Cli, LogLevel};
use crate::storage::FileSessionStore;
use crate::transport::UreqTransport;

fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_level);

    let Some(session_path) = cli.session_path() else {
        bail!("cannot determine a config directory, pass --session-file");
    };
    let store = FileSessionStore::new(session_path);
    debug!(api_url = %cli.api_url, session = %store.path().display(), "starting");

    let mut controller = TodoController::new(
        TodoClient::new(&cli.api_url),
        UreqTransport::new(),
        SessionContext::new(store),
    );

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    commands::run(&mut controller, cli.command, stdin.lock(), &mut stdout.lock())
}
