//! pg-listen entry point.
//!
//! Resolves the config file, then streams notifications until interrupted.

use std::io::Write;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use pg_listen::cli::Args;
use pg_listen::config::ListenerConfig;
use pg_listen::error::ListenerError;
use pg_listen::listener;
use pg_listen::output::NotificationPrinter;
use pg_listen::shutdown;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Diagnostics go to stderr; stdout carries the notifications
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse_lenient(std::env::args_os()).unwrap_or_else(|err| err.exit());

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "exiting");
            let _ = writeln!(std::io::stdout(), "{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(args: &Args) -> Result<(), ListenerError> {
    let config = ListenerConfig::resolve(args.config_path()?)?;
    let mode = args.output_mode();
    tracing::info!(channels = config.channels.len(), ?mode, "starting pg-listen");

    let mut printer = NotificationPrinter::new(std::io::stdout(), mode);
    listener::run(&config, &mut printer, shutdown::signal()).await
}
