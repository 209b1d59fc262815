// procshim CLI entry point

use std::sync::Arc;

use clap::Parser;
use procshim_cli::{run_to_exit, Cli};
use procshim_common::{format_error, logging, LogOptions};
use procshim_process::{install_global, ConfigLoader, Process, SystemHost};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    // no facade exists yet, so this is the one exit that bypasses it
    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("procshim: {}", format_error(&e));
            std::process::exit(2);
        }
    };

    logging::init(LogOptions {
        level: cli.log_level(config.logging.level),
        with_target: cli.verbose > 1,
    });
    tracing::debug!(path = %loader.config_path().display(), "Configuration loaded");

    let process = install_global(Arc::new(Process::new(Arc::new(SystemHost::new()), config)?))?;

    let mut stdout = std::io::stdout().lock();
    let mut stderr = std::io::stderr().lock();
    run_to_exit(&cli.command, process, &mut stdout, &mut stderr).await?;
    Ok(())
}
