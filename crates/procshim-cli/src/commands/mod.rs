// Command handlers for the procshim CLI

mod files;
mod info;
mod signals;

use std::io::Write;

use procshim_process::Process;

use crate::cli::Commands;

/// Run one subcommand against `process`, writing its report to `out`
pub async fn run<W: Write>(command: &Commands, process: &Process, out: &mut W) -> anyhow::Result<()> {
    match command {
        Commands::Id => info::identity(process, out),
        Commands::Hrtime { since } => info::hrtime(process, since.as_deref(), out),
        Commands::Signals { platform } => signals::list(process, *platform, out),
        Commands::Kill { pid, signal } => signals::kill(process, *pid, signal, out),
        Commands::Env { key } => info::env(process, key.as_deref(), out),
        Commands::WriteJson {
            path,
            json,
            spaces,
            append,
        } => files::write_json(process, path, json, *spaces, *append, out).await,
        Commands::CpuUsage => info::cpu_usage(process, out),
    }
}

/// Run `command`, report a failure on `err`, then leave through
/// [`Process::exit`] with 0 or 1 so pending ticks and the exit events run.
/// Returns the exit code when the host's `exit` returns.
pub async fn run_to_exit<W: Write, E: Write>(
    command: &Commands,
    process: &Process,
    out: &mut W,
    err: &mut E,
) -> anyhow::Result<i32> {
    let code = match run(command, process, out).await {
        Ok(()) => 0,
        Err(e) => {
            writeln!(err, "procshim: {:#}", e)?;
            1
        }
    };
    out.flush()?;

    process.exit(Some(code))?;
    Ok(code)
}
