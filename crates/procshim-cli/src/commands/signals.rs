// Signal table listing and delivery

use std::io::Write;

use anyhow::anyhow;
use procshim_process::{Process, SignalArg, SignalTable};
use tracing::info;

use crate::cli::SignalPlatform;

pub(super) fn list<W: Write>(
    process: &Process,
    platform: Option<SignalPlatform>,
    out: &mut W,
) -> anyhow::Result<()> {
    let table = match platform {
        Some(SignalPlatform::Linux) => SignalTable::linux(),
        Some(SignalPlatform::Darwin) => SignalTable::darwin(),
        None => match process.platform() {
            "linux" => SignalTable::linux(),
            "darwin" => SignalTable::darwin(),
            other => return Err(anyhow!("no signal table for {}", other)),
        },
    };

    for (number, name) in table.iter() {
        writeln!(out, "{}\t{}", number, name)?;
    }
    Ok(())
}

/// Numeric text is a signal number, anything else a name
fn parse_signal(raw: &str) -> SignalArg {
    raw.parse::<i32>()
        .map(SignalArg::Number)
        .unwrap_or_else(|_| SignalArg::from(raw))
}

pub(super) fn kill<W: Write>(process: &Process, pid: i32, signal: &str, out: &mut W) -> anyhow::Result<()> {
    let signal = parse_signal(signal);
    process.kill(pid, signal.clone())?;
    info!(pid, signal = %signal, "Signal sent");
    writeln!(out, "sent {} to {}", signal, pid)?;
    Ok(())
}
