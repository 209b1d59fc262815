// Read-only process introspection

use std::io::Write;

use anyhow::{bail, Context};
use procshim_process::{HrTime, Process};
use serde_json::json;

pub(super) fn identity<W: Write>(process: &Process, out: &mut W) -> anyhow::Result<()> {
    let Some(identity) = process.identity()? else {
        writeln!(out, "no POSIX identity on {}", process.platform())?;
        return Ok(());
    };

    let report = json!({
        "uid": identity.uid,
        "gid": identity.gid,
        "euid": identity.effective_uid(),
        "egid": identity.effective_gid(),
        "groups": identity.groups,
    });
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

pub(super) fn hrtime<W: Write>(
    process: &Process,
    since: Option<&[u64]>,
    out: &mut W,
) -> anyhow::Result<()> {
    let reading = match since {
        Some([secs, nanos]) => {
            let nanos = u32::try_from(*nanos).context("nanoseconds out of range")?;
            process.hrtime_since(HrTime::new(*secs, nanos))
        }
        Some(other) => bail!("--since takes SECS NANOS, got {} values", other.len()),
        None => process.hrtime(),
    };
    writeln!(out, "[{}, {}]", reading.secs, reading.nanos)?;
    Ok(())
}

pub(super) fn env<W: Write>(process: &Process, key: Option<&str>, out: &mut W) -> anyhow::Result<()> {
    match key {
        Some(key) => match process.env_var(key)? {
            Some(value) => writeln!(out, "{}", value)?,
            None => bail!("{} is not set", key),
        },
        None => {
            for (key, value) in process.env()? {
                writeln!(out, "{}={}", key, value)?;
            }
        }
    }
    Ok(())
}

pub(super) fn cpu_usage<W: Write>(process: &Process, out: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *out, &process.cpu_usage(None))?;
    writeln!(out)?;
    Ok(())
}
