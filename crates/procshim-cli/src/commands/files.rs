// JSON file output

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use procshim_common::{write_json as write_json_file, WriteJsonOptions};
use procshim_process::{Capability, Process};
use serde_json::Value;

pub(super) async fn write_json<W: Write>(
    process: &Process,
    path: &Path,
    json: &str,
    spaces: Option<usize>,
    append: bool,
    out: &mut W,
) -> anyhow::Result<()> {
    process.shim_config().permissions.check(Capability::Write)?;

    let value: Value = serde_json::from_str(json).context("argument is not valid JSON")?;

    let mut options = WriteJsonOptions::new().append(append);
    if let Some(spaces) = spaces {
        options = options.spaces(spaces);
    }

    write_json_file(path, &value, &options).await?;
    writeln!(out, "wrote {}", path.display())?;
    Ok(())
}
