//! Write a generated configuration to disk.
//!
//! Layout:
//! ```text
//! <dir>/boot.json
//! <dir>/<cmd>.json             {"apps": {"<app>": "data/<app>_<cmd>"}}
//! <dir>/data/<app>_<cmd>.json  the command document itself
//! ```

use crate::Result;
use crate::boot::Boot;
use crate::command::{AppCommands, CommandId};

use anyhow::{Context, bail};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Serialize)]
struct TopLevelCommand<'a> {
    apps: BTreeMap<&'a str, String>,
}

/// Serialize `value` with sorted keys and 4-space indentation.
pub fn to_json_string<T: Serialize>(value: &T) -> Result<String> {
    // Round-trip through Value so map keys come out sorted.
    let value = serde_json::to_value(value)?;
    let mut buf = Vec::new();
    let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(String::from_utf8(buf)?)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = to_json_string(value)?;
    fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
    tracing::debug!(path = %path.display(), "wrote json");
    Ok(())
}

/// Write the whole configuration into `dir`, which must not exist yet.
pub fn write_config_dir(dir: &Path, boot: &Boot, apps: &[AppCommands]) -> Result<()> {
    if dir.exists() {
        bail!("Directory {} already exists", dir.display());
    }
    let data_dir = dir.join("data");
    fs::create_dir_all(&data_dir).with_context(|| format!("create {}", data_dir.display()))?;

    for app in apps {
        tracing::info!(app = %app.app, "generating command data json files");
        for (id, cmd) in &app.commands {
            write_json(&data_dir.join(format!("{}_{}.json", app.app, id)), cmd)?;
        }
    }

    tracing::info!("generating top-level command json files");
    for id in CommandId::ALL {
        let top = TopLevelCommand {
            apps: apps
                .iter()
                .map(|a| (a.app.as_str(), format!("data/{}_{}", a.app, id)))
                .collect(),
        };
        write_json(&dir.join(format!("{}.json", id)), &top)?;
    }

    tracing::info!("generating boot json file");
    write_json(&dir.join("boot.json"), boot)?;
    Ok(())
}
