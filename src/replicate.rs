//! Clone one application of a generated configuration N times.
//!
//! Used to stress the run control with many identical listrev apps: the boot
//! entry is duplicated as `<app>-0` .. `<app>-{N-1}`, the app's `conf` and
//! `init` data files are copied for each replica, and the originals removed.
//! Other applications keep their entries; the replicas take the original's
//! place in `order`.

use crate::Result;
use crate::emit::write_json;

use anyhow::{Context, anyhow, bail};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

pub const DEFAULT_REPLICAS: usize = 10;

/// Files copied per replica.
const REPLICATED_COMMANDS: [&str; 2] = ["conf", "init"];

/// Rewrite the configuration around `boot_file`; returns the replica names.
pub fn replicate_app(boot_file: &Path, app: &str, replicas: usize) -> Result<Vec<String>> {
    if replicas == 0 {
        bail!("number of replicas must be positive");
    }

    let text = fs::read_to_string(boot_file)
        .with_context(|| format!("read boot file {}", boot_file.display()))?;
    let mut boot: Value = serde_json::from_str(&text)
        .with_context(|| format!("parse boot file {}", boot_file.display()))?;

    let entry = boot
        .get("apps")
        .and_then(|apps| apps.get(app))
        .cloned()
        .ok_or_else(|| anyhow!("app {} not found in {}", app, boot_file.display()))?;

    let data_dir = boot_file
        .parent()
        .map(|p| p.join("data"))
        .ok_or_else(|| anyhow!("boot file {} has no parent directory", boot_file.display()))?;

    let mut names = Vec::with_capacity(replicas);
    for i in 0..replicas {
        let name = format!("{}-{}", app, i);
        for cmd in REPLICATED_COMMANDS {
            let from = data_dir.join(format!("{}_{}.json", app, cmd));
            let to = data_dir.join(format!("{}_{}.json", name, cmd));
            fs::copy(&from, &to)
                .with_context(|| format!("copy {} to {}", from.display(), to.display()))?;
        }
        names.push(name);
    }

    for cmd in REPLICATED_COMMANDS {
        let original = data_dir.join(format!("{}_{}.json", app, cmd));
        fs::remove_file(&original).with_context(|| format!("remove {}", original.display()))?;
    }

    let obj = boot
        .as_object_mut()
        .ok_or_else(|| anyhow!("boot file {} is not a JSON object", boot_file.display()))?;

    let mut apps = Map::new();
    if let Some(Value::Object(existing)) = obj.remove("apps") {
        for (name, value) in existing {
            if name == app {
                for replica in &names {
                    apps.insert(replica.clone(), entry.clone());
                }
            } else {
                apps.insert(name, value);
            }
        }
    }
    obj.insert("apps".to_string(), Value::Object(apps));

    let mut order = Vec::new();
    let mut placed = false;
    if let Some(Value::Array(existing)) = obj.remove("order") {
        for value in existing {
            if value.as_str() == Some(app) {
                order.extend(names.iter().cloned().map(Value::String));
                placed = true;
            } else {
                order.push(value);
            }
        }
    }
    if !placed {
        order.extend(names.iter().cloned().map(Value::String));
    }
    obj.insert("order".to_string(), Value::Array(order));

    write_json(boot_file, &boot)?;
    tracing::info!(app, replicas, "replicated application");
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seed(dir: &Path) -> std::path::PathBuf {
        let data = dir.join("data");
        fs::create_dir_all(&data).unwrap();
        for cmd in REPLICATED_COMMANDS {
            fs::write(data.join(format!("listrev-app-s_{}.json", cmd)), "{}").unwrap();
        }
        let boot = dir.join("boot.json");
        fs::write(
            &boot,
            r#"{"apps": {"listrev-app-s": {"exec": "daq_application", "host": "host_a", "port": 3333}},
                "order": ["listrev-app-s"], "hosts": {"host_a": "localhost"}}"#,
        )
        .unwrap();
        boot
    }

    #[test]
    fn replicates_app_and_data_files() {
        let tmp = tempfile::tempdir().unwrap();
        let boot_file = seed(tmp.path());

        let names = replicate_app(&boot_file, "listrev-app-s", 3).unwrap();
        assert_eq!(names, ["listrev-app-s-0", "listrev-app-s-1", "listrev-app-s-2"]);

        let boot: Value = serde_json::from_str(&fs::read_to_string(&boot_file).unwrap()).unwrap();
        assert_eq!(boot["apps"].as_object().unwrap().len(), 3);
        assert_eq!(boot["apps"]["listrev-app-s-2"]["port"], 3333);
        assert_eq!(boot["order"][1], "listrev-app-s-1");
        assert_eq!(boot["hosts"]["host_a"], "localhost");

        let data = tmp.path().join("data");
        assert!(data.join("listrev-app-s-1_conf.json").is_file());
        assert!(data.join("listrev-app-s-2_init.json").is_file());
        assert!(!data.join("listrev-app-s_conf.json").exists());
    }

    #[test]
    fn other_apps_keep_their_entries_and_order() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        fs::create_dir_all(&data).unwrap();
        for app in ["listrev-app-gr", "listrev-app-v"] {
            for cmd in REPLICATED_COMMANDS {
                fs::write(data.join(format!("{}_{}.json", app, cmd)), "{}").unwrap();
            }
        }
        let boot_file = tmp.path().join("boot.json");
        fs::write(
            &boot_file,
            r#"{"apps": {"listrev-app-gr": {"port": 3333}, "listrev-app-v": {"port": 3334}},
                "order": ["listrev-app-v", "listrev-app-gr"]}"#,
        )
        .unwrap();

        replicate_app(&boot_file, "listrev-app-v", 2).unwrap();

        let boot: Value = serde_json::from_str(&fs::read_to_string(&boot_file).unwrap()).unwrap();
        assert_eq!(boot["apps"]["listrev-app-gr"]["port"], 3333);
        assert_eq!(boot["apps"]["listrev-app-v-1"]["port"], 3334);
        assert!(boot["apps"].get("listrev-app-v").is_none());
        assert_eq!(
            boot["order"],
            serde_json::json!(["listrev-app-v-0", "listrev-app-v-1", "listrev-app-gr"])
        );
        assert!(data.join("listrev-app-gr_init.json").is_file());
    }

    #[test]
    fn unknown_app_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let boot_file = seed(tmp.path());
        let err = replicate_app(&boot_file, "nope", 2).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn zero_replicas_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let boot_file = seed(tmp.path());
        assert!(replicate_app(&boot_file, "listrev-app-s", 0).is_err());
    }
}
