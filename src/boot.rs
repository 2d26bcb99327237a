//! boot.json: which applications exist, where they run, how to launch them.

use crate::error::ConfigurationError;
use crate::topology::AppLayout;
use serde::Serialize;
use std::collections::BTreeMap;

pub const APP_BASE_PORT: u16 = 3333;
pub const RESPONSE_LISTENER_PORT: u16 = 56789;
const DEFAULT_EXEC: &str = "daq_application";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Boot {
    pub env: BTreeMap<String, u32>,
    pub apps: BTreeMap<String, BootApp>,
    pub hosts: BTreeMap<String, String>,
    pub order: Vec<String>,
    pub response_listener: ResponseListener,
    pub exec: BTreeMap<String, ExecProfile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootApp {
    pub exec: String,
    /// Key into [`Boot::hosts`].
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResponseListener {
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecProfile {
    pub comment: String,
    pub env: BTreeMap<String, String>,
    pub cmd: Vec<String>,
}

/// Build the boot document for `layout`, every application on `host`.
pub fn generate_boot(layout: &AppLayout, host: &str) -> Result<Boot, ConfigurationError> {
    let mut apps = BTreeMap::new();
    let mut hosts = BTreeMap::new();
    for (i, app) in layout.apps().iter().enumerate() {
        let port = u16::try_from(i)
            .ok()
            .and_then(|i| APP_BASE_PORT.checked_add(i))
            .ok_or_else(|| ConfigurationError::InvalidLayout(format!(
                "no application port left for {}",
                app.name
            )))?;
        let host_key = format!("host_{}", app.name);
        hosts.insert(host_key.clone(), host.to_string());
        apps.insert(
            app.name.clone(),
            BootApp {
                exec: DEFAULT_EXEC.to_string(),
                host: host_key,
                port,
            },
        );
    }

    Ok(Boot {
        env: BTreeMap::from([("DUNEDAQ_ERS_VERBOSITY_LEVEL".to_string(), 1)]),
        apps,
        hosts,
        order: layout.order().to_vec(),
        response_listener: ResponseListener {
            port: RESPONSE_LISTENER_PORT,
        },
        exec: exec_profiles(),
    })
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Variables inherited from the launching environment.
fn getenv(keys: &[&str]) -> BTreeMap<String, String> {
    keys.iter()
        .map(|k| (k.to_string(), "getenv".to_string()))
        .collect()
}

fn exec_profiles() -> BTreeMap<String, ExecProfile> {
    BTreeMap::from([
        (
            "daq_application_ups".to_string(),
            ExecProfile {
                comment: "Application profile based on a full dbt runtime environment"
                    .to_string(),
                env: getenv(&["DBT_AREA_ROOT"]),
                cmd: strings(&[
                    "CMD_FAC=rest://localhost:${APP_PORT}",
                    "INFO_SVC=file://info_${APP_ID}_${APP_PORT}.json",
                    "cd ${DBT_AREA_ROOT}",
                    "source dbt-setup-env.sh",
                    "dbt-setup-runtime-environment",
                    "cd ${APP_WD}",
                    "daq_application --name ${APP_ID} -c ${CMD_FAC} -i ${INFO_SVC}",
                ]),
            },
        ),
        (
            DEFAULT_EXEC.to_string(),
            ExecProfile {
                comment: "Application profile using PATH variables (lower start time)"
                    .to_string(),
                env: getenv(&[
                    "CET_PLUGIN_PATH",
                    "DUNEDAQ_SHARE_PATH",
                    "LD_LIBRARY_PATH",
                    "PATH",
                ]),
                cmd: strings(&[
                    "CMD_FAC=rest://localhost:${APP_PORT}",
                    "INFO_SVC=file://info_${APP_NAME}_${APP_PORT}.json",
                    "cd ${APP_WD}",
                    "daq_application --name ${APP_NAME} -c ${CMD_FAC} -i ${INFO_SVC}",
                ]),
            },
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{BuildOptions, RoleSet, TopologySpec, build_module_graph};
    use pretty_assertions::assert_eq;

    #[test]
    fn apps_get_consecutive_ports_on_host() {
        let topo = TopologySpec::default().validate().unwrap();
        let graph = build_module_graph(&topo, &BuildOptions::default()).unwrap();
        let sets: Vec<RoleSet> = ["g", "rv"].iter().map(|s| s.parse().unwrap()).collect();
        let layout = AppLayout::new(&graph, &sets).unwrap();

        let boot = generate_boot(&layout, "np04-srv-001").unwrap();
        assert_eq!(boot.apps["listrev-app-g"].port, 3333);
        assert_eq!(boot.apps["listrev-app-rv"].port, 3334);
        assert_eq!(boot.hosts["host_listrev-app-rv"], "np04-srv-001");
        assert_eq!(boot.order, ["listrev-app-g", "listrev-app-rv"]);
        assert_eq!(boot.response_listener.port, RESPONSE_LISTENER_PORT);
        assert!(boot.exec.contains_key("daq_application"));
    }
}
