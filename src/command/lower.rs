//! Lower application slices into lifecycle command documents.

use crate::command::doc::{
    AddressedCmd, AddressedEntry, Command, CommandData, CommandId, ConnRef, ConnectionId,
    ConnectionSpec, EmptyParams, EntryData, InitData, ModuleInitData, ModuleSpec, ResumeParams,
    StartParams,
};
use crate::error::ConfigurationError;
use crate::topology::{AppLayout, AppSlice, ConnectionScope};
use std::collections::BTreeMap;

pub const DEFAULT_QUEUE_KIND: &str = "FollySPSCQueue";
pub const DEFAULT_QUEUE_CAPACITY: u32 = 100;
pub const DEFAULT_CONNECTION_PORT: u16 = 12345;
pub const DEFAULT_RUN_NUMBER: u32 = 333;
const TRIGGER_INTERVAL_TICKS: u64 = 50_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweringOptions {
    pub host: String,
    pub run_number: u32,
    /// First port handed out to network and pub/sub connections.
    pub base_port: u16,
    pub queue_kind: String,
    pub queue_capacity: u32,
}

impl Default for LoweringOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            run_number: DEFAULT_RUN_NUMBER,
            base_port: DEFAULT_CONNECTION_PORT,
            queue_kind: DEFAULT_QUEUE_KIND.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Transport chosen for each logical connection across all applications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionPlan {
    uris: BTreeMap<String, String>,
}

impl ConnectionPlan {
    /// Local connections become queues; the rest get `tcp://host:port`
    /// with ports allocated in logical-name order from `base_port`.
    pub fn new(layout: &AppLayout, opts: &LoweringOptions) -> Result<Self, ConfigurationError> {
        let mut scopes = BTreeMap::<&str, ConnectionScope>::new();
        for app in layout.apps() {
            for conn in &app.connections {
                scopes.insert(conn.name.as_str(), conn.scope);
            }
        }

        let mut uris = BTreeMap::new();
        let mut next_port = Some(opts.base_port);
        for (name, scope) in scopes {
            let uri = match scope {
                ConnectionScope::Local => {
                    format!("queue://{}:{}", opts.queue_kind, opts.queue_capacity)
                }
                ConnectionScope::Network | ConnectionScope::PubSub => {
                    let port = next_port.ok_or_else(|| ConfigurationError::InvalidParameter {
                        name: "base_port",
                        reason: format!("ran out of ports for connection {}", name),
                    })?;
                    next_port = port.checked_add(1);
                    format!("tcp://{}:{}", opts.host, port)
                }
            };
            uris.insert(name.to_string(), uri);
        }
        Ok(Self { uris })
    }

    pub fn uri(&self, name: &str) -> Option<&str> {
        self.uris.get(name).map(String::as_str)
    }
}

/// Command documents of one application.
#[derive(Debug, Clone, PartialEq)]
pub struct AppCommands {
    pub app: String,
    pub commands: BTreeMap<CommandId, Command>,
}

pub fn lower_layout(
    layout: &AppLayout,
    opts: &LoweringOptions,
) -> Result<Vec<AppCommands>, ConfigurationError> {
    let plan = ConnectionPlan::new(layout, opts)?;
    tracing::debug!(connections = plan.uris.len(), "allocated connection uris");
    layout
        .apps()
        .iter()
        .map(|app| lower_app(app, &plan, opts))
        .collect()
}

pub fn lower_app(
    app: &AppSlice,
    plan: &ConnectionPlan,
    opts: &LoweringOptions,
) -> Result<AppCommands, ConfigurationError> {
    let mut commands = BTreeMap::new();
    for id in CommandId::ALL {
        let data = match id {
            CommandId::Init => CommandData::Init(init_data(app, plan)?),
            CommandId::Conf => CommandData::Addressed(AddressedCmd {
                modules: app
                    .modules
                    .iter()
                    .map(|m| AddressedEntry {
                        pattern: m.name.clone(),
                        data: EntryData::Conf(m.params.clone()),
                    })
                    .collect(),
            }),
            CommandId::Start => addressed(
                ".*",
                EntryData::Start(StartParams {
                    run: opts.run_number,
                    disable_data_storage: false,
                }),
            ),
            CommandId::Resume => addressed(
                ".*",
                EntryData::Resume(ResumeParams {
                    trigger_interval_ticks: TRIGGER_INTERVAL_TICKS,
                }),
            ),
            CommandId::Stop => addressed(".*", EntryData::Empty(EmptyParams {})),
            CommandId::Pause | CommandId::Scrap => addressed("", EntryData::Empty(EmptyParams {})),
        };
        commands.insert(id, Command::new(id, data));
    }
    Ok(AppCommands {
        app: app.name.clone(),
        commands,
    })
}

fn addressed(pattern: &str, data: EntryData) -> CommandData {
    CommandData::Addressed(AddressedCmd {
        modules: vec![AddressedEntry {
            pattern: pattern.to_string(),
            data,
        }],
    })
}

fn init_data(app: &AppSlice, plan: &ConnectionPlan) -> Result<InitData, ConfigurationError> {
    let mut connections = Vec::new();
    for conn in &app.connections {
        let uri = plan
            .uri(&conn.name)
            .ok_or_else(|| ConfigurationError::MissingProducer(conn.name.clone()))?;
        let connection_type = match conn.scope {
            ConnectionScope::Local => "kQueue",
            ConnectionScope::Network => "kSendRecv",
            ConnectionScope::PubSub => "kPubSub",
        };
        connections.push(ConnectionSpec {
            id: ConnectionId {
                uid: conn.name.clone(),
                data_type: conn.payload.to_string(),
            },
            connection_type: connection_type.to_string(),
            uri: uri.to_string(),
        });
    }

    let modules = app
        .modules
        .iter()
        .map(|m| {
            let conn_refs = app
                .connections
                .iter()
                .flat_map(|c| c.endpoints.iter())
                .filter(|e| e.module() == m.name)
                .map(|e| ConnRef {
                    name: e.module_port.port.clone(),
                    uid: e.logical_name.clone(),
                    dir: e.direction.as_str().to_string(),
                })
                .collect();
            ModuleSpec {
                inst: m.name.clone(),
                plugin: m.plugin.to_string(),
                data: ModuleInitData {
                    conf_type: m.conf_type.clone(),
                    conn_refs,
                },
            }
        })
        .collect();

    Ok(InitData {
        modules,
        connections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::doc::State;
    use crate::topology::{BuildOptions, RoleSet, TopologySpec, build_module_graph};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn layout(apps: &[&str]) -> AppLayout {
        let topo = TopologySpec::default().validate().unwrap();
        let graph = build_module_graph(&topo, &BuildOptions::default()).unwrap();
        let sets: Vec<RoleSet> = apps.iter().map(|s| s.parse().unwrap()).collect();
        AppLayout::new(&graph, &sets).unwrap()
    }

    #[rstest]
    #[case(CommandId::Init, State::None, State::Initial)]
    #[case(CommandId::Conf, State::Initial, State::Configured)]
    #[case(CommandId::Start, State::Configured, State::Running)]
    #[case(CommandId::Pause, State::Running, State::Running)]
    #[case(CommandId::Resume, State::Running, State::Running)]
    #[case(CommandId::Stop, State::Running, State::Configured)]
    #[case(CommandId::Scrap, State::Configured, State::Initial)]
    fn commands_carry_transitions(#[case] id: CommandId, #[case] entry: State, #[case] exit: State) {
        let cmds = lower_layout(&layout(&[]), &LoweringOptions::default()).unwrap();
        let cmd = &cmds[0].commands[&id];
        assert_eq!((cmd.entry_state, cmd.exit_state), (entry, exit));
    }

    #[test]
    fn start_carries_run_number() {
        let opts = LoweringOptions {
            run_number: 101,
            ..LoweringOptions::default()
        };
        let cmds = lower_layout(&layout(&[]), &opts).unwrap();
        let json = serde_json::to_value(&cmds[0].commands[&CommandId::Start]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "start",
                "entry_state": "CONFIGURED",
                "exit_state": "RUNNING",
                "data": {"modules": [{"match": ".*", "data": {"run": 101, "disable_data_storage": false}}]}
            })
        );
    }

    #[test]
    fn pause_and_resume_payloads() {
        let cmds = lower_layout(&layout(&[]), &LoweringOptions::default()).unwrap();
        let pause = serde_json::to_value(&cmds[0].commands[&CommandId::Pause]).unwrap();
        assert_eq!(
            pause["data"],
            serde_json::json!({"modules": [{"match": "", "data": {}}]})
        );
        let resume = serde_json::to_value(&cmds[0].commands[&CommandId::Resume]).unwrap();
        assert_eq!(
            resume,
            serde_json::json!({
                "id": "resume",
                "entry_state": "RUNNING",
                "exit_state": "RUNNING",
                "data": {"modules": [{"match": ".*", "data": {"trigger_interval_ticks": 50000000}}]}
            })
        );
    }

    #[test]
    fn conf_addresses_each_module() {
        let cmds = lower_layout(&layout(&[]), &LoweringOptions::default()).unwrap();
        let json = serde_json::to_value(&cmds[0].commands[&CommandId::Conf]).unwrap();
        let modules = json["data"]["modules"].as_array().unwrap();
        let matches: Vec<_> = modules.iter().map(|m| m["match"].as_str().unwrap()).collect();
        assert_eq!(matches, ["rdlg0", "lr0", "lrv"]);
        assert_eq!(modules[0]["data"]["generator_id"], 0);
        assert_eq!(modules[2]["data"]["max_list_size"], 200);
    }

    #[test]
    fn split_apps_share_network_uris() {
        let cmds = lower_layout(&layout(&["gr", "v"]), &LoweringOptions::default()).unwrap();
        let uri_in = |app: usize, uid: &str| {
            let CommandData::Init(init) = &cmds[app].commands[&CommandId::Init].data else {
                panic!("init data expected");
            };
            init.connections
                .iter()
                .find(|c| c.id.uid == uid)
                .map(|c| (c.connection_type.clone(), c.uri.clone()))
                .unwrap()
        };
        let a = uri_in(0, "lr0_reversed_connection");
        let b = uri_in(1, "lr0_reversed_connection");
        assert_eq!(a, b);
        assert_eq!(a.0, "kSendRecv");
        assert!(a.1.starts_with("tcp://localhost:"));

        let (kind, uri) = uri_in(0, "rdlg0_lr0_list_connection");
        assert_eq!(kind, "kQueue");
        assert_eq!(uri, "queue://FollySPSCQueue:100");
    }

    #[test]
    fn ports_are_allocated_in_name_order() {
        let plan = ConnectionPlan::new(&layout(&["g", "r", "v"]), &LoweringOptions::default()).unwrap();
        assert_eq!(plan.uri("creates"), Some("tcp://localhost:12345"));
        assert_eq!(plan.uri("lr0_rdlg0_request_connection"), Some("tcp://localhost:12346"));
    }

    #[test]
    fn port_exhaustion_is_an_error() {
        let opts = LoweringOptions {
            base_port: u16::MAX,
            ..LoweringOptions::default()
        };
        let err = ConnectionPlan::new(&layout(&["g", "r", "v"]), &opts).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidParameter {
                name: "base_port",
                ..
            }
        ));
    }
}
