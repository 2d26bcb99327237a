//! Lifecycle command documents, in the shape the application framework reads.

use crate::topology::ModuleParams;
use serde::Serialize;
use std::fmt;

/// Run-control state of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    None,
    Initial,
    Configured,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandId {
    Init,
    Conf,
    Start,
    Stop,
    Pause,
    Resume,
    Scrap,
}

impl CommandId {
    /// Every command written per application, in issue order.
    pub const ALL: [CommandId; 7] = [
        CommandId::Init,
        CommandId::Conf,
        CommandId::Start,
        CommandId::Stop,
        CommandId::Pause,
        CommandId::Resume,
        CommandId::Scrap,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommandId::Init => "init",
            CommandId::Conf => "conf",
            CommandId::Start => "start",
            CommandId::Stop => "stop",
            CommandId::Pause => "pause",
            CommandId::Resume => "resume",
            CommandId::Scrap => "scrap",
        }
    }

    /// (entry, exit) states of the transition.
    pub fn transition(self) -> (State, State) {
        match self {
            CommandId::Init => (State::None, State::Initial),
            CommandId::Conf => (State::Initial, State::Configured),
            CommandId::Start => (State::Configured, State::Running),
            CommandId::Stop => (State::Running, State::Configured),
            CommandId::Pause | CommandId::Resume => (State::Running, State::Running),
            CommandId::Scrap => (State::Configured, State::Initial),
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub id: CommandId,
    pub entry_state: State,
    pub exit_state: State,
    pub data: CommandData,
}

impl Command {
    pub fn new(id: CommandId, data: CommandData) -> Self {
        let (entry_state, exit_state) = id.transition();
        Self {
            id,
            entry_state,
            exit_state,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandData {
    Init(InitData),
    Addressed(AddressedCmd),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitData {
    pub modules: Vec<ModuleSpec>,
    pub connections: Vec<ConnectionSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleSpec {
    pub inst: String,
    pub plugin: String,
    pub data: ModuleInitData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleInitData {
    pub conf_type: String,
    pub conn_refs: Vec<ConnRef>,
}

/// A module port bound to a connection uid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnRef {
    pub name: String,
    pub uid: String,
    pub dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionSpec {
    pub id: ConnectionId,
    pub connection_type: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionId {
    pub uid: String,
    pub data_type: String,
}

/// Command payload addressed to modules by name pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressedCmd {
    pub modules: Vec<AddressedEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressedEntry {
    #[serde(rename = "match")]
    pub pattern: String,
    pub data: EntryData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntryData {
    Conf(ModuleParams),
    Start(StartParams),
    Resume(ResumeParams),
    Empty(EmptyParams),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StartParams {
    pub run: u32,
    pub disable_data_storage: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResumeParams {
    pub trigger_interval_ticks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EmptyParams {}
