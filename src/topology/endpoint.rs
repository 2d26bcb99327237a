//! Endpoints: one module port attached to a named logical connection.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::In => "kInput",
            Direction::Out => "kOutput",
        }
    }
}

/// Payload carried over a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PayloadType {
    IntList,
    ReversedList,
    RequestList,
    CreateList,
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PayloadType::IntList => "IntList",
            PayloadType::ReversedList => "ReversedList",
            PayloadType::RequestList => "RequestList",
            PayloadType::CreateList => "CreateList",
        };
        f.write_str(s)
    }
}

/// How a logical connection is checked and ordered.
///
/// | kind      | producers | consumers | ordering |
/// |-----------|-----------|-----------|----------|
/// | Stream    | 1         | >= 1      | yes      |
/// | Request   | 1         | >= 1      | no       |
/// | Broadcast | any       | any       | no       |
/// | Terminal  | 1         | any       | yes      |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum EndpointKind {
    Stream,
    /// Pull requests flowing against the data direction.
    Request,
    Broadcast,
    /// Output left open for a consumer outside the graph.
    Terminal,
}

impl EndpointKind {
    pub fn is_broadcast(self) -> bool {
        self == EndpointKind::Broadcast
    }

    /// Whether edges over this connection take part in dependency ordering.
    pub fn is_ordered(self) -> bool {
        matches!(self, EndpointKind::Stream | EndpointKind::Terminal)
    }

    pub fn requires_consumer(self) -> bool {
        matches!(self, EndpointKind::Stream | EndpointKind::Request)
    }
}

/// `module.port`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ModulePort {
    pub module: String,
    pub port: String,
}

impl ModulePort {
    pub fn new(module: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for ModulePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Endpoint {
    pub logical_name: String,
    pub module_port: ModulePort,
    pub direction: Direction,
    pub payload: PayloadType,
    pub kind: EndpointKind,
}

impl Endpoint {
    pub fn new(
        logical_name: impl Into<String>,
        module_port: ModulePort,
        direction: Direction,
        payload: PayloadType,
        kind: EndpointKind,
    ) -> Self {
        Self {
            logical_name: logical_name.into(),
            module_port,
            direction,
            payload,
            kind,
        }
    }

    pub fn module(&self) -> &str {
        &self.module_port.module
    }
}
