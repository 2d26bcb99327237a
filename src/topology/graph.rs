//! Module graph: descriptors, endpoints and the validated connection set.
//!
//! `ModuleGraph::new` is the only way to get a graph, and it only returns
//! complete ones:
//! - unique module names
//! - endpoints reference existing modules
//! - per logical connection: one endpoint kind, one producer (broadcast
//!   aside), a consumer where the kind requires one
//! - the ordering edges are acyclic

use crate::error::ConfigurationError;
use crate::topology::endpoint::{Direction, Endpoint, EndpointKind, ModulePort, PayloadType};
use crate::topology::role::Role;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratorConf {
    pub send_timeout_ms: u32,
    pub request_timeout_ms: u32,
    pub generator_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReverserConf {
    pub send_timeout_ms: u32,
    pub request_timeout_ms: u32,
    pub num_generators: u32,
    pub reverser_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatorConf {
    pub send_timeout_ms: u32,
    pub request_timeout_ms: u32,
    pub request_rate_hz: u32,
    pub max_outstanding_requests: u32,
    pub num_reversers: u32,
    pub num_generators: u32,
    pub min_list_size: u32,
    pub max_list_size: u32,
}

/// Role-specific configuration, serialized as the module's `conf` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ModuleParams {
    Generator(GeneratorConf),
    Reverser(ReverserConf),
    Validator(ValidatorConf),
}

impl ModuleParams {
    pub fn role(&self) -> Role {
        match self {
            ModuleParams::Generator(_) => Role::Generator,
            ModuleParams::Reverser(_) => Role::Reverser,
            ModuleParams::Validator(_) => Role::Validator,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    pub name: String,
    pub role: Role,
    pub plugin: &'static str,
    /// Fully qualified configuration type, e.g.
    /// `dunedaq.listrev.listreverser.ConfParams`.
    pub conf_type: String,
    pub params: ModuleParams,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>, schema_namespace: &str, params: ModuleParams) -> Self {
        let role = params.role();
        Self {
            name: name.into(),
            role,
            plugin: role.plugin(),
            conf_type: format!("{}.{}.ConfParams", schema_namespace, role.schema_module()),
            params,
        }
    }
}

/// All endpoints sharing one logical name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub name: String,
    pub kind: EndpointKind,
    pub payload: PayloadType,
    pub producers: Vec<ModulePort>,
    pub consumers: Vec<ModulePort>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleGraph {
    modules: Vec<ModuleDescriptor>,
    endpoints: Vec<Endpoint>,
    connections: BTreeMap<String, Connection>,
    order: Vec<String>,
}

impl ModuleGraph {
    /// Validate descriptors and endpoints and assemble the graph.
    pub fn new(
        modules: Vec<ModuleDescriptor>,
        endpoints: Vec<Endpoint>,
    ) -> Result<Self, ConfigurationError> {
        // 1) Unique module names.
        let mut index = BTreeMap::<&str, usize>::new();
        for (i, m) in modules.iter().enumerate() {
            if index.insert(m.name.as_str(), i).is_some() {
                return Err(ConfigurationError::DuplicateModule(m.name.clone()));
            }
        }

        // 2) Group endpoints by logical name.
        let mut connections = BTreeMap::<String, Connection>::new();
        for ep in &endpoints {
            if !index.contains_key(ep.module()) {
                return Err(ConfigurationError::UnknownModule {
                    module: ep.module().to_string(),
                    port: ep.module_port.to_string(),
                });
            }
            let conn = connections
                .entry(ep.logical_name.clone())
                .or_insert_with(|| Connection {
                    name: ep.logical_name.clone(),
                    kind: ep.kind,
                    payload: ep.payload,
                    producers: vec![],
                    consumers: vec![],
                });
            if conn.kind != ep.kind || conn.payload != ep.payload {
                return Err(ConfigurationError::MixedEndpointKinds {
                    name: ep.logical_name.clone(),
                });
            }
            match ep.direction {
                Direction::Out => conn.producers.push(ep.module_port.clone()),
                Direction::In => conn.consumers.push(ep.module_port.clone()),
            }
        }

        // 3) Producer/consumer invariants.
        for conn in connections.values() {
            if conn.kind.is_broadcast() {
                continue;
            }
            match conn.producers.len() {
                0 => return Err(ConfigurationError::MissingProducer(conn.name.clone())),
                1 => {}
                count => {
                    return Err(ConfigurationError::MultipleProducers {
                        name: conn.name.clone(),
                        count,
                    });
                }
            }
            if conn.kind.requires_consumer() && conn.consumers.is_empty() {
                return Err(ConfigurationError::MissingConsumer(conn.name.clone()));
            }
        }

        // 4) Ordering.
        let children = dependency_edges(&connections);
        let names: Vec<&str> = modules.iter().map(|m| m.name.as_str()).collect();
        let order = topological_order(&names, &children)?;

        Ok(Self {
            modules,
            endpoints,
            connections,
            order,
        })
    }

    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn modules_with_role(&self, role: Role) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.iter().filter(move |m| m.role == role)
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn endpoints_of<'a>(&'a self, module: &'a str) -> impl Iterator<Item = &'a Endpoint> {
        self.endpoints.iter().filter(move |e| e.module() == module)
    }

    pub fn connections(&self) -> &BTreeMap<String, Connection> {
        &self.connections
    }

    /// Module -> downstream modules, over ordering connections only.
    pub fn dependencies(&self) -> BTreeMap<String, BTreeSet<String>> {
        dependency_edges(&self.connections)
    }

    /// Module names in dependency order (producers before consumers).
    /// Ties keep descriptor order.
    pub fn order(&self) -> &[String] {
        &self.order
    }
}

fn dependency_edges(
    connections: &BTreeMap<String, Connection>,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut children = BTreeMap::<String, BTreeSet<String>>::new();
    for conn in connections.values().filter(|c| c.kind.is_ordered()) {
        for p in &conn.producers {
            for c in &conn.consumers {
                children
                    .entry(p.module.clone())
                    .or_default()
                    .insert(c.module.clone());
            }
        }
    }
    children
}

/// Kahn's algorithm with the ready set ordered by descriptor position. On
/// leftovers a DFS finds one cycle to report.
fn topological_order(
    names: &[&str],
    children: &BTreeMap<String, BTreeSet<String>>,
) -> Result<Vec<String>, ConfigurationError> {
    let position: BTreeMap<&str, usize> = names.iter().enumerate().map(|(i, n)| (*n, i)).collect();

    let mut indegree = vec![0usize; names.len()];
    for kids in children.values() {
        for k in kids {
            if let Some(&i) = position.get(k.as_str()) {
                indegree[i] += 1;
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..names.len()).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(names.len());
    while let Some(i) = ready.pop_first() {
        order.push(names[i].to_string());
        if let Some(kids) = children.get(names[i]) {
            for k in kids {
                if let Some(&j) = position.get(k.as_str()) {
                    indegree[j] -= 1;
                    if indegree[j] == 0 {
                        ready.insert(j);
                    }
                }
            }
        }
    }

    if order.len() == names.len() {
        return Ok(order);
    }

    // Cycle detection (DFS coloring) for the error message.
    #[derive(Copy, Clone, PartialEq, Eq)]
    enum Mark {
        Temp,
        Perm,
    }

    fn dfs(
        v: &str,
        children: &BTreeMap<String, BTreeSet<String>>,
        marks: &mut BTreeMap<String, Mark>,
        stack: &mut Vec<String>,
    ) -> Option<String> {
        match marks.get(v) {
            Some(Mark::Perm) => return None,
            Some(Mark::Temp) => {
                // v is in the current recursion stack => cycle
                let start = stack.iter().position(|s| s == v).unwrap_or(0);
                let mut path = stack[start..].to_vec();
                path.push(v.to_string());
                return Some(path.join(" -> "));
            }
            None => {}
        }

        marks.insert(v.to_string(), Mark::Temp);
        stack.push(v.to_string());
        if let Some(kids) = children.get(v) {
            for k in kids {
                if let Some(cycle) = dfs(k, children, marks, stack) {
                    return Some(cycle);
                }
            }
        }
        stack.pop();
        marks.insert(v.to_string(), Mark::Perm);
        None
    }

    let done: BTreeSet<&str> = order.iter().map(String::as_str).collect();
    let mut marks = BTreeMap::new();
    for n in names.iter().filter(|n| !done.contains(*n)) {
        let mut stack = Vec::new();
        if let Some(cycle) = dfs(n, children, &mut marks, &mut stack) {
            return Err(ConfigurationError::Cycle(cycle));
        }
    }
    Err(ConfigurationError::Cycle(
        names
            .iter()
            .filter(|n| !done.contains(*n))
            .copied()
            .collect::<Vec<_>>()
            .join(", "),
    ))
}
