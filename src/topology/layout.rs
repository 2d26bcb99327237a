//! Partition a module graph into applications.
//!
//! Each application hosts every instance of the roles in its role set. A
//! connection whose endpoints all live in one application becomes a local
//! queue there; anything crossing applications goes over the network.

use crate::error::ConfigurationError;
use crate::topology::endpoint::{Endpoint, EndpointKind, PayloadType};
use crate::topology::graph::{ModuleDescriptor, ModuleGraph};
use crate::topology::role::{Role, RoleSet};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const APP_NAME_PREFIX: &str = "listrev-app";

/// Name used when one application hosts everything.
pub const SINGLE_APP_NAME: &str = "listrev-app-s";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ConnectionScope {
    /// In-process queue; producer and consumers share the application.
    Local,
    /// Crosses applications, or leaves the graph entirely.
    Network,
    /// Publish/subscribe notification.
    PubSub,
}

/// One connection as seen from inside an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConnection {
    pub name: String,
    pub payload: PayloadType,
    pub scope: ConnectionScope,
    /// Endpoints of this application's modules on the connection.
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSlice {
    pub name: String,
    pub roles: RoleSet,
    pub modules: Vec<ModuleDescriptor>,
    pub connections: Vec<AppConnection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLayout {
    apps: Vec<AppSlice>,
    order: Vec<String>,
}

impl AppLayout {
    /// Place the graph's modules into applications.
    ///
    /// An empty `role_sets` means a single application holding every role
    /// present in the graph.
    pub fn new(graph: &ModuleGraph, role_sets: &[RoleSet]) -> Result<Self, ConfigurationError> {
        let present: BTreeSet<Role> = graph.modules().iter().map(|m| m.role).collect();

        let role_sets: Vec<RoleSet> = if role_sets.is_empty() {
            vec![present.iter().copied().collect()]
        } else {
            role_sets.to_vec()
        };

        // 1) Every present role placed exactly once; nothing absent placed.
        let mut placed = BTreeMap::<Role, usize>::new();
        for (i, set) in role_sets.iter().enumerate() {
            for role in set.iter() {
                if !present.contains(&role) {
                    return Err(ConfigurationError::InvalidLayout(format!(
                        "app {:?} hosts {} but the topology has none",
                        set.letters(),
                        role
                    )));
                }
                if let Some(prev) = placed.insert(role, i) {
                    return Err(ConfigurationError::InvalidLayout(format!(
                        "{} placed in both {:?} and {:?}",
                        role,
                        role_sets[prev].letters(),
                        set.letters()
                    )));
                }
            }
        }
        if let Some(missing) = present.iter().find(|r| !placed.contains_key(*r)) {
            return Err(ConfigurationError::InvalidLayout(format!(
                "no app hosts {}",
                missing
            )));
        }

        // 2) Names.
        let names: Vec<String> = if role_sets.len() == 1 {
            vec![SINGLE_APP_NAME.to_string()]
        } else {
            role_sets
                .iter()
                .map(|s| format!("{}-{}", APP_NAME_PREFIX, s.letters()))
                .collect()
        };

        let app_of_module: BTreeMap<&str, usize> = graph
            .modules()
            .iter()
            .map(|m| (m.name.as_str(), placed[&m.role]))
            .collect();

        // 3) Slices.
        let mut apps = Vec::with_capacity(role_sets.len());
        for (i, (name, roles)) in names.into_iter().zip(role_sets).enumerate() {
            let modules: Vec<ModuleDescriptor> = graph
                .modules()
                .iter()
                .filter(|m| app_of_module[m.name.as_str()] == i)
                .cloned()
                .collect();

            let mut connections = Vec::new();
            for conn in graph.connections().values() {
                let endpoints: Vec<Endpoint> = graph
                    .endpoints()
                    .iter()
                    .filter(|e| e.logical_name == conn.name && app_of_module[e.module()] == i)
                    .cloned()
                    .collect();
                if endpoints.is_empty() {
                    continue;
                }

                let all_local = conn
                    .producers
                    .iter()
                    .chain(&conn.consumers)
                    .all(|p| app_of_module[p.module.as_str()] == i);
                let scope = match conn.kind {
                    EndpointKind::Broadcast => ConnectionScope::PubSub,
                    EndpointKind::Terminal => ConnectionScope::Network,
                    _ if all_local => ConnectionScope::Local,
                    _ => ConnectionScope::Network,
                };

                connections.push(AppConnection {
                    name: conn.name.clone(),
                    payload: conn.payload,
                    scope,
                    endpoints,
                });
            }

            apps.push(AppSlice {
                name,
                roles,
                modules,
                connections,
            });
        }

        // Applications in the order their first module appears in the
        // dependency order.
        let mut order = Vec::new();
        for module in graph.order() {
            let app = &apps[app_of_module[module.as_str()]].name;
            if !order.contains(app) {
                order.push(app.clone());
            }
        }

        Ok(Self { apps, order })
    }

    pub fn apps(&self) -> &[AppSlice] {
        &self.apps
    }

    /// Application names, upstream first.
    pub fn order(&self) -> &[String] {
        &self.order
    }
}
