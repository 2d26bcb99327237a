//! Topology layer: parameters, the module-graph builder and app layouts.
//!
//! This module is separate from command lowering and file output. It owns:
//! - role and endpoint types
//! - raw/validated topology parameters
//! - the validated ModuleGraph and its builder
//! - partitioning a graph into applications

pub mod builder;
pub mod endpoint;
pub mod graph;
pub mod layout;
pub mod params;
pub mod role;

pub use builder::{BuildOptions, build_module_graph};
pub use endpoint::{Direction, Endpoint, EndpointKind, ModulePort, PayloadType};
pub use graph::{Connection, ModuleDescriptor, ModuleGraph, ModuleParams};
pub use layout::{AppLayout, AppSlice, ConnectionScope};
pub use params::{Topology, TopologySpec, ValidatorSpec};
pub use role::{Role, RoleSet};
