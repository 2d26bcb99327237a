//! Module-graph builder: a validated [`Topology`] in, a complete
//! [`ModuleGraph`] out.
//!
//! Wiring, for G generators, R reversers and an optional validator:
//!
//! ```text
//! rdlg{g}.q{r}              --rdlg{g}_lr{r}_list_connection-->  lr{r}.list_input_{g}
//! lr{r}.output              --lr{r}_reversed_connection----->   lrv.list_input_{r}
//! lrv.request_output_{r}    --lr{r}_request_connection------>   lr{r}.request_input
//! lr{r}.request_output_{g}  --lr{r}_rdlg{g}_request_connection-> rdlg{g}.request_input_{r}
//! lrv.creates_out           ==creates (broadcast)==========>   rdlg{g}.create_input
//! ```
//!
//! Without a validator the reverser output stays open as a terminal
//! connection and nothing sends requests to the reversers.

use crate::error::ConfigurationError;
use crate::topology::endpoint::{Direction, Endpoint, EndpointKind, ModulePort, PayloadType};
use crate::topology::graph::{
    GeneratorConf, ModuleDescriptor, ModuleGraph, ModuleParams, ReverserConf, ValidatorConf,
};
use crate::topology::params::Topology;

pub const DEFAULT_SCHEMA_NAMESPACE: &str = "dunedaq.listrev";
pub const VALIDATOR_NAME: &str = "lrv";
pub const CREATES_CONNECTION: &str = "creates";

/// Values the builder needs besides the topology itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Namespace the module configuration types live in.
    pub schema_namespace: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            schema_namespace: DEFAULT_SCHEMA_NAMESPACE.to_string(),
        }
    }
}

pub fn generator_name(g: u32) -> String {
    format!("rdlg{g}")
}

pub fn reverser_name(r: u32) -> String {
    format!("lr{r}")
}

fn list_connection(g: u32, r: u32) -> String {
    format!("rdlg{g}_lr{r}_list_connection")
}

fn reversed_connection(r: u32) -> String {
    format!("lr{r}_reversed_connection")
}

fn reverser_request_connection(r: u32) -> String {
    format!("lr{r}_request_connection")
}

fn generator_request_connection(r: u32, g: u32) -> String {
    format!("lr{r}_rdlg{g}_request_connection")
}

/// Collects endpoints while modules are being laid out.
#[derive(Default)]
struct Wiring {
    endpoints: Vec<Endpoint>,
}

impl Wiring {
    fn add(
        &mut self,
        logical_name: String,
        module: &str,
        port: String,
        payload: PayloadType,
        direction: Direction,
        kind: EndpointKind,
    ) {
        self.endpoints.push(Endpoint::new(
            logical_name,
            ModulePort::new(module, port),
            direction,
            payload,
            kind,
        ));
    }
}

/// Build the full module graph for `topo`.
///
/// Pure: no I/O, no shared state. Identical inputs give identical graphs.
pub fn build_module_graph(
    topo: &Topology,
    opts: &BuildOptions,
) -> Result<ModuleGraph, ConfigurationError> {
    let ns = opts.schema_namespace.as_str();
    let mut modules = Vec::new();
    let mut wiring = Wiring::default();

    for g in 0..topo.generators {
        let name = generator_name(g);
        modules.push(ModuleDescriptor::new(
            &name,
            ns,
            ModuleParams::Generator(GeneratorConf {
                send_timeout_ms: topo.timing.send_timeout_ms,
                request_timeout_ms: topo.timing.request_timeout_ms,
                generator_id: g,
            }),
        ));

        for r in 0..topo.reversers {
            wiring.add(
                list_connection(g, r),
                &name,
                format!("q{r}"),
                PayloadType::IntList,
                Direction::Out,
                EndpointKind::Stream,
            );
            wiring.add(
                generator_request_connection(r, g),
                &name,
                format!("request_input_{r}"),
                PayloadType::RequestList,
                Direction::In,
                EndpointKind::Request,
            );
        }
        wiring.add(
            CREATES_CONNECTION.to_string(),
            &name,
            "create_input".to_string(),
            PayloadType::CreateList,
            Direction::In,
            EndpointKind::Broadcast,
        );
    }

    let output_kind = if topo.has_validator() {
        EndpointKind::Stream
    } else {
        EndpointKind::Terminal
    };

    for r in 0..topo.reversers {
        let name = reverser_name(r);
        modules.push(ModuleDescriptor::new(
            &name,
            ns,
            ModuleParams::Reverser(ReverserConf {
                send_timeout_ms: topo.timing.send_timeout_ms,
                request_timeout_ms: topo.timing.request_timeout_ms,
                num_generators: topo.generators,
                reverser_id: r,
            }),
        ));

        for g in 0..topo.generators {
            wiring.add(
                list_connection(g, r),
                &name,
                format!("list_input_{g}"),
                PayloadType::IntList,
                Direction::In,
                EndpointKind::Stream,
            );
            wiring.add(
                generator_request_connection(r, g),
                &name,
                format!("request_output_{g}"),
                PayloadType::RequestList,
                Direction::Out,
                EndpointKind::Request,
            );
        }
        wiring.add(
            reversed_connection(r),
            &name,
            "output".to_string(),
            PayloadType::ReversedList,
            Direction::Out,
            output_kind,
        );
        if topo.has_validator() {
            wiring.add(
                reverser_request_connection(r),
                &name,
                "request_input".to_string(),
                PayloadType::RequestList,
                Direction::In,
                EndpointKind::Request,
            );
        }
    }

    if let Some(v) = topo.validator {
        modules.push(ModuleDescriptor::new(
            VALIDATOR_NAME,
            ns,
            ModuleParams::Validator(ValidatorConf {
                send_timeout_ms: topo.timing.send_timeout_ms,
                request_timeout_ms: topo.timing.request_timeout_ms,
                request_rate_hz: v.request_rate_hz,
                max_outstanding_requests: v.max_outstanding_requests,
                num_reversers: topo.reversers,
                num_generators: topo.generators,
                min_list_size: v.min_list_size,
                max_list_size: v.max_list_size,
            }),
        ));

        for r in 0..topo.reversers {
            wiring.add(
                reversed_connection(r),
                VALIDATOR_NAME,
                format!("list_input_{r}"),
                PayloadType::ReversedList,
                Direction::In,
                EndpointKind::Stream,
            );
            wiring.add(
                reverser_request_connection(r),
                VALIDATOR_NAME,
                format!("request_output_{r}"),
                PayloadType::RequestList,
                Direction::Out,
                EndpointKind::Request,
            );
        }
        wiring.add(
            CREATES_CONNECTION.to_string(),
            VALIDATOR_NAME,
            "creates_out".to_string(),
            PayloadType::CreateList,
            Direction::Out,
            EndpointKind::Broadcast,
        );
    }

    let graph = ModuleGraph::new(modules, wiring.endpoints)?;
    tracing::debug!(
        modules = graph.modules().len(),
        connections = graph.connections().len(),
        order = ?graph.order(),
        "built module graph"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::params::{TopologySpec, ValidatorSpec};
    use crate::topology::role::Role;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn topology(g: i64, r: i64, validator: bool) -> Topology {
        TopologySpec {
            n_generators: g,
            n_reversers: r,
            has_validator: validator,
            ..TopologySpec::default()
        }
        .validate()
        .unwrap()
    }

    fn build(g: i64, r: i64, validator: bool) -> ModuleGraph {
        build_module_graph(&topology(g, r, validator), &BuildOptions::default()).unwrap()
    }

    #[rstest]
    #[case(1, 1, true)]
    #[case(2, 1, true)]
    #[case(1, 3, true)]
    #[case(3, 2, true)]
    #[case(2, 2, false)]
    fn instance_counts_match(#[case] g: i64, #[case] r: i64, #[case] validator: bool) {
        let graph = build(g, r, validator);
        assert_eq!(graph.modules_with_role(Role::Generator).count(), g as usize);
        assert_eq!(graph.modules_with_role(Role::Reverser).count(), r as usize);
        assert_eq!(
            graph.modules_with_role(Role::Validator).count(),
            usize::from(validator)
        );
    }

    #[rstest]
    #[case(1, 1)]
    #[case(2, 1)]
    #[case(4, 3)]
    fn every_point_to_point_connection_has_one_producer(#[case] g: i64, #[case] r: i64) {
        let graph = build(g, r, true);
        for conn in graph.connections().values() {
            if conn.kind.is_broadcast() {
                continue;
            }
            assert_eq!(conn.producers.len(), 1, "{}", conn.name);
            assert!(!conn.consumers.is_empty(), "{}", conn.name);
        }
    }

    #[test]
    fn single_chain_orders_generator_reverser_validator() {
        let graph = build(1, 1, true);
        assert_eq!(graph.modules().len(), 3);
        assert_eq!(graph.order(), ["rdlg0", "lr0", "lrv"]);
    }

    #[test]
    fn two_generators_fan_into_one_reverser() {
        let graph = build(2, 1, true);

        let list_inputs: Vec<_> = graph
            .endpoints_of("lr0")
            .filter(|e| e.payload == PayloadType::IntList && e.direction == Direction::In)
            .map(|e| e.module_port.port.clone())
            .collect();
        assert_eq!(list_inputs, ["list_input_0", "list_input_1"]);

        let validator_inputs = graph
            .endpoints_of(VALIDATOR_NAME)
            .filter(|e| e.payload == PayloadType::ReversedList && e.direction == Direction::In)
            .count();
        assert_eq!(validator_inputs, 1);

        let validator_requests: Vec<_> = graph
            .endpoints_of(VALIDATOR_NAME)
            .filter(|e| e.payload == PayloadType::RequestList && e.direction == Direction::Out)
            .map(|e| e.logical_name.clone())
            .collect();
        assert_eq!(validator_requests, ["lr0_request_connection"]);
    }

    #[test]
    fn generator_fans_out_to_every_reverser() {
        let graph = build(1, 3, true);
        let outs: Vec<_> = graph
            .endpoints_of("rdlg0")
            .filter(|e| e.direction == Direction::Out)
            .map(|e| e.logical_name.clone())
            .collect();
        assert_eq!(
            outs,
            [
                "rdlg0_lr0_list_connection",
                "rdlg0_lr1_list_connection",
                "rdlg0_lr2_list_connection"
            ]
        );
    }

    #[test]
    fn creates_is_broadcast_and_unordered() {
        let graph = build(2, 1, true);
        let creates = &graph.connections()[CREATES_CONNECTION];
        assert_eq!(creates.kind, EndpointKind::Broadcast);
        assert_eq!(creates.producers.len(), 1);
        assert_eq!(creates.consumers.len(), 2);
        assert!(
            !graph.dependencies().contains_key(VALIDATOR_NAME),
            "validator must have no ordering edges"
        );
    }

    #[test]
    fn without_validator_reverser_output_is_terminal() {
        let graph = build(1, 2, false);
        assert!(graph.module(VALIDATOR_NAME).is_none());
        let out = &graph.connections()["lr1_reversed_connection"];
        assert_eq!(out.kind, EndpointKind::Terminal);
        assert!(out.consumers.is_empty());
        assert!(!graph.connections().contains_key("lr0_request_connection"));
    }

    #[test]
    fn validator_conf_counts_instances() {
        let topo = TopologySpec {
            n_generators: 3,
            n_reversers: 2,
            validator: Some(ValidatorSpec {
                request_rate_hz: 7,
                ..ValidatorSpec::default()
            }),
            ..TopologySpec::default()
        }
        .validate()
        .unwrap();
        let graph = build_module_graph(&topo, &BuildOptions::default()).unwrap();
        match &graph.module(VALIDATOR_NAME).unwrap().params {
            ModuleParams::Validator(conf) => {
                assert_eq!(conf.num_generators, 3);
                assert_eq!(conf.num_reversers, 2);
                assert_eq!(conf.request_rate_hz, 7);
            }
            other => panic!("unexpected params {other:?}"),
        }
    }

    #[test]
    fn zero_generators_is_rejected() {
        let spec = TopologySpec {
            n_generators: 0,
            ..TopologySpec::default()
        };
        assert!(matches!(
            spec.validate(),
            Err(ConfigurationError::InvalidCount {
                what: "generator",
                value: 0
            })
        ));
    }

    #[test]
    fn construction_is_deterministic() {
        let a = build(3, 2, true);
        let b = build(3, 2, true);
        assert_eq!(a, b);
        let names: Vec<_> = a.modules().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["rdlg0", "rdlg1", "rdlg2", "lr0", "lr1", "lrv"]);
    }

    #[test]
    fn schema_namespace_is_explicit() {
        let opts = BuildOptions {
            schema_namespace: "test.ns".to_string(),
        };
        let graph = build_module_graph(&topology(1, 1, true), &opts).unwrap();
        assert_eq!(
            graph.module("rdlg0").unwrap().conf_type,
            "test.ns.randomdatalistgenerator.ConfParams"
        );
    }
}
