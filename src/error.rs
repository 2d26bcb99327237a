//! Errors raised while assembling a listrev topology.

use thiserror::Error;

/// Rejection of a topology, layout or wiring request.
///
/// Raised synchronously by the builder and layout code; callers abort
/// configuration generation on any variant. A graph is never returned
/// alongside one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("{what} count must be a positive integer, got {value}")]
    InvalidCount { what: &'static str, value: i64 },

    #[error("validator parameters were supplied but the validator is disabled")]
    ValidatorParamsWithoutValidator,

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("duplicate module name: {0}")]
    DuplicateModule(String),

    #[error("endpoint {port} references unknown module {module}")]
    UnknownModule { module: String, port: String },

    #[error("connection {0} has no producer")]
    MissingProducer(String),

    #[error("connection {0} has no consumer")]
    MissingConsumer(String),

    #[error("connection {name} has {count} producers, expected exactly one")]
    MultipleProducers { name: String, count: usize },

    #[error("connection {name} mixes endpoint kinds")]
    MixedEndpointKinds { name: String },

    #[error("dependency cycle among modules: {0}")]
    Cycle(String),

    #[error("invalid app layout: {0}")]
    InvalidLayout(String),
}
