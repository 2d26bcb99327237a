//! Topology parameters: raw input (serde-friendly) and the validated form.
//!
//! Two representations:
//! - TopologySpec: what a config file or the CLI supplies (signed, optional)
//! - Topology: checked counts and tuning values the builder consumes
//!
//! Only `TopologySpec::validate` produces a Topology.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};

/// Raw topology request.
///
/// Counts are signed so that a negative value in a config file is reported
/// as an invalid count instead of a JSON type error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TopologySpec {
    pub n_generators: i64,
    pub n_reversers: i64,
    pub has_validator: bool,
    /// Millisecs a module waits on a send before giving up.
    pub n_wait_ms: u32,
    pub request_timeout_ms: u32,
    /// Validator tuning; only legal when `has_validator` is set.
    pub validator: Option<ValidatorSpec>,
}

impl Default for TopologySpec {
    fn default() -> Self {
        Self {
            n_generators: 1,
            n_reversers: 1,
            has_validator: true,
            n_wait_ms: 100,
            request_timeout_ms: 1000,
            validator: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ValidatorSpec {
    pub request_rate_hz: u32,
    pub max_outstanding_requests: u32,
    pub min_list_size: u32,
    pub max_list_size: u32,
}

impl Default for ValidatorSpec {
    fn default() -> Self {
        Self {
            request_rate_hz: 10,
            max_outstanding_requests: 100,
            min_list_size: 50,
            max_list_size: 200,
        }
    }
}

/// Timeouts shared by every module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timing {
    pub send_timeout_ms: u32,
    pub request_timeout_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidatorParams {
    pub request_rate_hz: u32,
    pub max_outstanding_requests: u32,
    pub min_list_size: u32,
    pub max_list_size: u32,
}

/// Validated topology, ready for [`crate::topology::build_module_graph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub generators: u32,
    pub reversers: u32,
    pub timing: Timing,
    pub validator: Option<ValidatorParams>,
}

impl Topology {
    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }
}

impl TopologySpec {
    /// Check counts and tuning values and build a [`Topology`]:
    /// - generator and reverser counts are positive
    /// - validator tuning only when the validator is enabled
    /// - list sizes, rates and limits are usable
    pub fn validate(&self) -> Result<Topology, ConfigurationError> {
        let generators = positive_count("generator", self.n_generators)?;
        let reversers = positive_count("reverser", self.n_reversers)?;

        if self.request_timeout_ms == 0 {
            return Err(ConfigurationError::InvalidParameter {
                name: "request_timeout_ms",
                reason: "must be positive".to_string(),
            });
        }

        let validator = match (self.has_validator, &self.validator) {
            (false, Some(_)) => return Err(ConfigurationError::ValidatorParamsWithoutValidator),
            (false, None) => None,
            (true, spec) => Some(spec.clone().unwrap_or_default().validate()?),
        };

        Ok(Topology {
            generators,
            reversers,
            timing: Timing {
                send_timeout_ms: self.n_wait_ms,
                request_timeout_ms: self.request_timeout_ms,
            },
            validator,
        })
    }
}

impl ValidatorSpec {
    fn validate(&self) -> Result<ValidatorParams, ConfigurationError> {
        if self.request_rate_hz == 0 {
            return Err(ConfigurationError::InvalidParameter {
                name: "request_rate_hz",
                reason: "must be positive".to_string(),
            });
        }
        if self.max_outstanding_requests == 0 {
            return Err(ConfigurationError::InvalidParameter {
                name: "max_outstanding_requests",
                reason: "must be positive".to_string(),
            });
        }
        if self.min_list_size > self.max_list_size {
            return Err(ConfigurationError::InvalidParameter {
                name: "min_list_size",
                reason: format!(
                    "{} exceeds max_list_size {}",
                    self.min_list_size, self.max_list_size
                ),
            });
        }
        Ok(ValidatorParams {
            request_rate_hz: self.request_rate_hz,
            max_outstanding_requests: self.max_outstanding_requests,
            min_list_size: self.min_list_size,
            max_list_size: self.max_list_size,
        })
    }
}

fn positive_count(what: &'static str, value: i64) -> Result<u32, ConfigurationError> {
    if value <= 0 {
        return Err(ConfigurationError::InvalidCount { what, value });
    }
    u32::try_from(value).map_err(|_| ConfigurationError::InvalidCount { what, value })
}
