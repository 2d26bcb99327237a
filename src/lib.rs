//! Configuration generator and log checker for the listrev example pipeline.
//!
//! - topology: module-graph builder and application layouts
//! - command / boot / emit: command documents and the files they land in
//! - replicate: many-app variants of a generated configuration
//! - log: exit-summary scraping and session checks

pub mod boot;
pub mod command;
pub mod emit;
pub mod error;
pub mod log;
pub mod replicate;
pub mod topology;

pub use error::ConfigurationError;

pub type Result<T> = anyhow::Result<T>;
