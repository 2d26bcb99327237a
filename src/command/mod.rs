//! Command documents: per-application lifecycle commands.

pub mod doc;
pub mod lower;

pub use doc::{Command, CommandData, CommandId, State};
pub use lower::{AppCommands, LoweringOptions, lower_layout};
