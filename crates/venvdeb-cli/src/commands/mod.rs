//! CLI command implementations

pub mod package;
pub mod publish;
