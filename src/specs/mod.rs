//! Built-in completion specs.

pub mod softwareupdate;

use crate::config::EngineConfig;
use crate::spec_model::CompletionSpec;

/// Built-in completion specs for common commands
pub fn builtin_specs(config: &EngineConfig) -> Vec<CompletionSpec> {
    vec![softwareupdate::spec(config.installer_size_units)]
}
