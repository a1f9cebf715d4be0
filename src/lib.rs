//! completion_core - spec-driven command line completion
//!
//! Modules:
//! - spec_model: Fig-style completion specs, validation and scope walking
//! - generator: dynamic suggestion sources (script + post-processor)
//! - installers: parser for `softwareupdate --list-full-installers` output
//! - runner: executes generator scripts with a timeout and a TTL cache
//! - resolver: turns typed tokens into ordered, prefix-filtered suggestions
//! - engine: spec registry and whole-line completion
//! - session: last-request-wins completion requests
//! - specs: built-in specs (softwareupdate)
//! - config: engine configuration file
//! - structured_log: JSON-line logging

pub mod structured_log;

pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod installers;
pub mod resolver;
pub mod runner;
pub mod session;
pub mod spec_model;
pub mod specs;
pub mod suggestion;

// Re-export key types for convenience
pub use config::EngineConfig;

pub use engine::CompletionEngine;

pub use error::{ConfigError, SpecError};

pub use generator::{Generator, GeneratorContext, PostProcess};

pub use installers::{parse_installers, InstallerRecord, SizeUnits};

pub use resolver::Resolver;

pub use runner::GeneratorRunner;

pub use session::CompletionSession;

pub use spec_model::{ArgSpec, CompletionSpec, OptionSpec, SpecIssue, SpecModel};

pub use suggestion::{Suggestion, SuggestionKind};
