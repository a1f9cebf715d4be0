//! Generators: dynamic suggestions produced by running a shell command.
//!
//! A generator is plain data (a script and the name of a post-processor), so
//! specs stay serializable. Post-processors are pure functions of the
//! captured stdout.

use crate::installers::{parse_installers, SizeUnits};
use crate::suggestion::{Suggestion, SuggestionKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Generator for dynamic completions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    /// Shell command line whose stdout feeds `post_process`
    pub script: String,
    /// How stdout becomes suggestions
    #[serde(default, alias = "postProcess")]
    pub post_process: PostProcess,
    /// Overrides the runner's cache TTL for this generator (0 = never cache)
    #[serde(default, alias = "cacheTtlMs", skip_serializing_if = "Option::is_none")]
    pub cache_ttl_ms: Option<u64>,
}

impl Generator {
    pub fn new(script: impl Into<String>, post_process: PostProcess) -> Self {
        Self {
            script: script.into(),
            post_process,
            cache_ttl_ms: None,
        }
    }

    pub fn with_cache_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.cache_ttl_ms = Some(ttl_ms);
        self
    }
}

/// Named output parsers
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostProcess {
    /// One suggestion per non-empty line
    #[default]
    Lines,
    /// `softwareupdate --list-full-installers` entries, keyed by version
    FullInstallers {
        #[serde(default, alias = "sizeUnits")]
        size_units: SizeUnits,
    },
}

impl PostProcess {
    pub fn apply(&self, output: &str) -> Vec<Suggestion> {
        match self {
            PostProcess::Lines => output
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| Suggestion::new(line, SuggestionKind::Arg))
                .collect(),
            PostProcess::FullInstallers { size_units } => parse_installers(output, *size_units),
        }
    }
}

/// What the user has typed when a generator runs
#[derive(Clone, Debug, Default)]
pub struct GeneratorContext {
    /// Tokens already accepted, command name included. Exported to scripts
    /// as `COMPLETION_TOKENS`.
    pub tokens: Vec<String>,
    /// The word being completed
    pub fragment: String,
    /// Working directory for the script (inherits the process cwd if unset)
    pub cwd: Option<PathBuf>,
}

impl GeneratorContext {
    pub fn new(tokens: Vec<String>, fragment: impl Into<String>) -> Self {
        Self {
            tokens,
            fragment: fragment.into(),
            cwd: None,
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}
