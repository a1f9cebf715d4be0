//! Command Completion Engine
//!
//! Holds one validated [`SpecModel`] per command and answers completion
//! requests for whole command lines. Specs come from the built-in set and
//! from JSON/YAML files in Fig completion spec format.

use crate::config::EngineConfig;
use crate::error::{SpecError, SpecResult};
use crate::resolver::Resolver;
use crate::runner::GeneratorRunner;
use crate::spec_model::{CompletionSpec, SpecIssue, SpecModel};
use crate::specs::builtin_specs;
use crate::suggestion::{Suggestion, SuggestionKind};
use crate::{slog_debug, slog_warn};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// The main completion engine
pub struct CompletionEngine {
    /// Keyed by primary name
    specs: BTreeMap<String, SpecModel>,
    /// Secondary command aliases to primary name
    aliases: HashMap<String, String>,
    runner: GeneratorRunner,
    config: EngineConfig,
}

impl CompletionEngine {
    /// Engine with the built-in specs and default settings
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Engine with the built-in specs plus everything in `config.spec_dirs`.
    /// Unreadable directories are logged and skipped.
    pub fn with_config(config: EngineConfig) -> Self {
        let mut engine = Self::empty(config);

        for spec in builtin_specs(&engine.config) {
            engine.register(spec);
        }

        for dir in engine.config.spec_dirs.clone() {
            if let Err(e) = engine.load_from_directory(&dir) {
                slog_warn!(
                    "ENGINE",
                    "spec_dir_failed",
                    &e.to_string(),
                    Some(json!({ "dir": dir.display().to_string() }))
                );
            }
        }

        engine
    }

    /// Engine with no specs at all
    pub fn empty(config: EngineConfig) -> Self {
        Self {
            specs: BTreeMap::new(),
            aliases: HashMap::new(),
            runner: GeneratorRunner::from_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn runner(&self) -> &GeneratorRunner {
        &self.runner
    }

    /// Validate and register a spec, replacing any spec with the same name.
    /// Returns the validation issues; malformed parts are still registered
    /// and simply produce no suggestions.
    pub fn register(&mut self, spec: CompletionSpec) -> &[SpecIssue] {
        let model = SpecModel::new(spec);
        let name = model.name().to_string();

        if !model.issues().is_empty() {
            let issues: Vec<String> = model.issues().iter().map(|i| i.to_string()).collect();
            slog_warn!("SPEC", "malformed_spec", json!({ "command": name, "issues": issues }));
        }

        self.aliases.retain(|_, primary| primary != &name);
        for alias in model.spec().name.iter().skip(1) {
            self.aliases.insert(alias.to_string(), name.clone());
        }

        self.specs.insert(name.clone(), model);
        self.specs[&name].issues()
    }

    /// Load a completion spec from JSON
    pub fn load_spec(&mut self, json: &str) -> SpecResult<()> {
        let spec: CompletionSpec = serde_json::from_str(json)?;
        self.register(spec);
        Ok(())
    }

    /// Load a completion spec from YAML
    pub fn load_spec_yaml(&mut self, yaml: &str) -> SpecResult<()> {
        let spec: CompletionSpec = serde_yaml::from_str(yaml)?;
        self.register(spec);
        Ok(())
    }

    /// Load one `.json`, `.yaml` or `.yml` spec file
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> SpecResult<()> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SpecError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => self.load_spec(&content),
            Some("yaml") | Some("yml") => self.load_spec_yaml(&content),
            _ => Err(SpecError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Load specs from a directory. Files that fail to parse are logged and
    /// skipped; the count of loaded specs is returned.
    pub fn load_from_directory<P: AsRef<Path>>(&mut self, dir: P) -> SpecResult<usize> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|source| SpecError::Read {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths: Vec<_> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("json") | Some("yaml") | Some("yml")
                )
            })
            .collect();
        paths.sort();

        let mut count = 0;
        for path in paths {
            match self.load_file(&path) {
                Ok(()) => count += 1,
                Err(e) => slog_warn!(
                    "SPEC",
                    "spec_load_failed",
                    &format!("{:#}", anyhow::Error::from(e)),
                    Some(json!({ "path": path.display().to_string() }))
                ),
            }
        }

        slog_debug!("SPEC", "spec_dir_loaded", json!({ "dir": dir.display().to_string(), "count": count }));
        Ok(count)
    }

    /// Get completions for a command line, with the cursor at byte offset
    /// `cursor_pos` (clamped to the line).
    pub async fn complete(&self, line: &str, cursor_pos: usize) -> Vec<Suggestion> {
        self.complete_in(line, cursor_pos, None).await
    }

    /// Like [`complete`](Self::complete), running generators in `cwd`.
    pub async fn complete_in(&self, line: &str, cursor_pos: usize, cwd: Option<&Path>) -> Vec<Suggestion> {
        let line_to_cursor = &line[..floor_char_boundary(line, cursor_pos)];
        let parts: Vec<&str> = line_to_cursor.split_whitespace().collect();
        let completing_word = !line_to_cursor.ends_with(char::is_whitespace) && !parts.is_empty();

        if parts.is_empty() {
            return self.complete_commands("");
        }
        if parts.len() == 1 && completing_word {
            return self.complete_commands(parts[0]);
        }

        let Some(model) = self.lookup(parts[0]) else {
            return Vec::new();
        };

        let (accepted, fragment) = if completing_word {
            (&parts[1..parts.len() - 1], parts[parts.len() - 1])
        } else {
            (&parts[1..], "")
        };

        Resolver::new(model, &self.runner)
            .with_cwd(cwd)
            .resolve(accepted, fragment)
            .await
    }

    /// Complete command names, every alias of each spec
    fn complete_commands(&self, prefix: &str) -> Vec<Suggestion> {
        self.specs
            .values()
            .flat_map(|model| {
                let description = model.spec().description.as_deref();
                model
                    .spec()
                    .name
                    .iter()
                    .filter(move |alias| alias.starts_with(prefix))
                    .map(move |alias| {
                        Suggestion::new(alias, SuggestionKind::Command).with_optional_description(description)
                    })
            })
            .collect()
    }

    fn lookup(&self, command: &str) -> Option<&SpecModel> {
        self.specs
            .get(command)
            .or_else(|| self.aliases.get(command).and_then(|primary| self.specs.get(primary)))
    }

    /// Get the spec for a command, by primary name or alias
    pub fn get_spec(&self, command: &str) -> Option<&SpecModel> {
        self.lookup(command)
    }

    /// List all available command specs, sorted
    pub fn list_commands(&self) -> Vec<&str> {
        self.specs.keys().map(|s| s.as_str()).collect()
    }

    pub fn issues_for(&self, command: &str) -> &[SpecIssue] {
        self.lookup(command).map(|m| m.issues()).unwrap_or(&[])
    }
}

impl Default for CompletionEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn floor_char_boundary(line: &str, index: usize) -> usize {
    let mut index = index.min(line.len());
    while !line.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[Suggestion]) -> Vec<&str> {
        items.iter().map(|s| s.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_command_completion() {
        let engine = CompletionEngine::new();
        let suggestions = engine.complete("soft", 4).await;
        assert_eq!(names(&suggestions), vec!["softwareupdate"]);
        assert_eq!(suggestions[0].kind, SuggestionKind::Command);
    }

    #[tokio::test]
    async fn test_empty_line_lists_commands() {
        let engine = CompletionEngine::new();
        assert_eq!(names(&engine.complete("", 0).await), vec!["softwareupdate"]);
    }

    #[tokio::test]
    async fn test_subcommand_completion() {
        let engine = CompletionEngine::new();
        let suggestions = engine.complete("softwareupdate --ins", 20).await;
        assert_eq!(names(&suggestions), vec!["--install", "--install-rosetta"]);
    }

    #[tokio::test]
    async fn test_cursor_truncates_line() {
        let engine = CompletionEngine::new();
        let line = "softwareupdate --product-types Saf --verbose";
        let suggestions = engine.complete(line, "softwareupdate --product-types Saf".len()).await;
        assert_eq!(names(&suggestions), vec!["Safari"]);
    }

    #[tokio::test]
    async fn test_cursor_inside_multibyte_char() {
        let engine = CompletionEngine::new();
        // 'é' is two bytes; a cursor in the middle must not panic
        let _ = engine.complete("softwareupdate é", 16).await;
    }

    #[tokio::test]
    async fn test_unknown_command_is_empty() {
        let engine = CompletionEngine::new();
        assert!(engine.complete("nosuchtool ", 11).await.is_empty());
    }

    #[tokio::test]
    async fn test_load_spec_json_replaces_by_name() {
        let mut engine = CompletionEngine::empty(EngineConfig::default());
        engine
            .load_spec(r#"{"name": "brew", "subcommands": [{"name": "install"}]}"#)
            .unwrap();
        engine
            .load_spec(r#"{"name": "brew", "subcommands": [{"name": "upgrade"}]}"#)
            .unwrap();
        assert_eq!(engine.list_commands(), vec!["brew"]);
        assert_eq!(names(&engine.complete("brew ", 5).await), vec!["upgrade"]);
    }

    #[tokio::test]
    async fn test_secondary_alias_completes_like_primary() {
        let mut engine = CompletionEngine::empty(EngineConfig::default());
        engine
            .load_spec_yaml("name: [brew, br]\ndescription: Package manager\nsubcommands:\n  - name: install\n")
            .unwrap();

        assert_eq!(engine.list_commands(), vec!["brew"]);
        assert_eq!(names(&engine.complete("b", 1).await), vec!["brew", "br"]);
        assert_eq!(names(&engine.complete("br ", 3).await), vec!["install"]);
        assert_eq!(engine.get_spec("br").map(|m| m.name()), Some("brew"));

        // Re-registering without the alias drops it
        engine.load_spec_yaml("name: brew\n").unwrap();
        assert!(engine.get_spec("br").is_none());
    }

    #[test]
    fn test_register_reports_issues() {
        let mut engine = CompletionEngine::empty(EngineConfig::default());
        engine
            .load_spec_yaml("name: dup\noptions:\n  - name: [--a, -a]\n  - name: -a\n")
            .unwrap();
        assert_eq!(engine.issues_for("dup").len(), 1);
        assert!(engine.issues_for("missing").is_empty());
    }

    #[test]
    fn test_load_spec_rejects_bad_json() {
        let mut engine = CompletionEngine::empty(EngineConfig::default());
        assert!(matches!(engine.load_spec("{not json"), Err(SpecError::Json(_))));
    }
}
