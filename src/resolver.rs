//! Resolver: turns a partially typed command line into ordered suggestions.
//!
//! The walk over accepted tokens happens in [`SpecModel::walk`]; this module
//! decides what to offer at the resulting scope, runs generators, and applies
//! the prefix filter. Declared order is kept throughout; generated values
//! follow static ones and never replace them.

use crate::generator::GeneratorContext;
use crate::runner::GeneratorRunner;
use crate::spec_model::{ArgSpec, Scope, SpecModel};
use crate::suggestion::{Suggestion, SuggestionKind};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub struct Resolver<'a> {
    model: &'a SpecModel,
    runner: &'a GeneratorRunner,
    cwd: Option<PathBuf>,
}

impl<'a> Resolver<'a> {
    pub fn new(model: &'a SpecModel, runner: &'a GeneratorRunner) -> Self {
        Self {
            model,
            runner,
            cwd: None,
        }
    }

    /// Directory generator scripts run in
    pub fn with_cwd(mut self, cwd: Option<&Path>) -> Self {
        self.cwd = cwd.map(Path::to_path_buf);
        self
    }

    /// Suggestions for `fragment`, given the tokens typed after the command
    /// name. Unknown or malformed input yields an empty list.
    pub async fn resolve<S: AsRef<str>>(&self, accepted: &[S], fragment: &str) -> Vec<Suggestion> {
        let scope = self.model.walk(accepted);
        if scope.malformed {
            return Vec::new();
        }

        let ctx = self.context(accepted, fragment);
        let mut candidates = Vec::new();

        match scope.pending {
            Some(pending) => {
                candidates.extend(self.arg_candidates(pending.arg(), &ctx).await);
                if pending.accepts_tokens() {
                    candidates.extend(token_candidates(&scope));
                }
            }
            None => {
                candidates.extend(token_candidates(&scope));
                if let Some(arg) = scope.current_arg() {
                    candidates.extend(self.arg_candidates(arg, &ctx).await);
                }
            }
        }

        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|s| s.name.starts_with(fragment))
            .filter(|s| seen.insert(s.name.clone()))
            .collect()
    }

    fn context<S: AsRef<str>>(&self, accepted: &[S], fragment: &str) -> GeneratorContext {
        let tokens = std::iter::once(self.model.name().to_string())
            .chain(accepted.iter().map(|t| t.as_ref().to_string()))
            .collect();
        let ctx = GeneratorContext::new(tokens, fragment);
        match &self.cwd {
            Some(cwd) => ctx.with_cwd(cwd.clone()),
            None => ctx,
        }
    }

    /// Static suggestions, then each generator's output; static wins on
    /// collisions. Free-form args get a single placeholder.
    async fn arg_candidates(&self, arg: &ArgSpec, ctx: &GeneratorContext) -> Vec<Suggestion> {
        if arg.is_free_form() {
            return vec![Suggestion::new(arg.name.clone(), SuggestionKind::ArgSlot)
                .with_optional_description(arg.description.as_deref())
                .with_insert_space(false)];
        }

        let mut items: Vec<Suggestion> = arg
            .suggestions
            .iter()
            .map(|s| {
                Suggestion::new(s.name.clone(), SuggestionKind::Arg)
                    .with_display_name(s.display_name.as_deref())
                    .with_optional_description(s.description.as_deref())
            })
            .collect();

        for generator in &arg.generators {
            for item in self.runner.run(generator, ctx).await {
                if !items.iter().any(|existing| existing.name == item.name) {
                    items.push(item);
                }
            }
        }
        items
    }
}

/// Subcommands (before any positional value) and options not yet used,
/// one suggestion per alias.
fn token_candidates(scope: &Scope<'_>) -> Vec<Suggestion> {
    let mut items = Vec::new();

    if scope.accepts_subcommands() {
        for sub in &scope.command.subcommands {
            items.extend(sub.name.iter().map(|alias| {
                Suggestion::new(alias, SuggestionKind::Subcommand)
                    .with_optional_description(sub.description.as_deref())
            }));
        }
    }

    for option in scope.visible_options() {
        if !option.is_repeatable && scope.is_used(option) {
            continue;
        }
        items.extend(option.name.iter().map(|alias| {
            Suggestion::new(alias, SuggestionKind::Option)
                .with_optional_description(option.description.as_deref())
        }));
    }

    items
}
