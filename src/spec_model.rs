//! Spec Model: the static completion grammar for one command.
//!
//! Compatible with the Fig completion spec format: subcommands and
//! options carry one or more aliases, arguments carry static suggestions
//! and/or generators. A spec is validated once when it is wrapped in a
//! [`SpecModel`]; nothing mutates it afterwards.

use crate::generator::Generator;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Option tables are shared by reference between the subcommands that use them.
pub type OptionSet = Arc<[OptionSpec]>;

fn empty_options() -> OptionSet {
    Arc::from(Vec::new())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// One or more aliases naming a subcommand or option (e.g. `["--all", "-a"]`)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Names(Vec<String>);

impl<'de> Deserialize<'de> for Names {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        one_or_many(deserializer).map(Names)
    }
}

impl Names {
    /// First alias, used as the canonical name in scope paths
    pub fn primary(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn matches(&self, token: &str) -> bool {
        self.0.iter().any(|name| name == token)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Names {
    fn from(name: &str) -> Self {
        Names(vec![name.to_string()])
    }
}

impl<const N: usize> From<[&str; N]> for Names {
    fn from(names: [&str; N]) -> Self {
        Names(names.iter().map(|n| n.to_string()).collect())
    }
}

impl From<Vec<String>> for Names {
    fn from(names: Vec<String>) -> Self {
        Names(names)
    }
}

/// A completion specification for a command or subcommand
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompletionSpec {
    pub name: Names,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub subcommands: Vec<CompletionSpec>,
    #[serde(default = "empty_options")]
    pub options: OptionSet,
    #[serde(default, deserialize_with = "one_or_many")]
    pub args: Vec<ArgSpec>,
}

impl CompletionSpec {
    pub fn new(name: impl Into<Names>, description: &str) -> Self {
        Self {
            name: name.into(),
            description: Some(description.to_string()),
            subcommands: Vec::new(),
            options: empty_options(),
            args: Vec::new(),
        }
    }

    pub fn subcommand(mut self, subcommand: CompletionSpec) -> Self {
        self.subcommands.push(subcommand);
        self
    }

    /// Attach an option table. Pass a clone of a shared [`OptionSet`] to
    /// reuse one table across several subcommands.
    pub fn options(mut self, options: OptionSet) -> Self {
        self.options = options;
        self
    }

    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }
}

/// Specification for a command option/flag
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptionSpec {
    pub name: Names,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub args: Vec<ArgSpec>,
    /// May appear more than once on a line
    #[serde(default, alias = "isRepeatable")]
    pub is_repeatable: bool,
    /// Stays available inside nested subcommands
    #[serde(default, alias = "isPersistent")]
    pub is_persistent: bool,
}

impl OptionSpec {
    pub fn new(name: impl Into<Names>, description: &str) -> Self {
        Self {
            name: name.into(),
            description: Some(description.to_string()),
            args: Vec::new(),
            is_repeatable: false,
            is_persistent: false,
        }
    }

    pub fn arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.is_repeatable = true;
        self
    }

    pub fn persistent(mut self) -> Self {
        self.is_persistent = true;
        self
    }
}

/// A static suggestion declared on an argument
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SuggestionSpec {
    pub name: String,
    /// Shown instead of `name` in the menu
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SuggestionRepr {
    Plain(String),
    Full {
        name: String,
        #[serde(default, alias = "displayName")]
        display_name: Option<String>,
        #[serde(default)]
        description: Option<String>,
    },
}

impl<'de> Deserialize<'de> for SuggestionSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match SuggestionRepr::deserialize(deserializer)? {
            SuggestionRepr::Plain(name) => SuggestionSpec::from(name.as_str()),
            SuggestionRepr::Full {
                name,
                display_name,
                description,
            } => SuggestionSpec {
                name,
                display_name,
                description,
            },
        })
    }
}

impl From<&str> for SuggestionSpec {
    fn from(name: &str) -> Self {
        SuggestionSpec {
            name: name.to_string(),
            display_name: None,
            description: None,
        }
    }
}

/// Specification for an argument value
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArgSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<SuggestionSpec>,
    #[serde(default, alias = "generator", deserialize_with = "one_or_many")]
    pub generators: Vec<Generator>,
    #[serde(default, alias = "isOptional")]
    pub is_optional: bool,
    #[serde(default, alias = "isVariadic")]
    pub is_variadic: bool,
}

impl ArgSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            suggestions: Vec::new(),
            generators: Vec::new(),
            is_optional: false,
            is_variadic: false,
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn variadic(mut self) -> Self {
        self.is_variadic = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn suggestion(mut self, suggestion: impl Into<SuggestionSpec>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn generator(mut self, generator: Generator) -> Self {
        self.generators.push(generator);
        self
    }

    /// Nothing to suggest: the UI only gets a placeholder for this slot
    pub fn is_free_form(&self) -> bool {
        self.suggestions.is_empty() && self.generators.is_empty()
    }
}

/// A subcommand or option visible at some scope
#[derive(Clone, Copy, Debug)]
pub enum TokenRef<'a> {
    Subcommand(&'a CompletionSpec),
    Option(&'a OptionSpec),
}

impl<'a> TokenRef<'a> {
    pub fn names(&self) -> &'a Names {
        match self {
            TokenRef::Subcommand(spec) => &spec.name,
            TokenRef::Option(opt) => &opt.name,
        }
    }

    pub fn args(&self) -> &'a [ArgSpec] {
        match self {
            TokenRef::Subcommand(spec) => &spec.args,
            TokenRef::Option(opt) => &opt.args,
        }
    }
}

/// What is wrong with a scope
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum IssueKind {
    EmptyName,
    DuplicateAlias(String),
    EmptyArgName,
    EmptyScript,
}

/// A validation finding, attached to the scope that owns the bad entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpecIssue {
    /// Primary names of the subcommands leading to the scope (empty = root)
    pub scope: Vec<String>,
    pub kind: IssueKind,
}

impl fmt::Display for SpecIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = if self.scope.is_empty() {
            "<root>".to_string()
        } else {
            self.scope.join(" ")
        };
        match &self.kind {
            IssueKind::EmptyName => write!(f, "{}: subcommand or option without a name", scope),
            IssueKind::DuplicateAlias(alias) => write!(f, "{}: duplicate alias {:?}", scope, alias),
            IssueKind::EmptyArgName => write!(f, "{}: argument without a name", scope),
            IssueKind::EmptyScript => write!(f, "{}: generator with an empty script", scope),
        }
    }
}

/// An option that is waiting for its value(s)
#[derive(Clone, Copy, Debug)]
pub struct PendingValue<'a> {
    pub option: &'a OptionSpec,
    /// Index into `option.args` of the argument being filled
    pub index: usize,
    /// Values already given to that argument (only grows for variadic args)
    pub consumed: usize,
}

impl<'a> PendingValue<'a> {
    pub fn arg(&self) -> &'a ArgSpec {
        &self.option.args[self.index]
    }

    /// Whether an option may interrupt this value list
    pub fn accepts_tokens(&self) -> bool {
        let arg = self.arg();
        arg.is_optional || (arg.is_variadic && self.consumed > 0)
    }

    fn after_value(mut self) -> Option<Self> {
        if self.arg().is_variadic {
            self.consumed += 1;
            return Some(self);
        }
        self.index += 1;
        self.consumed = 0;
        (self.index < self.option.args.len()).then_some(self)
    }
}

/// Where a sequence of typed tokens leads within the spec tree
#[derive(Clone, Debug)]
pub struct Scope<'a> {
    pub command: &'a CompletionSpec,
    pub path: Vec<String>,
    /// Persistent options declared by ancestors
    pub inherited: Vec<&'a OptionSpec>,
    /// Options already typed in this scope
    pub used: Vec<&'a OptionSpec>,
    /// Index of the next positional argument
    pub positional: usize,
    pub pending: Option<PendingValue<'a>>,
    pub malformed: bool,
}

impl<'a> Scope<'a> {
    fn root(command: &'a CompletionSpec) -> Self {
        Self {
            command,
            path: Vec::new(),
            inherited: Vec::new(),
            used: Vec::new(),
            positional: 0,
            pending: None,
            malformed: false,
        }
    }

    /// Own options first, then inherited persistent ones
    pub fn visible_options(&self) -> impl Iterator<Item = &'a OptionSpec> + '_ {
        self.command.options.iter().chain(self.inherited.iter().copied())
    }

    pub fn find_option(&self, token: &str) -> Option<&'a OptionSpec> {
        self.visible_options().find(|opt| opt.name.matches(token))
    }

    /// Subcommands are only reachable before the first positional value
    pub fn accepts_subcommands(&self) -> bool {
        self.positional == 0
    }

    pub fn find_subcommand(&self, token: &str) -> Option<&'a CompletionSpec> {
        if !self.accepts_subcommands() {
            return None;
        }
        self.command.subcommands.iter().find(|sub| sub.name.matches(token))
    }

    pub fn is_used(&self, option: &OptionSpec) -> bool {
        self.used.iter().any(|used| std::ptr::eq(*used, option))
    }

    /// The positional argument the next value would fill
    pub fn current_arg(&self) -> Option<&'a ArgSpec> {
        self.command.args.get(self.positional)
    }

    fn descend(&mut self, sub: &'a CompletionSpec) {
        let persistent: Vec<&'a OptionSpec> =
            self.command.options.iter().filter(|opt| opt.is_persistent).collect();
        self.inherited.extend(persistent);
        self.command = sub;
        self.path.push(sub.name.primary().to_string());
        self.used.clear();
        self.positional = 0;
        self.pending = None;
    }

    fn accept(&mut self, token: &str) {
        if let Some(pending) = self.pending {
            let interrupts = token.starts_with('-') && self.find_option(flag_name(token)).is_some();
            if !(interrupts && pending.accepts_tokens()) {
                self.pending = pending.after_value();
                return;
            }
            self.pending = None;
        }

        if let Some(sub) = self.find_subcommand(token) {
            self.descend(sub);
            return;
        }

        if token.starts_with('-') {
            if let Some(option) = self.find_option(flag_name(token)) {
                self.used.push(option);
                if !option.args.is_empty() {
                    let pending = PendingValue {
                        option,
                        index: 0,
                        consumed: 0,
                    };
                    self.pending = if token.contains('=') {
                        pending.after_value()
                    } else {
                        Some(pending)
                    };
                }
            }
            // Unknown flags are skipped
            return;
        }

        match self.current_arg() {
            Some(arg) if arg.is_variadic => {}
            _ => self.positional += 1,
        }
    }
}

/// `--opt=value` names the option `--opt`
fn flag_name(token: &str) -> &str {
    if token.starts_with("--") {
        token.split_once('=').map(|(flag, _)| flag).unwrap_or(token)
    } else {
        token
    }
}

/// A validated, read-only spec tree
#[derive(Clone, Debug)]
pub struct SpecModel {
    spec: CompletionSpec,
    issues: Vec<SpecIssue>,
    malformed: HashSet<Vec<String>>,
}

impl SpecModel {
    pub fn new(spec: CompletionSpec) -> Self {
        let mut issues = Vec::new();
        validate_scope(&spec, &mut Vec::new(), &mut issues);
        let malformed = issues.iter().map(|issue| issue.scope.clone()).collect();
        Self {
            spec,
            issues,
            malformed,
        }
    }

    pub fn spec(&self) -> &CompletionSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        self.spec.name.primary()
    }

    pub fn issues(&self) -> &[SpecIssue] {
        &self.issues
    }

    pub fn is_malformed(&self, path: &[String]) -> bool {
        self.malformed.contains(path)
    }

    /// Walk the tree along already-typed tokens (command name excluded).
    /// Stops early, flagged `malformed`, when it enters a malformed scope.
    pub fn walk<S: AsRef<str>>(&self, tokens: &[S]) -> Scope<'_> {
        let mut scope = Scope::root(&self.spec);
        if self.is_malformed(&scope.path) {
            scope.malformed = true;
            return scope;
        }

        for token in tokens {
            let depth = scope.path.len();
            scope.accept(token.as_ref());
            if scope.path.len() != depth && self.is_malformed(&scope.path) {
                scope.malformed = true;
                return scope;
            }
        }
        scope
    }

    /// Subcommands and options valid after `path`. Unknown or malformed
    /// paths yield nothing.
    pub fn children_at<S: AsRef<str>>(&self, path: &[S]) -> Vec<TokenRef<'_>> {
        let scope = self.walk(path);
        if scope.malformed || scope.pending.map(|p| !p.accepts_tokens()).unwrap_or(false) {
            return Vec::new();
        }

        let mut children = Vec::new();
        if scope.accepts_subcommands() {
            children.extend(scope.command.subcommands.iter().map(TokenRef::Subcommand));
        }
        children.extend(scope.visible_options().map(TokenRef::Option));
        children
    }

    /// The argument a token takes, if any
    pub fn arg_spec_for<'a>(&self, token: TokenRef<'a>) -> Option<&'a ArgSpec> {
        token.args().first()
    }
}

fn validate_scope(spec: &CompletionSpec, path: &mut Vec<String>, issues: &mut Vec<SpecIssue>) {
    let mut report = |kind: IssueKind| issues.push(SpecIssue { scope: path.clone(), kind });

    let mut seen = HashSet::new();
    let names = spec
        .subcommands
        .iter()
        .map(|sub| &sub.name)
        .chain(spec.options.iter().map(|opt| &opt.name));
    for token_names in names {
        if token_names.is_empty() || token_names.iter().any(str::is_empty) {
            report(IssueKind::EmptyName);
        }
        for alias in token_names.iter().filter(|a| !a.is_empty()) {
            if !seen.insert(alias) {
                report(IssueKind::DuplicateAlias(alias.to_string()));
            }
        }
    }

    let args = spec
        .args
        .iter()
        .chain(spec.options.iter().flat_map(|opt| opt.args.iter()));
    for arg in args {
        if arg.name.trim().is_empty() {
            report(IssueKind::EmptyArgName);
        }
        if arg.generators.iter().any(|g| g.script.trim().is_empty()) {
            report(IssueKind::EmptyScript);
        }
    }

    for sub in &spec.subcommands {
        path.push(sub.name.primary().to_string());
        validate_scope(sub, path, issues);
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::PostProcess;

    fn sample() -> CompletionSpec {
        let shared: OptionSet = Arc::from(vec![
            OptionSpec::new(["--all", "-a"], "Everything"),
            OptionSpec::new("--tag", "Tag").arg(ArgSpec::new("tag").suggestion("x")).repeatable(),
        ]);
        CompletionSpec::new("tool", "A tool")
            .subcommand(
                CompletionSpec::new(["install", "i"], "Install")
                    .options(shared.clone())
                    .arg(ArgSpec::new("label").variadic()),
            )
            .subcommand(CompletionSpec::new("remove", "Remove").options(shared))
            .options(Arc::from(vec![
                OptionSpec::new(["--verbose", "-v"], "Verbose").persistent(),
                OptionSpec::new("--color", "Color").arg(
                    ArgSpec::new("when").suggestion("auto").suggestion("never"),
                ),
            ]))
    }

    fn names(children: &[TokenRef<'_>]) -> Vec<String> {
        children.iter().map(|c| c.names().primary().to_string()).collect()
    }

    #[test]
    fn test_children_at_root() {
        let model = SpecModel::new(sample());
        let empty: [&str; 0] = [];
        assert_eq!(
            names(&model.children_at(&empty)),
            vec!["install", "remove", "--verbose", "--color"]
        );
    }

    #[test]
    fn test_any_alias_advances_the_walk() {
        let model = SpecModel::new(sample());
        let by_name = names(&model.children_at(&["install"]));
        let by_alias = names(&model.children_at(&["i"]));
        assert_eq!(by_name, by_alias);
        // own options, then the inherited persistent one
        assert_eq!(by_name, vec!["--all", "--tag", "--verbose"]);
    }

    #[test]
    fn test_unknown_path_is_not_fatal() {
        let model = SpecModel::new(sample());
        let scope = model.walk(&["bogus", "--nope"]);
        assert!(!scope.malformed);
        assert_eq!(scope.positional, 1);
        assert!(model.children_at(&["--color"]).is_empty());
    }

    #[test]
    fn test_option_values_are_consumed() {
        let model = SpecModel::new(sample());
        let scope = model.walk(&["--color"]);
        assert_eq!(scope.pending.map(|p| p.arg().name.as_str()), Some("when"));

        let scope = model.walk(&["--color", "auto"]);
        assert!(scope.pending.is_none());
        assert_eq!(scope.positional, 0);

        let scope = model.walk(&["--color=auto"]);
        assert!(scope.pending.is_none());
    }

    #[test]
    fn test_variadic_positional_keeps_slot() {
        let model = SpecModel::new(sample());
        let scope = model.walk(&["install", "a", "b", "c"]);
        assert_eq!(scope.positional, 0);
        assert_eq!(scope.current_arg().map(|a| a.name.as_str()), Some("label"));
    }

    #[test]
    fn test_used_options_tracked_per_scope() {
        let model = SpecModel::new(sample());
        let scope = model.walk(&["install", "-a"]);
        let all = scope.find_option("--all").unwrap();
        assert!(scope.is_used(all));
        assert!(!scope.is_used(scope.find_option("--tag").unwrap()));
    }

    #[test]
    fn test_shared_option_table_is_one_allocation() {
        let spec = sample();
        assert!(Arc::ptr_eq(&spec.subcommands[0].options, &spec.subcommands[1].options));
    }

    #[test]
    fn test_arg_spec_for() {
        let model = SpecModel::new(sample());
        let empty: [&str; 0] = [];
        let children = model.children_at(&empty);
        let color = children.iter().find(|c| c.names().matches("--color")).unwrap();
        assert_eq!(model.arg_spec_for(*color).map(|a| a.name.as_str()), Some("when"));
        let verbose = children.iter().find(|c| c.names().matches("-v")).unwrap();
        assert!(model.arg_spec_for(*verbose).is_none());
    }

    #[test]
    fn test_duplicate_alias_marks_only_that_scope() {
        let spec = sample().subcommand(
            CompletionSpec::new("broken", "Broken").options(Arc::from(vec![
                OptionSpec::new(["--x", "-x"], "x"),
                OptionSpec::new("-x", "again"),
            ])),
        );
        let model = SpecModel::new(spec);
        assert_eq!(
            model.issues(),
            &[SpecIssue {
                scope: vec!["broken".into()],
                kind: IssueKind::DuplicateAlias("-x".into()),
            }]
        );
        assert!(model.walk(&["broken"]).malformed);
        assert!(model.children_at(&["broken"]).is_empty());
        assert!(!model.children_at(&["install"]).is_empty());
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let spec = CompletionSpec::new("tool", "")
            .options(Arc::from(vec![OptionSpec::new(Names::default(), "nameless")]))
            .arg(ArgSpec::new("").generator(crate::generator::Generator::new(" ", PostProcess::Lines)));
        let model = SpecModel::new(spec);
        let kinds: Vec<IssueKind> = model.issues().iter().map(|i| i.kind.clone()).collect();
        assert_eq!(kinds, vec![IssueKind::EmptyName, IssueKind::EmptyArgName, IssueKind::EmptyScript]);
        let empty: [&str; 0] = [];
        assert!(model.walk(&empty).malformed);
    }

    #[test]
    fn test_fig_style_json() {
        let json = r#"{
            "name": "tool",
            "subcommands": [{"name": ["install", "i"], "args": {"name": "label", "isVariadic": true}}],
            "options": [{"name": "--type", "args": {"name": "t", "suggestions": ["a", {"name": "b", "description": "B"}]}}]
        }"#;
        let spec: CompletionSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.subcommands[0].name.iter().collect::<Vec<_>>(), vec!["install", "i"]);
        assert!(spec.subcommands[0].args[0].is_variadic);
        let suggestions = &spec.options[0].args[0].suggestions;
        assert_eq!(suggestions[0], SuggestionSpec::from("a"));
        assert_eq!(suggestions[1].description.as_deref(), Some("B"));
    }
}
