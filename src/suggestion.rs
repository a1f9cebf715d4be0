//! Completion candidates handed back to the UI.

use serde::{Deserialize, Serialize};

/// A suggestion returned by the completion engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// The completion text, also the key used for prefix filtering
    pub name: String,
    /// Display name (if different from name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// What produced this suggestion
    pub kind: SuggestionKind,
    /// Whether to insert a space after completion
    pub insert_space: bool,
}

/// Suggestion types, used by front ends to pick an icon
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Command,
    Subcommand,
    Option,
    Arg,
    /// Placeholder for a free-form argument with nothing to suggest
    ArgSlot,
}

impl Suggestion {
    pub fn new(name: impl Into<String>, kind: SuggestionKind) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            description: None,
            kind,
            insert_space: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_optional_description(mut self, description: Option<&str>) -> Self {
        self.description = description.map(str::to_string);
        self
    }

    pub fn with_display_name(mut self, display_name: Option<&str>) -> Self {
        self.display_name = display_name.map(str::to_string);
        self
    }

    pub fn with_insert_space(mut self, insert_space: bool) -> Self {
        self.insert_space = insert_space;
        self
    }
}
