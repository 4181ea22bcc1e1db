//! The resident command language the rest of the client binds to.
//!
//! [`CommandLanguage`] is a registry of the commands the client understands,
//! keyed by label. It is populated once at startup, either in code or from a
//! JSON definition, and afterwards only its enabled flags and values change.

mod param;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use param::{
    Bound, CmdParam, DistributionClass, LanguageShape, LanguageTypeInfo, OutputFile,
    OutputStream, RangeConstraint,
};

/// Errors raised while building a command language.
#[derive(Debug, Error)]
pub enum LanguageError {
    /// Two commands share a label.
    #[error("command '{label}' is already registered")]
    DuplicateCommand {
        /// The repeated label.
        label: String,
    },
    /// The definition file could not be read.
    #[error("failed to read command language '{path}': {source}")]
    Read {
        /// Definition path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The definition is not valid JSON for the language schema.
    #[error("invalid command language definition: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A command the client knows how to edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageCommand {
    label: String,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    params: Vec<CmdParam>,
}

impl LanguageCommand {
    /// Creates a disabled command without parameters.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: false,
            params: Vec::new(),
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with_param(mut self, param: CmdParam) -> Self {
        self.params.push(param);
        self
    }

    /// Command label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the command may be issued.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables the command, keeping its parameter values.
    pub const fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Parameters in declaration order.
    #[must_use]
    pub fn params(&self) -> &[CmdParam] {
        &self.params
    }

    /// Mutable parameters.
    pub fn params_mut(&mut self) -> &mut [CmdParam] {
        &mut self.params
    }

    /// Looks up a top-level parameter by label.
    #[must_use]
    pub fn param(&self, label: &str) -> Option<&CmdParam> {
        self.params.iter().find(|param| param.label() == label)
    }
}

#[derive(Deserialize)]
struct LanguageDefinition {
    commands: Vec<LanguageCommand>,
}

/// Registry of language commands keyed by label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandLanguage {
    commands: BTreeMap<String, LanguageCommand>,
}

impl CommandLanguage {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command.
    ///
    /// # Errors
    ///
    /// Returns [`LanguageError::DuplicateCommand`] when the label is taken.
    pub fn register(&mut self, command: LanguageCommand) -> Result<(), LanguageError> {
        if self.commands.contains_key(command.label()) {
            return Err(LanguageError::DuplicateCommand {
                label: command.label,
            });
        }
        self.commands.insert(command.label.clone(), command);
        Ok(())
    }

    /// Builds a registry from a JSON definition of the form
    /// `{"commands": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns [`LanguageError`] for invalid JSON or duplicate labels.
    pub fn from_json(text: &str) -> Result<Self, LanguageError> {
        let definition: LanguageDefinition = serde_json::from_str(text)?;
        let mut language = Self::new();
        for command in definition.commands {
            language.register(command)?;
        }
        Ok(language)
    }

    /// Reads a JSON definition from disk.
    ///
    /// # Errors
    ///
    /// Returns [`LanguageError`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, LanguageError> {
        let text = fs::read_to_string(path).map_err(|source| LanguageError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Looks up a command.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&LanguageCommand> {
        self.commands.get(label)
    }

    /// Looks up a command for modification.
    pub fn get_mut(&mut self, label: &str) -> Option<&mut LanguageCommand> {
        self.commands.get_mut(label)
    }

    /// Commands sorted by label.
    pub fn commands(&self) -> impl Iterator<Item = &LanguageCommand> {
        self.commands.values()
    }

    /// Labels of commands that are currently enabled.
    pub fn enabled_labels(&self) -> impl Iterator<Item = &str> {
        self.commands
            .values()
            .filter(|command| command.enabled)
            .map(LanguageCommand::label)
    }

    /// Disables every command.
    pub fn disable_all(&mut self) {
        for command in self.commands.values_mut() {
            command.enabled = false;
        }
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` when no command is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests;
