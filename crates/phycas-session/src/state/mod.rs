//! The backend's declaration of which commands and parameters are usable.
//!
//! A [`CommandStateModel`] is decoded from the `command_state` element of a
//! `hidden_query` message. Every update is a complete snapshot; merging it
//! into the resident model is the job of [`crate::sync`].

mod types;

use std::str::FromStr;

use thiserror::Error;

pub use types::{OutputFileSpec, StateBound, StateShape, StateTypeInfo};

use crate::message::tags;
use crate::sets::{SetKind, SetSnapshot};
use crate::xml::Element;

/// Errors raised while decoding a command state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateParseError {
    /// The element is not part of the command state vocabulary.
    #[error("unexpected element '{element}' inside '{parent}'")]
    UnexpectedElement {
        /// Offending tag.
        element: String,
        /// Tag of the enclosing element.
        parent: String,
    },
    /// A required attribute was absent.
    #[error("element '{element}' is missing attribute '{attribute}'")]
    MissingAttribute {
        /// Element tag.
        element: String,
        /// Attribute name.
        attribute: &'static str,
    },
    /// An attribute value could not be parsed.
    #[error("attribute '{attribute}' of '{element}' has invalid value '{value}'")]
    InvalidAttribute {
        /// Element tag.
        element: String,
        /// Attribute name.
        attribute: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Availability of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamState {
    label: String,
    placement: Option<u32>,
    available: bool,
    type_info: Option<StateTypeInfo>,
}

impl ParamState {
    /// Creates a labelled parameter state.
    #[must_use]
    pub fn labelled(label: impl Into<String>, available: bool) -> Self {
        Self {
            label: label.into(),
            placement: None,
            available,
            type_info: None,
        }
    }

    /// Creates an unlabelled parameter state identified by position.
    #[must_use]
    pub const fn placed(placement: u32, available: bool) -> Self {
        Self {
            label: String::new(),
            placement: Some(placement),
            available,
            type_info: None,
        }
    }

    /// Attaches type information.
    #[must_use]
    pub fn with_type_info(mut self, type_info: StateTypeInfo) -> Self {
        self.type_info = Some(type_info);
        self
    }

    /// Parameter label; empty for positional parameters.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Position used to identify unlabelled parameters.
    #[must_use]
    pub const fn placement(&self) -> Option<u32> {
        self.placement
    }

    /// Whether the parameter may currently be set.
    #[must_use]
    pub const fn available(&self) -> bool {
        self.available
    }

    /// Constraints and defaults; only sent for available parameters.
    #[must_use]
    pub const fn type_info(&self) -> Option<&StateTypeInfo> {
        self.type_info.as_ref()
    }

    /// Label, or `#placement` for positional parameters.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (self.label.is_empty(), self.placement) {
            (true, Some(placement)) => format!("#{placement}"),
            _ => self.label.clone(),
        }
    }

    fn from_element(element: &Element) -> Result<Self, StateParseError> {
        let label = element.attribute("label").unwrap_or_default().to_owned();
        let placement = optional_attribute::<u32>(element, "placement")?;
        let mut type_infos = element.children().iter();
        let type_info = type_infos
            .next()
            .map(StateTypeInfo::from_element)
            .transpose()?;
        if let Some(extra) = type_infos.next() {
            return Err(unexpected(extra, element));
        }
        Ok(Self {
            label,
            placement,
            available: element.flag("available"),
            type_info,
        })
    }
}

/// Availability of one command and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandState {
    label: String,
    available: bool,
    params: Vec<ParamState>,
}

impl CommandState {
    /// Creates a command state without parameters.
    #[must_use]
    pub fn new(label: impl Into<String>, available: bool) -> Self {
        Self {
            label: label.into(),
            available,
            params: Vec::new(),
        }
    }

    /// Appends a parameter state.
    #[must_use]
    pub fn with_param(mut self, param: ParamState) -> Self {
        self.params.push(param);
        self
    }

    /// Command label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the command may currently be issued.
    #[must_use]
    pub const fn available(&self) -> bool {
        self.available
    }

    /// Parameter states in wire order.
    #[must_use]
    pub fn params(&self) -> &[ParamState] {
        &self.params
    }

    /// Returns `true` when a parameter with this label is declared.
    #[must_use]
    pub fn declares(&self, label: &str) -> bool {
        self.params.iter().any(|param| param.label == label)
    }

    fn from_element(element: &Element) -> Result<Self, StateParseError> {
        let label = required_attribute(element, "label")?.to_owned();
        let params = element
            .children()
            .iter()
            .map(|child| match child.name() {
                "cmd_param" => ParamState::from_element(child),
                _ => Err(unexpected(child, element)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            label,
            available: element.flag("available"),
            params,
        })
    }
}

/// A complete command state snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandStateModel {
    commands: Vec<CommandState>,
    set_snapshots: Vec<(SetKind, SetSnapshot)>,
}

impl CommandStateModel {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command.
    #[must_use]
    pub fn with_command(mut self, command: CommandState) -> Self {
        self.commands.push(command);
        self
    }

    /// Attaches an indexed-set snapshot.
    #[must_use]
    pub fn with_sets(mut self, kind: SetKind, snapshot: SetSnapshot) -> Self {
        self.set_snapshots.push((kind, snapshot));
        self
    }

    /// Decodes a `command_state` element.
    ///
    /// # Errors
    ///
    /// Returns [`StateParseError`] for unknown elements, missing labels and
    /// unparsable numeric attributes.
    pub fn from_element(element: &Element) -> Result<Self, StateParseError> {
        if element.name() != tags::COMMAND_STATE {
            return Err(StateParseError::UnexpectedElement {
                element: element.name().to_owned(),
                parent: String::from(tags::HIDDEN_QUERY),
            });
        }
        let mut model = Self::new();
        for child in element.children() {
            if child.name() == "command" {
                model.commands.push(CommandState::from_element(child)?);
            } else if let Some(kind) = SetKind::from_element_name(child.name()) {
                model.set_snapshots.push((kind, parse_set_snapshot(child)?));
            } else {
                return Err(unexpected(child, element));
            }
        }
        Ok(model)
    }

    /// Commands in wire order.
    #[must_use]
    pub fn commands(&self) -> &[CommandState] {
        &self.commands
    }

    /// Looks up a command by label.
    #[must_use]
    pub fn command(&self, label: &str) -> Option<&CommandState> {
        self.commands.iter().find(|command| command.label == label)
    }

    /// Indexed-set snapshots carried alongside the commands.
    #[must_use]
    pub fn set_snapshots(&self) -> &[(SetKind, SetSnapshot)] {
        &self.set_snapshots
    }
}

fn parse_set_snapshot(element: &Element) -> Result<SetSnapshot, StateParseError> {
    let mut snapshot = SetSnapshot::new();
    if let Some(max_index) = optional_attribute::<u32>(element, "max_index")? {
        snapshot = snapshot.with_max_index(max_index);
    }
    for child in element.children() {
        snapshot = match child.name() {
            "index_label" => {
                let index = required_attribute(child, "index").and_then(|value| {
                    value
                        .parse::<u32>()
                        .map_err(|_| invalid(child, "index", value))
                })?;
                snapshot.with_alias(index, required_attribute(child, "label")?)
            }
            "known_set" => {
                let members = child
                    .child("members")
                    .map(Element::text)
                    .unwrap_or_default();
                snapshot.with_set(required_attribute(child, "label")?, members.trim())
            }
            _ => return Err(unexpected(child, element)),
        };
    }
    Ok(snapshot)
}

pub(crate) fn required_attribute<'a>(
    element: &'a Element,
    attribute: &'static str,
) -> Result<&'a str, StateParseError> {
    element
        .attribute(attribute)
        .ok_or_else(|| StateParseError::MissingAttribute {
            element: element.name().to_owned(),
            attribute,
        })
}

pub(crate) fn optional_attribute<T: FromStr>(
    element: &Element,
    attribute: &'static str,
) -> Result<Option<T>, StateParseError> {
    element
        .attribute(attribute)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|_| invalid(element, attribute, value))
        })
        .transpose()
}

pub(crate) fn invalid(element: &Element, attribute: &'static str, value: &str) -> StateParseError {
    StateParseError::InvalidAttribute {
        element: element.name().to_owned(),
        attribute,
        value: value.to_owned(),
    }
}

pub(crate) fn unexpected(element: &Element, parent: &Element) -> StateParseError {
    StateParseError::UnexpectedElement {
        element: element.name().to_owned(),
        parent: parent.name().to_owned(),
    }
}

#[cfg(test)]
mod tests;
