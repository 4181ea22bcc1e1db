//! Type information attached to available parameters.

use std::collections::BTreeMap;

use super::{StateParseError, optional_attribute, required_attribute, unexpected};
use crate::xml::Element;

/// A numeric bound as sent by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateBound {
    /// A literal number, kept as text until translated.
    Literal(String),
    /// The label of another parameter whose value supplies the bound.
    LabelRef(String),
}

impl StateBound {
    fn classify<T: std::str::FromStr>(text: &str) -> Self {
        if text.trim().parse::<T>().is_ok() {
            Self::Literal(text.trim().to_owned())
        } else {
            Self::LabelRef(text.to_owned())
        }
    }
}

/// File destination of an output parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFileSpec {
    /// Append to an existing file.
    pub append: bool,
    /// Overwrite an existing file.
    pub replace: bool,
    /// Destination path.
    pub path: String,
}

/// Shape of a state-side type description, used to select a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateShape {
    /// Enumerated choices.
    Choice,
    /// String with forbidden values.
    RestrictedString,
    /// Integer with optional bounds.
    Integer,
    /// Double with optional bounds.
    Double,
    /// Probability distribution description.
    Distribution,
    /// Output destination description.
    Output,
    /// Any other type carrying named scalar fields.
    Scalar,
}

/// Constraints and defaults for an available parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum StateTypeInfo {
    /// `choice_type_info`.
    Choice {
        /// Permitted values.
        values: Vec<String>,
        /// Current value.
        default: Option<String>,
    },
    /// `restricted_string_type_info`.
    RestrictedString {
        /// Forbidden values.
        disallowed: Vec<String>,
        /// Current value.
        default: Option<String>,
    },
    /// `integer_type_info`.
    Integer {
        /// Current value.
        default: Option<String>,
        /// Lower bound.
        min: Option<StateBound>,
        /// Upper bound.
        max: Option<StateBound>,
    },
    /// `double_type_info`.
    Double {
        /// Current value.
        default: Option<String>,
        /// Lower bound.
        min: Option<StateBound>,
        /// Upper bound.
        max: Option<StateBound>,
    },
    /// `distribution_type_info`.
    Distribution {
        /// Distribution class name (`Any`, `Discrete`, `Continuous`).
        class: Option<String>,
        /// Number of variates.
        num_variates: Option<u32>,
        /// Range constraint name.
        constraint: String,
        /// Lower limit of the range.
        min: Option<String>,
        /// Upper limit of the range.
        max: Option<String>,
    },
    /// `output_type_info`.
    Output {
        /// Output is discarded.
        suppress: bool,
        /// File destination.
        file: Option<OutputFileSpec>,
        /// Stream names output is echoed to.
        redirects: Vec<String>,
    },
    /// Any other `*_type_info`, keyed by its attributes.
    Scalar {
        /// Type name without the `_type_info` suffix.
        kind: String,
        /// Attribute values.
        fields: BTreeMap<String, String>,
    },
}

impl StateTypeInfo {
    /// Shape used to select a translation.
    #[must_use]
    pub const fn shape(&self) -> StateShape {
        match self {
            Self::Choice { .. } => StateShape::Choice,
            Self::RestrictedString { .. } => StateShape::RestrictedString,
            Self::Integer { .. } => StateShape::Integer,
            Self::Double { .. } => StateShape::Double,
            Self::Distribution { .. } => StateShape::Distribution,
            Self::Output { .. } => StateShape::Output,
            Self::Scalar { .. } => StateShape::Scalar,
        }
    }

    /// Builds a scalar type description with a `default` field.
    #[must_use]
    pub fn scalar(kind: impl Into<String>, default: impl Into<String>) -> Self {
        Self::Scalar {
            kind: kind.into(),
            fields: BTreeMap::from([(String::from("default"), default.into())]),
        }
    }

    pub(super) fn from_element(element: &Element) -> Result<Self, StateParseError> {
        let default = element.attribute("default").map(str::to_owned);
        let info = match element.name() {
            "choice_type_info" => Self::Choice {
                values: texts_of(element, "choice")?,
                default,
            },
            "restricted_string_type_info" => Self::RestrictedString {
                disallowed: texts_of(element, "disallowed_value")?,
                default,
            },
            "integer_type_info" => Self::Integer {
                default,
                min: element.attribute("min_val").map(StateBound::classify::<i64>),
                max: element.attribute("max_val").map(StateBound::classify::<i64>),
            },
            "double_type_info" => Self::Double {
                default,
                min: element.attribute("min_val").map(StateBound::classify::<f64>),
                max: element.attribute("max_val").map(StateBound::classify::<f64>),
            },
            "distribution_type_info" => distribution(element)?,
            "output_type_info" => output(element)?,
            name => {
                let Some(kind) = name.strip_suffix("_type_info") else {
                    return Err(StateParseError::UnexpectedElement {
                        element: name.to_owned(),
                        parent: String::from("cmd_param"),
                    });
                };
                Self::Scalar {
                    kind: kind.to_owned(),
                    fields: element
                        .attributes()
                        .map(|(key, value)| (key.to_owned(), value.to_owned()))
                        .collect(),
                }
            }
        };
        Ok(info)
    }
}

fn texts_of(element: &Element, child_name: &str) -> Result<Vec<String>, StateParseError> {
    element
        .children()
        .iter()
        .map(|child| {
            if child.name() == child_name {
                Ok(child.text().to_owned())
            } else {
                Err(unexpected(child, element))
            }
        })
        .collect()
}

fn distribution(element: &Element) -> Result<StateTypeInfo, StateParseError> {
    let range = element.child("range_constraint");
    Ok(StateTypeInfo::Distribution {
        class: element.attribute("distrib_class").map(str::to_owned),
        num_variates: optional_attribute::<u32>(element, "num_variates")?,
        constraint: range
            .and_then(|range| range.attribute("constraint"))
            .unwrap_or("Any")
            .to_owned(),
        min: range
            .and_then(|range| range.attribute("min_val"))
            .map(str::to_owned),
        max: range
            .and_then(|range| range.attribute("max_val"))
            .map(str::to_owned),
    })
}

fn output(element: &Element) -> Result<StateTypeInfo, StateParseError> {
    let Some(default) = element.child("default") else {
        return Ok(StateTypeInfo::Output {
            suppress: false,
            file: None,
            redirects: Vec::new(),
        });
    };
    let mut file = None;
    let mut redirects = Vec::new();
    for child in default.children() {
        match child.name() {
            "redirect" => redirects.push(child.text().trim().to_owned()),
            "file" => {
                let path = required_attribute(child, "path")?;
                file = Some(OutputFileSpec {
                    append: child.flag("append"),
                    replace: child.flag("replace"),
                    path: path.to_owned(),
                });
            }
            _ => return Err(unexpected(child, default)),
        }
    }
    Ok(StateTypeInfo::Output {
        suppress: default.flag("suppress"),
        file,
        redirects,
    })
}
