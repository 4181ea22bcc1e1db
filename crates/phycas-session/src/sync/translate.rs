//! Value translation between state-side and language-side type shapes.
//!
//! The table in [`translation_for`] is the complete list of supported
//! pairings; anything else is reported as untranslatable.

use std::collections::BTreeMap;
use std::str::FromStr;

use thiserror::Error;

use crate::language::{
    Bound, CmdParam, DistributionClass, LanguageCommand, LanguageShape, LanguageTypeInfo,
    OutputFile, OutputStream, RangeConstraint,
};
use crate::state::{CommandState, StateBound, StateShape, StateTypeInfo};

/// Copies one state-side description into a language-side holder.
pub type Translation =
    fn(&StateTypeInfo, &mut LanguageTypeInfo, &BoundIndex) -> Result<(), TranslationError>;

/// Reasons a translation could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    /// The holders do not have the shapes the translation expects.
    #[error("type shapes do not match the translation")]
    ShapeMismatch,
    /// A value could not be parsed.
    #[error("'{value}' is not a valid {expected}")]
    InvalidValue {
        /// Offending text.
        value: String,
        /// What was expected.
        expected: &'static str,
    },
    /// An enumeration name is unknown on the language side.
    #[error("'{name}' is not a known {kind}")]
    UnknownName {
        /// Offending name.
        name: String,
        /// Enumeration being remapped.
        kind: &'static str,
    },
}

/// Looks up the translation for a pair of shapes.
#[must_use]
pub fn translation_for(state: StateShape, language: LanguageShape) -> Option<Translation> {
    use LanguageShape as L;
    use StateShape as S;

    let translation: Translation = match (state, language) {
        (S::Scalar | S::Choice | S::RestrictedString, L::ConstantString) => copy_default_string,
        (S::Scalar, L::ConstantBool) => parse_default_bool,
        (S::Scalar, L::ConstantInteger) => parse_default_integer,
        (S::Scalar, L::ConstantDouble) => parse_default_double,
        (S::Scalar, L::StringList) => split_default_list,
        (S::Choice, L::Choices) => copy_choices,
        (S::RestrictedString, L::Disallowed) => copy_disallowed,
        (S::Integer, L::ConstantInteger) => copy_integer,
        (S::Double, L::ConstantDouble) => copy_double,
        (S::Distribution, L::DistributionRange) => copy_distribution_range,
        (S::Distribution, L::DistributionClass) => remap_distribution_class,
        (S::Output, L::Output) => copy_output,
        (
            S::Scalar
            | S::Choice
            | S::RestrictedString
            | S::Integer
            | S::Double
            | S::Distribution
            | S::Output,
            _,
        ) => return None,
    };
    Some(translation)
}

/// Which bound of a referenced parameter supplies a label reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundSide {
    /// Lower bound.
    Min,
    /// Upper bound.
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Integer(i64),
    Double(f64),
}

#[derive(Debug, Clone, Default, PartialEq)]
struct BoundEntry {
    min: Option<Number>,
    max: Option<Number>,
    value: Option<Number>,
}

impl BoundEntry {
    fn pick(&self, side: BoundSide) -> Option<Number> {
        let bound = match side {
            BoundSide::Min => self.min,
            BoundSide::Max => self.max,
        };
        bound.or(self.value)
    }
}

/// Numeric parameters of one command that label references may name.
///
/// Only parameters declared by both the state command and the language
/// command are indexed, and lookups never cross into other commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundIndex {
    entries: BTreeMap<String, BoundEntry>,
}

impl BoundIndex {
    /// Captures the numeric parameters of a command before it is updated.
    #[must_use]
    pub fn capture(command: &LanguageCommand, state: &CommandState) -> Self {
        let mut entries = BTreeMap::new();
        for param in command.params() {
            index_param(param, state, &mut entries);
            if let LanguageTypeInfo::Mixed { alternatives, .. } = param.type_info() {
                for alternative in alternatives {
                    index_param(alternative, state, &mut entries);
                }
            }
        }
        Self { entries }
    }

    fn integer(&self, label: &str, side: BoundSide) -> Option<i64> {
        match self.entries.get(label)?.pick(side)? {
            Number::Integer(value) => Some(value),
            Number::Double(_) => None,
        }
    }

    fn double(&self, label: &str, side: BoundSide) -> Option<f64> {
        match self.entries.get(label)?.pick(side)? {
            Number::Double(value) => Some(value),
            Number::Integer(_) => None,
        }
    }
}

fn index_param(param: &CmdParam, state: &CommandState, entries: &mut BTreeMap<String, BoundEntry>) {
    if param.label().is_empty() || !state.declares(param.label()) {
        return;
    }
    let entry = match param.type_info() {
        LanguageTypeInfo::ConstantInteger { value, min, max } => BoundEntry {
            min: min.as_ref().and_then(Bound::value).map(Number::Integer),
            max: max.as_ref().and_then(Bound::value).map(Number::Integer),
            value: value.map(Number::Integer),
        },
        LanguageTypeInfo::ConstantDouble { value, min, max } => BoundEntry {
            min: min.as_ref().and_then(Bound::value).map(Number::Double),
            max: max.as_ref().and_then(Bound::value).map(Number::Double),
            value: value.map(Number::Double),
        },
        _ => return,
    };
    entries.entry(param.label().to_owned()).or_insert(entry);
}

fn parse_value<T: FromStr>(text: &str, expected: &'static str) -> Result<T, TranslationError> {
    text.trim()
        .parse::<T>()
        .map_err(|_| TranslationError::InvalidValue {
            value: text.to_owned(),
            expected,
        })
}

fn parse_name<T: FromStr>(name: &str, kind: &'static str) -> Result<T, TranslationError> {
    name.trim()
        .parse::<T>()
        .map_err(|_| TranslationError::UnknownName {
            name: name.to_owned(),
            kind,
        })
}

fn state_default(state: &StateTypeInfo) -> Option<&str> {
    match state {
        StateTypeInfo::Scalar { fields, .. } => fields.get("default").map(String::as_str),
        StateTypeInfo::Choice { default, .. }
        | StateTypeInfo::RestrictedString { default, .. }
        | StateTypeInfo::Integer { default, .. }
        | StateTypeInfo::Double { default, .. } => default.as_deref(),
        StateTypeInfo::Distribution { .. } | StateTypeInfo::Output { .. } => None,
    }
}

fn copy_default_string(
    state: &StateTypeInfo,
    language: &mut LanguageTypeInfo,
    _: &BoundIndex,
) -> Result<(), TranslationError> {
    let LanguageTypeInfo::ConstantString { value } = language else {
        return Err(TranslationError::ShapeMismatch);
    };
    if let Some(default) = state_default(state) {
        default.clone_into(value);
    }
    Ok(())
}

fn parse_default_bool(
    state: &StateTypeInfo,
    language: &mut LanguageTypeInfo,
    _: &BoundIndex,
) -> Result<(), TranslationError> {
    let LanguageTypeInfo::ConstantBool { value } = language else {
        return Err(TranslationError::ShapeMismatch);
    };
    if let Some(default) = state_default(state) {
        *value = match default.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => true,
            "false" | "no" | "0" => false,
            _ => {
                return Err(TranslationError::InvalidValue {
                    value: default.to_owned(),
                    expected: "boolean",
                });
            }
        };
    }
    Ok(())
}

fn parse_default_integer(
    state: &StateTypeInfo,
    language: &mut LanguageTypeInfo,
    _: &BoundIndex,
) -> Result<(), TranslationError> {
    let LanguageTypeInfo::ConstantInteger { value, .. } = language else {
        return Err(TranslationError::ShapeMismatch);
    };
    if let Some(default) = state_default(state) {
        *value = Some(parse_value(default, "integer")?);
    }
    Ok(())
}

fn parse_default_double(
    state: &StateTypeInfo,
    language: &mut LanguageTypeInfo,
    _: &BoundIndex,
) -> Result<(), TranslationError> {
    let LanguageTypeInfo::ConstantDouble { value, .. } = language else {
        return Err(TranslationError::ShapeMismatch);
    };
    if let Some(default) = state_default(state) {
        *value = Some(parse_value(default, "number")?);
    }
    Ok(())
}

fn split_default_list(
    state: &StateTypeInfo,
    language: &mut LanguageTypeInfo,
    _: &BoundIndex,
) -> Result<(), TranslationError> {
    let LanguageTypeInfo::StringList { values } = language else {
        return Err(TranslationError::ShapeMismatch);
    };
    if let Some(default) = state_default(state) {
        *values = default.split_whitespace().map(str::to_owned).collect();
    }
    Ok(())
}

fn copy_choices(
    state: &StateTypeInfo,
    language: &mut LanguageTypeInfo,
    _: &BoundIndex,
) -> Result<(), TranslationError> {
    let (
        StateTypeInfo::Choice { values, default },
        LanguageTypeInfo::Choices { choices, value },
    ) = (state, language)
    else {
        return Err(TranslationError::ShapeMismatch);
    };
    choices.clone_from(values);
    if default.is_some() {
        value.clone_from(default);
    }
    Ok(())
}

fn copy_disallowed(
    state: &StateTypeInfo,
    language: &mut LanguageTypeInfo,
    _: &BoundIndex,
) -> Result<(), TranslationError> {
    let (
        StateTypeInfo::RestrictedString {
            disallowed: forbidden,
            default,
        },
        LanguageTypeInfo::Disallowed { disallowed, value },
    ) = (state, language)
    else {
        return Err(TranslationError::ShapeMismatch);
    };
    disallowed.clone_from(forbidden);
    if let Some(default) = default {
        default.clone_into(value);
    }
    Ok(())
}

fn integer_bound(
    bound: Option<&StateBound>,
    side: BoundSide,
    bounds: &BoundIndex,
) -> Result<Option<Bound<i64>>, TranslationError> {
    bound
        .map(|bound| match bound {
            StateBound::Literal(text) => parse_value(text, "integer").map(Bound::Value),
            StateBound::LabelRef(label) => Ok(bounds
                .integer(label, side)
                .map_or_else(|| Bound::Unresolved(label.clone()), Bound::Value)),
        })
        .transpose()
}

fn double_bound(
    bound: Option<&StateBound>,
    side: BoundSide,
    bounds: &BoundIndex,
) -> Result<Option<Bound<f64>>, TranslationError> {
    bound
        .map(|bound| match bound {
            StateBound::Literal(text) => parse_value(text, "number").map(Bound::Value),
            StateBound::LabelRef(label) => Ok(bounds
                .double(label, side)
                .map_or_else(|| Bound::Unresolved(label.clone()), Bound::Value)),
        })
        .transpose()
}

fn copy_integer(
    state: &StateTypeInfo,
    language: &mut LanguageTypeInfo,
    bounds: &BoundIndex,
) -> Result<(), TranslationError> {
    let (
        StateTypeInfo::Integer { default, min, max },
        LanguageTypeInfo::ConstantInteger {
            value,
            min: low,
            max: high,
        },
    ) = (state, language)
    else {
        return Err(TranslationError::ShapeMismatch);
    };
    let new_value = default
        .as_deref()
        .map(|text| parse_value::<i64>(text, "integer"))
        .transpose()?;
    let new_low = integer_bound(min.as_ref(), BoundSide::Min, bounds)?;
    let new_high = integer_bound(max.as_ref(), BoundSide::Max, bounds)?;
    if new_value.is_some() {
        *value = new_value;
    }
    *low = new_low;
    *high = new_high;
    Ok(())
}

fn copy_double(
    state: &StateTypeInfo,
    language: &mut LanguageTypeInfo,
    bounds: &BoundIndex,
) -> Result<(), TranslationError> {
    let (
        StateTypeInfo::Double { default, min, max },
        LanguageTypeInfo::ConstantDouble {
            value,
            min: low,
            max: high,
        },
    ) = (state, language)
    else {
        return Err(TranslationError::ShapeMismatch);
    };
    let new_value = default
        .as_deref()
        .map(|text| parse_value::<f64>(text, "number"))
        .transpose()?;
    let new_low = double_bound(min.as_ref(), BoundSide::Min, bounds)?;
    let new_high = double_bound(max.as_ref(), BoundSide::Max, bounds)?;
    if new_value.is_some() {
        *value = new_value;
    }
    *low = new_low;
    *high = new_high;
    Ok(())
}

fn copy_distribution_range(
    state: &StateTypeInfo,
    language: &mut LanguageTypeInfo,
    _: &BoundIndex,
) -> Result<(), TranslationError> {
    let (
        StateTypeInfo::Distribution {
            constraint: name,
            min,
            max,
            ..
        },
        LanguageTypeInfo::DistributionRange {
            constraint,
            min: low,
            max: high,
        },
    ) = (state, language)
    else {
        return Err(TranslationError::ShapeMismatch);
    };
    let new_constraint: RangeConstraint = parse_name(name, "range constraint")?;
    let new_low = min
        .as_deref()
        .map(|text| parse_value::<f64>(text, "number"))
        .transpose()?;
    let new_high = max
        .as_deref()
        .map(|text| parse_value::<f64>(text, "number"))
        .transpose()?;
    *constraint = new_constraint;
    *low = new_low;
    *high = new_high;
    Ok(())
}

fn remap_distribution_class(
    state: &StateTypeInfo,
    language: &mut LanguageTypeInfo,
    _: &BoundIndex,
) -> Result<(), TranslationError> {
    let (
        StateTypeInfo::Distribution { class: name, .. },
        LanguageTypeInfo::DistributionClass { class },
    ) = (state, language)
    else {
        return Err(TranslationError::ShapeMismatch);
    };
    if let Some(name) = name {
        *class = parse_name::<DistributionClass>(name, "distribution class")?;
    }
    Ok(())
}

fn copy_output(
    state: &StateTypeInfo,
    language: &mut LanguageTypeInfo,
    _: &BoundIndex,
) -> Result<(), TranslationError> {
    let (
        StateTypeInfo::Output {
            suppress: silenced,
            file: destination,
            redirects: streams,
        },
        LanguageTypeInfo::Output {
            suppress,
            file,
            redirects,
        },
    ) = (state, language)
    else {
        return Err(TranslationError::ShapeMismatch);
    };
    let remapped = streams
        .iter()
        .map(|name| parse_name::<OutputStream>(name, "output stream"))
        .collect::<Result<Vec<_>, _>>()?;

    *suppress = *silenced;
    match (destination, file.as_mut()) {
        (Some(spec), Some(existing)) => {
            existing.append = spec.append;
            existing.replace = spec.replace;
            spec.path.clone_into(&mut existing.path);
        }
        (Some(spec), None) => {
            *file = Some(OutputFile {
                append: spec.append,
                replace: spec.replace,
                path: spec.path.clone(),
            });
        }
        (None, _) => *file = None,
    }
    for (slot, stream) in remapped.iter().enumerate() {
        match redirects.get_mut(slot) {
            Some(existing) => *existing = *stream,
            None => redirects.push(*stream),
        }
    }
    redirects.truncate(remapped.len());
    Ok(())
}
