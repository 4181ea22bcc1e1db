//! Parameters of the resident command language.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A bound that is either known or still names another parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound<T> {
    /// A literal value.
    Value(T),
    /// A parameter label that could not be resolved.
    Unresolved(String),
}

impl<T: Copy> Bound<T> {
    /// The literal value, when known.
    pub const fn value(&self) -> Option<T> {
        match self {
            Self::Value(value) => Some(*value),
            Self::Unresolved(_) => None,
        }
    }
}

/// Range restriction of a distribution parameter.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[strum(ascii_case_insensitive)]
pub enum RangeConstraint {
    /// No restriction.
    #[default]
    Any,
    /// Components sum to one.
    SumToOne,
    /// Values lie in `[0, 1]`.
    ZeroToOne,
    /// Values are not negative.
    NonNegative,
    /// Values lie between explicit limits.
    Bounded,
    /// Values are unrestricted.
    Unbounded,
}

/// Family of a distribution parameter.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[strum(ascii_case_insensitive)]
pub enum DistributionClass {
    /// Either family.
    #[default]
    Any,
    /// Discrete distributions.
    Discrete,
    /// Continuous distributions.
    Continuous,
}

/// Streams command output may be echoed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum OutputStream {
    /// Standard output.
    Output,
    /// Comment stream.
    Comment,
    /// Error stream.
    Error,
    /// Plot stream.
    Plot,
}

/// File destination of an output parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    /// Append to an existing file.
    pub append: bool,
    /// Overwrite an existing file.
    pub replace: bool,
    /// Destination path.
    pub path: String,
}

/// Shape of a language-side value holder, used to select a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageShape {
    /// [`LanguageTypeInfo::ConstantString`].
    ConstantString,
    /// [`LanguageTypeInfo::ConstantBool`].
    ConstantBool,
    /// [`LanguageTypeInfo::ConstantInteger`].
    ConstantInteger,
    /// [`LanguageTypeInfo::ConstantDouble`].
    ConstantDouble,
    /// [`LanguageTypeInfo::Choices`].
    Choices,
    /// [`LanguageTypeInfo::Disallowed`].
    Disallowed,
    /// [`LanguageTypeInfo::StringList`].
    StringList,
    /// [`LanguageTypeInfo::DistributionRange`].
    DistributionRange,
    /// [`LanguageTypeInfo::DistributionClass`].
    DistributionClass,
    /// [`LanguageTypeInfo::Output`].
    Output,
    /// [`LanguageTypeInfo::Mixed`].
    Mixed,
}

/// Value holder of a language parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LanguageTypeInfo {
    /// A single string.
    ConstantString {
        /// Current value.
        #[serde(default)]
        value: String,
    },
    /// A flag.
    ConstantBool {
        /// Current value.
        #[serde(default)]
        value: bool,
    },
    /// An integer with optional bounds.
    ConstantInteger {
        /// Current value.
        #[serde(default)]
        value: Option<i64>,
        /// Lower bound.
        #[serde(default)]
        min: Option<Bound<i64>>,
        /// Upper bound.
        #[serde(default)]
        max: Option<Bound<i64>>,
    },
    /// A real number with optional bounds.
    ConstantDouble {
        /// Current value.
        #[serde(default)]
        value: Option<f64>,
        /// Lower bound.
        #[serde(default)]
        min: Option<Bound<f64>>,
        /// Upper bound.
        #[serde(default)]
        max: Option<Bound<f64>>,
    },
    /// One of an enumerated set of strings.
    Choices {
        /// Permitted values.
        #[serde(default)]
        choices: Vec<String>,
        /// Selected value.
        #[serde(default)]
        value: Option<String>,
    },
    /// A string that must avoid certain values.
    Disallowed {
        /// Forbidden values.
        #[serde(default)]
        disallowed: Vec<String>,
        /// Current value.
        #[serde(default)]
        value: String,
    },
    /// A list of strings.
    StringList {
        /// Current values.
        #[serde(default)]
        values: Vec<String>,
    },
    /// Range restriction of a distribution.
    DistributionRange {
        /// Kind of restriction.
        #[serde(default)]
        constraint: RangeConstraint,
        /// Lower limit.
        #[serde(default)]
        min: Option<f64>,
        /// Upper limit.
        #[serde(default)]
        max: Option<f64>,
    },
    /// Family of a distribution.
    DistributionClass {
        /// Selected family.
        #[serde(default)]
        class: DistributionClass,
    },
    /// Output destination.
    Output {
        /// Output is discarded.
        #[serde(default)]
        suppress: bool,
        /// File destination.
        #[serde(default)]
        file: Option<OutputFile>,
        /// Streams output is echoed to.
        #[serde(default)]
        redirects: Vec<OutputStream>,
    },
    /// Alternative representations of one logical value.
    Mixed {
        /// The alternatives.
        alternatives: Vec<CmdParam>,
        /// Index of the alternative last matched by the backend.
        #[serde(default)]
        active: Option<usize>,
    },
}

impl LanguageTypeInfo {
    /// Shape used to select a translation.
    #[must_use]
    pub const fn shape(&self) -> LanguageShape {
        match self {
            Self::ConstantString { .. } => LanguageShape::ConstantString,
            Self::ConstantBool { .. } => LanguageShape::ConstantBool,
            Self::ConstantInteger { .. } => LanguageShape::ConstantInteger,
            Self::ConstantDouble { .. } => LanguageShape::ConstantDouble,
            Self::Choices { .. } => LanguageShape::Choices,
            Self::Disallowed { .. } => LanguageShape::Disallowed,
            Self::StringList { .. } => LanguageShape::StringList,
            Self::DistributionRange { .. } => LanguageShape::DistributionRange,
            Self::DistributionClass { .. } => LanguageShape::DistributionClass,
            Self::Output { .. } => LanguageShape::Output,
            Self::Mixed { .. } => LanguageShape::Mixed,
        }
    }
}

/// A parameter of a language command.
///
/// Parameters are identified by label, or by placement when the label is
/// empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmdParam {
    #[serde(default)]
    label: String,
    #[serde(default)]
    placement: Option<u32>,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    type_info: LanguageTypeInfo,
}

const fn enabled_by_default() -> bool {
    true
}

impl CmdParam {
    /// Creates an enabled, labelled parameter.
    #[must_use]
    pub fn labelled(label: impl Into<String>, type_info: LanguageTypeInfo) -> Self {
        Self {
            label: label.into(),
            placement: None,
            enabled: true,
            type_info,
        }
    }

    /// Creates an enabled positional parameter.
    #[must_use]
    pub const fn placed(placement: u32, type_info: LanguageTypeInfo) -> Self {
        Self {
            label: String::new(),
            placement: Some(placement),
            enabled: true,
            type_info,
        }
    }

    /// Parameter label; empty for positional parameters.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Position of an unlabelled parameter.
    #[must_use]
    pub const fn placement(&self) -> Option<u32> {
        self.placement
    }

    /// Whether the bound UI field accepts input.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables the bound UI field without touching its value.
    pub const fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Current value holder.
    #[must_use]
    pub const fn type_info(&self) -> &LanguageTypeInfo {
        &self.type_info
    }

    /// Mutable value holder.
    pub const fn type_info_mut(&mut self) -> &mut LanguageTypeInfo {
        &mut self.type_info
    }

    /// Matches by label, or by placement when `label` is empty.
    #[must_use]
    pub fn matches(&self, label: &str, placement: Option<u32>) -> bool {
        if label.is_empty() {
            self.label.is_empty() && placement.is_some() && self.placement == placement
        } else {
            self.label == label
        }
    }
}
