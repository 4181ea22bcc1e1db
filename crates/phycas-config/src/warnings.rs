//! Presentation of warnings reported by the backend.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Where backend warnings are presented.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum WarningMode {
    /// Raise a modal alert for every warning.
    #[default]
    Dialog,
    /// Append warnings to the transcript.
    Transcript,
    /// Drop warnings silently.
    Suppress,
}

/// Errors encountered while parsing a [`WarningMode`] from text.
pub type WarningModeParseError = strum::ParseError;
