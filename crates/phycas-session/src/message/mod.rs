//! Classification of top-level protocol elements into typed messages.

mod plot;
mod query;

use thiserror::Error;

pub use plot::{PlotRow, PlotValue};
pub use query::{QueryAnswer, QueryKind, QuerySpec};

use crate::xml::Element;

/// Tags the backend may emit at the top level of a message.
pub mod tags {
    /// Command state update wrapper.
    pub const HIDDEN_QUERY: &str = "hidden_query";
    /// Blocking question for the user.
    pub const USER_QUERY: &str = "user_query";
    /// Chart rows.
    pub const PLOT: &str = "plot";
    /// Standard output.
    pub const OUT: &str = "out";
    /// Error report.
    pub const ERROR: &str = "error";
    /// Informational comment.
    pub const COMMENT: &str = "comment";
    /// Warning report.
    pub const WARNING: &str = "warning";
    /// Backend is waiting for a command.
    pub const IDLE: &str = "idle";
    /// Payload of a [`HIDDEN_QUERY`].
    pub const COMMAND_STATE: &str = "command_state";
}

/// A decoded top-level element.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Text destined for the transcript.
    Output(String),
    /// Commentary destined for the transcript.
    Comment(String),
    /// An error to show as an alert.
    Error(String),
    /// A warning, presented according to configuration.
    Warning(String),
    /// The backend is waiting for input.
    Idle,
    /// A question requiring a reply.
    UserQuery(QuerySpec),
    /// Chart rows.
    Plot(Vec<PlotRow>),
    /// The embedded `command_state` document.
    HiddenState(Element),
}

/// Reasons an element could not become a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// The tag is not part of the protocol.
    #[error("unknown message tag '{tag}'")]
    UnknownTag {
        /// Offending tag.
        tag: String,
    },
    /// A known tag carried an unusable payload.
    #[error("malformed '{tag}' message: {reason}")]
    Malformed {
        /// Tag of the message.
        tag: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl ClassifyError {
    fn malformed(tag: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            tag: tag.to_owned(),
            reason: reason.into(),
        }
    }
}

impl Message {
    /// Classifies one top-level element.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::UnknownTag`] for tags outside the protocol and
    /// [`ClassifyError::Malformed`] for known tags with unusable payloads.
    pub fn classify(element: &Element) -> Result<Self, ClassifyError> {
        let tag = element.name();
        match tag {
            tags::OUT => Ok(Self::Output(element.text().to_owned())),
            tags::COMMENT => Ok(Self::Comment(element.text().to_owned())),
            tags::ERROR => Ok(Self::Error(element.text().to_owned())),
            tags::WARNING => Ok(Self::Warning(element.text().to_owned())),
            tags::IDLE => Ok(Self::Idle),
            tags::USER_QUERY => QuerySpec::from_element(element)
                .map(Self::UserQuery)
                .map_err(|reason| ClassifyError::malformed(tag, reason)),
            tags::PLOT => PlotRow::from_plot(element)
                .map(Self::Plot)
                .map_err(|reason| ClassifyError::malformed(tag, reason)),
            tags::HIDDEN_QUERY => element
                .child(tags::COMMAND_STATE)
                .cloned()
                .map(Self::HiddenState)
                .ok_or_else(|| ClassifyError::malformed(tag, "missing command_state")),
            other => Err(ClassifyError::UnknownTag {
                tag: other.to_owned(),
            }),
        }
    }

    /// Short name used in diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Output(_) => "output",
            Self::Comment(_) => "comment",
            Self::Error(_) => "error",
            Self::Warning(_) => "warning",
            Self::Idle => "idle",
            Self::UserQuery(_) => "user_query",
            Self::Plot(_) => "plot",
            Self::HiddenState(_) => "hidden_state",
        }
    }
}
