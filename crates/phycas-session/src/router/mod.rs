//! Applies the side effects of each message in a frame.
//!
//! Every top-level element of a frame is classified before anything is
//! applied, so an unknown tag aborts the frame without touching the
//! collaborators, the model or the connection.

use std::sync::Arc;

use phycas_config::WarningMode;
use thiserror::Error;
use tracing::{debug, warn};

use crate::collaborators::{Collaborators, Severity};
use crate::connection::ReplySink;
use crate::framer::Frame;
use crate::message::{ClassifyError, Message, PlotRow, QuerySpec};
use crate::model::SharedModel;
use crate::state::CommandStateModel;
use crate::sync::{StateSyncEngine, SyncReport};
use crate::xml::Element;

pub(crate) const ROUTER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::router");

/// Title of error alerts.
pub const ERROR_TITLE: &str = "ERROR";
/// Title of warning alerts.
pub const WARNING_TITLE: &str = "WARNING";
/// Prefix of warnings written to the transcript.
pub const WARNING_PREFIX: &str = " WARNING > ";
/// Transcript note for a reply that could not be written.
pub const REPLY_FAILED_NOTE: &str = "Unable to write response.";
/// Transcript note for a command state that could not be decoded.
pub const STATE_FAILED_NOTE: &str = "Unable to parse new command state.";

/// Session-fatal dispatch failures.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A top-level element outside the protocol.
    #[error("unknown message tag '{tag}'")]
    UnknownTag {
        /// Offending tag.
        tag: String,
    },
    /// A thread panicked while holding the session model.
    #[error("session model lock is poisoned")]
    ModelPoisoned,
}

/// Routes decoded messages to the presentation layer and the model.
pub struct MessageRouter {
    collaborators: Collaborators,
    replies: Arc<dyn ReplySink>,
    model: SharedModel,
    warnings: WarningMode,
    engine: StateSyncEngine,
    plot_labels: Option<Vec<String>>,
    last_sync: Option<SyncReport>,
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("warnings", &self.warnings)
            .field("plot_labels", &self.plot_labels)
            .finish_non_exhaustive()
    }
}

impl MessageRouter {
    /// Creates a router.
    #[must_use]
    pub fn new(
        collaborators: Collaborators,
        replies: Arc<dyn ReplySink>,
        model: SharedModel,
        warnings: WarningMode,
    ) -> Self {
        Self {
            collaborators,
            replies,
            model,
            warnings,
            engine: StateSyncEngine::new(),
            plot_labels: None,
            last_sync: None,
        }
    }

    /// Report of the most recent command state synchronisation.
    #[must_use]
    pub const fn last_sync(&self) -> Option<&SyncReport> {
        self.last_sync.as_ref()
    }

    /// Dispatches every message of a frame in arrival order.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownTag`] before applying anything when
    /// any element is outside the protocol, and
    /// [`DispatchError::ModelPoisoned`] when the model cannot be updated.
    pub fn dispatch(&mut self, frame: &Frame) -> Result<(), DispatchError> {
        let classified: Vec<Result<Message, ClassifyError>> =
            frame.elements().iter().map(Message::classify).collect();
        if let Some(tag) = classified.iter().find_map(unknown_tag) {
            warn!(target: ROUTER_TARGET, tag, "unknown message tag");
            return Err(DispatchError::UnknownTag {
                tag: tag.to_owned(),
            });
        }

        for outcome in classified {
            match outcome {
                Ok(message) => self.dispatch_message(message)?,
                Err(error) => self.report_malformed(&error),
            }
        }
        Ok(())
    }

    /// Applies the side effects of one message.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ModelPoisoned`] when a command state cannot
    /// be applied because the model lock is poisoned.
    pub fn dispatch_message(&mut self, message: Message) -> Result<(), DispatchError> {
        debug!(target: ROUTER_TARGET, kind = message.kind_name(), "dispatching message");
        match message {
            Message::Output(text) | Message::Comment(text) => {
                if !text.trim().is_empty() {
                    self.collaborators.transcript.append(&text);
                }
            }
            Message::Error(text) => {
                self.collaborators
                    .alerts
                    .alert(ERROR_TITLE, &text, Severity::Error);
            }
            Message::Warning(text) => self.present_warning(&text),
            Message::Idle => debug!(target: ROUTER_TARGET, "backend is idle"),
            Message::UserQuery(query) => self.answer_query(&query),
            Message::Plot(rows) => self.ingest_plot(rows),
            Message::HiddenState(element) => self.apply_state(&element)?,
        }
        Ok(())
    }

    fn present_warning(&self, text: &str) {
        match self.warnings {
            WarningMode::Dialog => {
                self.collaborators
                    .alerts
                    .alert(WARNING_TITLE, text, Severity::Warning);
            }
            WarningMode::Transcript => {
                self.collaborators
                    .transcript
                    .append(&format!("{WARNING_PREFIX}{text}"));
            }
            WarningMode::Suppress => {
                debug!(target: ROUTER_TARGET, warning = text, "warning suppressed");
            }
        }
    }

    fn answer_query(&self, query: &QuerySpec) {
        let Some(reply) = self.collaborators.queries.ask(query) else {
            warn!(
                target: ROUTER_TARGET,
                title = query.title(),
                "query dismissed without a reply"
            );
            return;
        };
        if let Err(error) = self.replies.send(&reply) {
            warn!(target: ROUTER_TARGET, %error, "query reply could not be sent");
            self.collaborators.transcript.note(REPLY_FAILED_NOTE);
        }
    }

    fn ingest_plot(&mut self, rows: Vec<PlotRow>) {
        for row in rows {
            match row {
                PlotRow::Labels(labels) => self.plot_labels = Some(labels),
                PlotRow::Values(values) => match &self.plot_labels {
                    Some(labels) => self.collaborators.charts.ingest_row(labels, &values),
                    None => warn!(
                        target: ROUTER_TARGET,
                        columns = values.len(),
                        "plot entry arrived before its labels"
                    ),
                },
            }
        }
    }

    fn apply_state(&mut self, element: &Element) -> Result<(), DispatchError> {
        let state = match CommandStateModel::from_element(element) {
            Ok(state) => state,
            Err(error) => {
                warn!(target: ROUTER_TARGET, %error, "command state rejected");
                self.collaborators.transcript.note(STATE_FAILED_NOTE);
                return Ok(());
            }
        };
        let mut model = self
            .model
            .write()
            .map_err(|_| DispatchError::ModelPoisoned)?;
        let report = self.engine.synchronize(&state, &mut model);
        drop(model);
        debug!(
            target: ROUTER_TARGET,
            commands = state.commands().len(),
            skipped = report.errors().len(),
            "command state applied"
        );
        self.last_sync = Some(report);
        Ok(())
    }

    fn report_malformed(&self, error: &ClassifyError) {
        warn!(target: ROUTER_TARGET, %error, "message ignored");
        self.collaborators.transcript.note(&error.to_string());
    }
}

fn unknown_tag(outcome: &Result<Message, ClassifyError>) -> Option<&str> {
    match outcome {
        Err(ClassifyError::UnknownTag { tag }) => Some(tag.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
