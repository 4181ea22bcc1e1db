//! Interfaces to the presentation layer.
//!
//! The router drives these from the reader thread. Implementations must be
//! shareable across threads because command submission happens elsewhere.

use std::fmt;
use std::sync::Arc;

use strum::{Display, EnumString};

use crate::message::{PlotValue, QuerySpec};

/// Seriousness of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Severity {
    /// Something failed.
    Error,
    /// Something looks wrong but work continues.
    Warning,
    /// Informational notice.
    Info,
}

/// Sink for the running session transcript.
pub trait Transcript: Send + Sync {
    /// Appends backend output verbatim.
    fn append(&self, text: &str);

    /// Appends a client-side note, such as a failed reply.
    fn note(&self, text: &str);
}

/// Presents modal alerts.
pub trait AlertPresenter: Send + Sync {
    /// Shows an alert and returns once it has been acknowledged.
    fn alert(&self, title: &str, message: &str, severity: Severity);
}

/// Asks the user to answer a backend query.
pub trait QueryPresenter: Send + Sync {
    /// Blocks until the user answers.
    ///
    /// Returns the reply line to send, or `None` when nothing should be
    /// sent.
    fn ask(&self, query: &QuerySpec) -> Option<String>;
}

/// Receives plot rows.
pub trait ChartIngester: Send + Sync {
    /// Ingests one row under the current column labels.
    fn ingest_row(&self, labels: &[String], values: &[PlotValue]);
}

/// The full set of presentation collaborators used by a session.
#[derive(Clone)]
pub struct Collaborators {
    /// Transcript sink.
    pub transcript: Arc<dyn Transcript>,
    /// Alert presenter.
    pub alerts: Arc<dyn AlertPresenter>,
    /// Query presenter.
    pub queries: Arc<dyn QueryPresenter>,
    /// Chart ingester.
    pub charts: Arc<dyn ChartIngester>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
