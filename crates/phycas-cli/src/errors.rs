//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use phycas_session::{ConnectionError, LanguageError, SessionError};
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to load command language: {0}")]
    LoadLanguage(#[from] LanguageError),
    #[error("failed to start the session: {0}")]
    StartSession(#[source] SessionError),
    #[error("failed to send command: {0}")]
    SendCommand(#[source] ConnectionError),
    #[error("failed to read standard input: {0}")]
    ReadInput(#[source] io::Error),
    #[error("{0}")]
    SessionEnded(#[source] SessionError),
}
