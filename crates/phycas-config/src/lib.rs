//! Layered configuration for the Phycas session client.
//!
//! Values are merged from built-in defaults, an optional configuration file,
//! `PHYCAS_*` environment variables and command-line flags, in increasing
//! order of precedence. The resulting [`Config`] is passed explicitly to the
//! connection and message router rather than read from process-wide state.

mod defaults;
mod logging;
mod socket;
mod warnings;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_BACKEND_HOST, DEFAULT_BACKEND_PORT, DEFAULT_LOG_FILTER, default_backend_socket,
    default_log_filter, default_log_filter_string, default_log_format, default_warning_mode,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError};
pub use warnings::{WarningMode, WarningModeParseError};

/// Session configuration shared by the engine and the terminal client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "PHYCAS")]
pub struct Config {
    /// Socket the computational backend listens on.
    #[ortho_config(default = default_backend_socket())]
    backend_socket: SocketEndpoint,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    log_filter: String,
    /// Output format of diagnostic logs.
    #[ortho_config(default = default_log_format())]
    log_format: LogFormat,
    /// Presentation of backend warnings.
    #[ortho_config(default = default_warning_mode())]
    warnings: WarningMode,
    /// JSON command-language definition loaded at startup.
    command_language: Option<Utf8PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_socket: default_backend_socket(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            warnings: default_warning_mode(),
            command_language: None,
        }
    }
}

impl Config {
    /// Socket the computational backend listens on.
    #[must_use]
    pub fn backend_socket(&self) -> &SocketEndpoint {
        &self.backend_socket
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format of diagnostic logs.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Presentation of backend warnings.
    #[must_use]
    pub fn warnings(&self) -> WarningMode {
        self.warnings
    }

    /// Path of the command-language definition, when one is configured.
    #[must_use]
    pub fn command_language(&self) -> Option<&Utf8Path> {
        self.command_language.as_deref()
    }

    /// Returns a copy pointing at a different backend socket.
    #[must_use]
    pub fn with_backend_socket(mut self, endpoint: SocketEndpoint) -> Self {
        self.backend_socket = endpoint;
        self
    }

    /// Returns a copy using a different warning presentation.
    #[must_use]
    pub fn with_warnings(mut self, warnings: WarningMode) -> Self {
        self.warnings = warnings;
        self
    }
}
