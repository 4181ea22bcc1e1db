use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;
use crate::warnings::WarningMode;

/// Host the backend listens on when nothing else is configured.
pub const DEFAULT_BACKEND_HOST: &str = "127.0.0.1";

/// TCP port the backend listens on when nothing else is configured.
pub const DEFAULT_BACKEND_PORT: u16 = 4444;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default presentation of backend warnings.
pub fn default_warning_mode() -> WarningMode {
    WarningMode::Dialog
}

/// Endpoint of a backend running on the local machine.
pub fn default_backend_socket() -> SocketEndpoint {
    SocketEndpoint::tcp(DEFAULT_BACKEND_HOST, DEFAULT_BACKEND_PORT)
}
