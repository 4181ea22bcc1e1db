//! Lazily opened, write-serialised connection to the backend.
//!
//! The reader thread owns a cloned read half while replies and user commands
//! share the write half behind one mutex. Closing the connection shuts the
//! socket down so a blocked reader wakes with an error.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[cfg(unix)]
use std::os::fd::OwnedFd;
#[cfg(unix)]
use std::os::unix::net::UnixStream;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};

use phycas_config::SocketEndpoint;
use thiserror::Error;
use tracing::{debug, warn};

pub(crate) const CONNECTION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::connection");

/// Maximum time spent establishing a connection.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised by [`SessionConnection`].
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The backend socket could not be opened.
    #[error("failed to connect to backend at {endpoint}: {source}")]
    OpenFailed {
        /// Endpoint that was dialled.
        endpoint: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Writing a line failed.
    #[error("failed to write to backend: {0}")]
    WriteFailed(#[source] io::Error),
    /// The connection state lock was poisoned by a panicking writer.
    #[error("backend connection is unusable")]
    Closed,
}

/// A byte stream to the backend over TCP or a Unix socket.
#[derive(Debug)]
pub enum Connection {
    /// TCP transport.
    Tcp(TcpStream),
    /// Unix domain socket transport.
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Connection {
    /// Dials an endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::OpenFailed`] when resolution or the connect
    /// attempt fails.
    pub fn open(endpoint: &SocketEndpoint) -> Result<Self, ConnectionError> {
        let open_failed = |source| ConnectionError::OpenFailed {
            endpoint: endpoint.to_string(),
            source,
        };
        match endpoint {
            SocketEndpoint::Tcp { host, port } => {
                let address = resolve_tcp_address(host, *port).map_err(open_failed)?;
                TcpStream::connect_timeout(&address, CONNECTION_TIMEOUT)
                    .map(Self::Tcp)
                    .map_err(open_failed)
            }
            SocketEndpoint::Unix { path } => {
                #[cfg(unix)]
                {
                    connect_unix(path.as_str()).map_err(open_failed)
                }

                #[cfg(not(unix))]
                {
                    let _ = path;
                    Err(open_failed(io::Error::new(
                        io::ErrorKind::Unsupported,
                        "platform does not support Unix sockets",
                    )))
                }
            }
        }
    }

    /// Duplicates the underlying socket handle.
    ///
    /// # Errors
    ///
    /// Propagates the operating system error.
    pub fn try_clone(&self) -> io::Result<Self> {
        match self {
            Self::Tcp(stream) => stream.try_clone().map(Self::Tcp),
            #[cfg(unix)]
            Self::Unix(stream) => stream.try_clone().map(Self::Unix),
        }
    }

    /// Shuts down both directions of the socket.
    ///
    /// # Errors
    ///
    /// Propagates the operating system error.
    pub fn shutdown(&self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Self::Unix(stream) => stream.shutdown(Shutdown::Both),
        }
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

#[cfg(unix)]
fn connect_unix(path: &str) -> io::Result<Connection> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, CONNECTION_TIMEOUT)?;
    Ok(Connection::Unix(UnixStream::from(OwnedFd::from(socket))))
}

/// Destination for newline-terminated replies.
pub trait ReplySink: Send + Sync {
    /// Writes one line and flushes it.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionError`] when the line could not be delivered.
    fn send(&self, line: &str) -> Result<(), ConnectionError>;
}

/// The session's connection to the backend.
///
/// The socket opens on first use and every write holds the same lock, so
/// query replies from the reader thread never interleave with commands.
#[derive(Debug)]
pub struct SessionConnection {
    endpoint: SocketEndpoint,
    stream: Mutex<Option<Connection>>,
}

impl SessionConnection {
    /// Creates an unopened connection.
    #[must_use]
    pub const fn new(endpoint: SocketEndpoint) -> Self {
        Self {
            endpoint,
            stream: Mutex::new(None),
        }
    }

    /// Endpoint this connection dials.
    #[must_use]
    pub const fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Returns `true` once the socket has been opened and not closed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock().is_ok_and(|guard| guard.is_some())
    }

    /// Opens the socket unless it is already open.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::OpenFailed`] when dialling fails.
    pub fn open_if_needed(&self) -> Result<(), ConnectionError> {
        let mut guard = self.lock()?;
        Self::ensure_open(&self.endpoint, &mut guard).map(|_| ())
    }

    /// Returns an independent read half, opening the socket if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::OpenFailed`] when dialling or cloning the
    /// handle fails.
    pub fn reader(&self) -> Result<Connection, ConnectionError> {
        let mut guard = self.lock()?;
        let stream = Self::ensure_open(&self.endpoint, &mut guard)?;
        stream
            .try_clone()
            .map_err(|source| ConnectionError::OpenFailed {
                endpoint: self.endpoint.to_string(),
                source,
            })
    }

    /// Shuts the socket down. A later send reopens it.
    pub fn close(&self) {
        let Ok(mut guard) = self.lock() else {
            return;
        };
        if let Some(stream) = guard.take() {
            if let Err(error) = stream.shutdown() {
                debug!(target: CONNECTION_TARGET, %error, "socket shutdown reported an error");
            }
            debug!(target: CONNECTION_TARGET, endpoint = %self.endpoint, "connection closed");
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>, ConnectionError> {
        self.stream.lock().map_err(|_| ConnectionError::Closed)
    }

    fn ensure_open<'a>(
        endpoint: &SocketEndpoint,
        slot: &'a mut Option<Connection>,
    ) -> Result<&'a mut Connection, ConnectionError> {
        if slot.is_none() {
            let stream = Connection::open(endpoint)?;
            debug!(target: CONNECTION_TARGET, %endpoint, "connection opened");
            *slot = Some(stream);
        }
        slot.as_mut().ok_or(ConnectionError::Closed)
    }
}

impl ReplySink for SessionConnection {
    fn send(&self, line: &str) -> Result<(), ConnectionError> {
        let mut guard = self.lock()?;
        let stream = Self::ensure_open(&self.endpoint, &mut guard)?;
        let result = stream
            .write_all(line.as_bytes())
            .and_then(|()| stream.write_all(b"\n"))
            .and_then(|()| stream.flush());
        if let Err(source) = result {
            warn!(target: CONNECTION_TARGET, error = %source, "backend write failed");
            return Err(ConnectionError::WriteFailed(source));
        }
        debug!(target: CONNECTION_TARGET, bytes = line.len() + 1, "line sent");
        Ok(())
    }
}

impl Drop for SessionConnection {
    fn drop(&mut self) {
        self.close();
    }
}
