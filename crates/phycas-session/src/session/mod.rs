//! The reader loop tying the framer to the router.
//!
//! One thread owns the read half of the connection, frames messages and
//! dispatches them synchronously. A user query therefore holds up further
//! reads until it has been answered. The loop ends at the first fatal error
//! or once the connection is closed locally.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{error, info};

use crate::connection::{ConnectionError, ReplySink, SessionConnection};
use crate::framer::{FramingError, StreamFramer};
use crate::router::{DispatchError, MessageRouter};

pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Alert shown when a session ends on a fatal error.
pub const FATAL_SESSION_MESSAGE: &str =
    "An error has occurred in the socket, so the session must exit.";

/// Reasons a session ended abnormally.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backend could not be reached.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// The byte stream broke or carried an unparsable message.
    #[error(transparent)]
    Framing(#[from] FramingError),
    /// A message violated the protocol.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// The reader thread could not be started.
    #[error("failed to start the session reader: {0}")]
    Spawn(#[source] io::Error),
    /// The reader thread panicked.
    #[error("the session reader panicked")]
    ReaderPanicked,
}

/// A connection paired with the router that consumes it.
#[derive(Debug)]
pub struct Session {
    connection: Arc<SessionConnection>,
    router: MessageRouter,
}

impl Session {
    /// Pairs a connection with a router.
    #[must_use]
    pub const fn new(connection: Arc<SessionConnection>, router: MessageRouter) -> Self {
        Self { connection, router }
    }

    /// Runs the reader loop on the calling thread.
    ///
    /// Returns `Ok(())` when the connection was closed locally.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`SessionError`]. The connection is closed
    /// before returning.
    pub fn run(mut self) -> Result<(), SessionError> {
        let outcome = self.read_until_closed();
        self.connection.close();
        outcome
    }

    /// Opens the connection and runs the reader loop on a new thread.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Connection`] when the backend cannot be
    /// reached and [`SessionError::Spawn`] when the thread cannot start.
    pub fn spawn(self) -> Result<SessionHandle, SessionError> {
        self.connection.open_if_needed()?;
        let connection = Arc::clone(&self.connection);
        let reader = thread::Builder::new()
            .name(String::from("phycas-reader"))
            .spawn(move || self.run())
            .map_err(SessionError::Spawn)?;
        Ok(SessionHandle { connection, reader })
    }

    fn read_until_closed(&mut self) -> Result<(), SessionError> {
        let reader = self.connection.reader()?;
        info!(
            target: SESSION_TARGET,
            endpoint = %self.connection.endpoint(),
            "session started"
        );
        let mut framer = StreamFramer::new(reader);
        loop {
            let frame = match framer.next_frame() {
                Ok(frame) => frame,
                Err(_) if !self.connection.is_open() => {
                    info!(target: SESSION_TARGET, "session closed");
                    return Ok(());
                }
                Err(failure) => {
                    error!(target: SESSION_TARGET, error = %failure, "session read failed");
                    return Err(failure.into());
                }
            };
            if let Err(failure) = self.router.dispatch(&frame) {
                error!(target: SESSION_TARGET, error = %failure, "session dispatch failed");
                return Err(failure.into());
            }
        }
    }
}

/// Handle to a session running on its own thread.
#[derive(Debug)]
pub struct SessionHandle {
    connection: Arc<SessionConnection>,
    reader: JoinHandle<Result<(), SessionError>>,
}

impl SessionHandle {
    /// Sends a command line to the backend.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionError`] when the line cannot be written.
    pub fn send(&self, line: &str) -> Result<(), ConnectionError> {
        self.connection.send(line)
    }

    /// The shared connection.
    #[must_use]
    pub const fn connection(&self) -> &Arc<SessionConnection> {
        &self.connection
    }

    /// Returns `true` once the reader loop has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.reader.is_finished()
    }

    /// Closes the connection, which ends the reader loop.
    pub fn shutdown(&self) {
        self.connection.close();
    }

    /// Waits for the reader loop to end.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the loop, or
    /// [`SessionError::ReaderPanicked`].
    pub fn join(self) -> Result<(), SessionError> {
        self.reader
            .join()
            .map_err(|_| SessionError::ReaderPanicked)?
    }
}

#[cfg(test)]
mod tests;
