//! Splits the backend's unframed byte stream into parsed protocol messages.
//!
//! The backend writes bare sibling elements with no length prefix or
//! envelope. A message is complete when a read returns less than a full
//! chunk and the accumulated bytes end with one of the closing markers in
//! [`MESSAGE_TERMINATORS`]. The heuristic is fragile: payload text that
//! happens to end a short read with one of those markers is cut early, and a
//! message whose length is an exact multiple of the read size waits for the
//! next one.

use std::io::{self, Read};

use thiserror::Error;
use tracing::{debug, trace};

use crate::xml::{Element, SYNTHETIC_ROOT};

pub(crate) const FRAMER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::framer");

/// Bytes requested from the source per read.
pub const READ_SIZE: usize = 1000;

/// Closing markers that may end a message.
pub const MESSAGE_TERMINATORS: [&str; 5] = [
    "</out>",
    "<idle/>",
    "</user_query>",
    "</plot>",
    "<out/>",
];

/// Errors surfaced while assembling a message.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The source reported end of stream before a message was complete.
    #[error("the backend closed the connection")]
    ConnectionClosed,
    /// The source failed.
    #[error("failed to read from the backend: {0}")]
    Read(#[source] io::Error),
    /// The accumulated bytes are not a well-formed fragment.
    #[error("malformed protocol document: {reason}")]
    MalformedDocument {
        /// Accumulated text without the synthetic root.
        raw: String,
        /// Parser diagnostic.
        reason: String,
    },
}

/// One complete protocol message: the top-level elements of a read burst.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    raw: String,
    root: Element,
}

impl Frame {
    /// Parses a fragment of sibling elements.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::MalformedDocument`] when the fragment does not
    /// parse once wrapped in the synthetic root.
    pub fn parse(text: impl Into<String>) -> Result<Self, FramingError> {
        let raw = text.into();
        let wrapped = format!("<{SYNTHETIC_ROOT}>{raw}</{SYNTHETIC_ROOT}>");
        match Element::parse_document(&wrapped) {
            Ok(root) => Ok(Self { raw, root }),
            Err(error) => Err(FramingError::MalformedDocument {
                raw,
                reason: error.to_string(),
            }),
        }
    }

    /// Builds a frame from already decoded elements.
    #[must_use]
    pub fn from_elements(elements: impl IntoIterator<Item = Element>) -> Self {
        let root = elements
            .into_iter()
            .fold(Element::new(SYNTHETIC_ROOT), Element::with_child);
        Self {
            raw: String::new(),
            root,
        }
    }

    /// Text as received, without the synthetic root.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Top-level elements in arrival order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        self.root.children()
    }
}

/// Assembles [`Frame`]s from a blocking byte source.
///
/// Iteration yields frames until the first error, which is yielded once;
/// afterwards the framer is exhausted and a new connection is required.
#[derive(Debug)]
pub struct StreamFramer<R> {
    source: R,
    read_size: usize,
    exhausted: bool,
}

impl<R: Read> StreamFramer<R> {
    /// Wraps a source using the standard read size.
    pub const fn new(source: R) -> Self {
        Self::with_read_size(source, READ_SIZE)
    }

    /// Wraps a source using a custom read size.
    pub const fn with_read_size(source: R, read_size: usize) -> Self {
        Self {
            source,
            read_size,
            exhausted: false,
        }
    }

    /// Borrows the underlying source.
    pub const fn get_ref(&self) -> &R {
        &self.source
    }

    /// Returns `true` once an error has ended the stream.
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Blocks until one complete message has been read.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError`] when the source closes or fails, or when the
    /// assembled text does not parse.
    pub fn next_frame(&mut self) -> Result<Frame, FramingError> {
        let mut buffer: Vec<u8> = Vec::new();
        let mut chunk = vec![0_u8; self.read_size.max(1)];
        loop {
            let read = match self.source.read(&mut chunk) {
                Ok(0) => return Err(FramingError::ConnectionClosed),
                Ok(read) => read,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(FramingError::Read(error)),
            };
            buffer.extend_from_slice(chunk.get(..read).unwrap_or_default());
            trace!(target: FRAMER_TARGET, read, buffered = buffer.len(), "read chunk");
            if read < self.read_size && ends_message(&buffer) {
                break;
            }
        }

        let raw = String::from_utf8(buffer).map_err(|error| FramingError::MalformedDocument {
            raw: String::from_utf8_lossy(error.as_bytes()).into_owned(),
            reason: error.to_string(),
        })?;
        let frame = Frame::parse(raw)?;
        debug!(
            target: FRAMER_TARGET,
            elements = frame.elements().len(),
            "assembled message"
        );
        Ok(frame)
    }
}

impl<R: Read> Iterator for StreamFramer<R> {
    type Item = Result<Frame, FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let result = self.next_frame();
        if result.is_err() {
            self.exhausted = true;
        }
        Some(result)
    }
}

fn ends_message(buffer: &[u8]) -> bool {
    let trimmed = buffer
        .strip_suffix(b"\n")
        .or_else(|| buffer.strip_suffix(b"\r"))
        .unwrap_or(buffer);
    MESSAGE_TERMINATORS
        .iter()
        .any(|marker| trimmed.ends_with(marker.as_bytes()))
}
