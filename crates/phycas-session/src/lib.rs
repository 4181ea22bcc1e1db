//! Client-side engine for XML sessions with a phycas backend.
//!
//! The backend streams bare XML elements over a socket. A [`StreamFramer`]
//! assembles them into frames, the [`MessageRouter`] applies each message to
//! the presentation collaborators, and hidden command state is folded into
//! the shared [`SessionModel`] by the [`StateSyncEngine`]. Replies and user
//! commands travel back through a [`SessionConnection`] as newline-terminated
//! lines.
//!
//! A [`Session`] runs the read loop on a dedicated thread:
//!
//! ```text
//! socket -> StreamFramer -> MessageRouter -> collaborators
//!                                   \-> StateSyncEngine -> SessionModel
//! ```
//!
//! Framing, protocol and connection errors end the session. Problems inside a
//! single parameter or payload are logged and skipped.

pub mod collaborators;
pub mod connection;
pub mod framer;
pub mod language;
pub mod message;
pub mod model;
pub mod router;
pub mod session;
pub mod sets;
pub mod state;
pub mod sync;
pub mod xml;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use collaborators::{
    AlertPresenter, ChartIngester, Collaborators, QueryPresenter, Severity, Transcript,
};
pub use connection::{Connection, ConnectionError, ReplySink, SessionConnection};
pub use framer::{Frame, FramingError, StreamFramer};
pub use language::{CmdParam, CommandLanguage, LanguageCommand, LanguageError, LanguageTypeInfo};
pub use message::{ClassifyError, Message, PlotRow, PlotValue, QueryAnswer, QueryKind, QuerySpec};
pub use model::{SessionModel, SharedModel};
pub use router::{DispatchError, MessageRouter};
pub use session::{FATAL_SESSION_MESSAGE, Session, SessionError, SessionHandle};
pub use sets::{IndexedSet, MemberRange, MemberSpecError, SetKind, SetManager, SetSnapshot};
pub use state::{CommandState, CommandStateModel, ParamState, StateParseError, StateTypeInfo};
pub use sync::{StateSyncEngine, SyncError, SyncReport};

#[cfg(test)]
mod tests;
