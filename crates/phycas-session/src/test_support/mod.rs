//! Test doubles for sessions: a scripted backend and recording collaborators.

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use phycas_config::SocketEndpoint;

use crate::collaborators::{
    AlertPresenter, ChartIngester, Collaborators, QueryPresenter, Severity, Transcript,
};
use crate::message::{PlotValue, QuerySpec};

const ACCEPT_DEADLINE: Duration = Duration::from_secs(5);

/// One action of a [`FakeBackend`] script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStep {
    /// Writes raw protocol text.
    Send(String),
    /// Waits for one line from the client and records it.
    ExpectLine,
    /// Sleeps, so that consecutive sends arrive as separate reads.
    Pause(Duration),
    /// Reads until the client closes the connection.
    AwaitClose,
}

impl BackendStep {
    /// Shorthand for [`BackendStep::Send`].
    pub fn send(text: impl Into<String>) -> Self {
        Self::Send(text.into())
    }

    /// A short pause between messages.
    #[must_use]
    pub const fn settle() -> Self {
        Self::Pause(Duration::from_millis(50))
    }
}

/// A backend that accepts one connection and plays a script.
///
/// The connection is dropped once the script ends.
pub struct FakeBackend {
    port: u16,
    received: Arc<Mutex<Vec<String>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl FakeBackend {
    /// Listens on an ephemeral port and plays `script` to the first client.
    ///
    /// # Errors
    ///
    /// Returns an error when the listener cannot be bound.
    pub fn spawn(script: Vec<BackendStep>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake backend")?;
        listener
            .set_nonblocking(true)
            .context("fake backend nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let received = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&received);
        let handle = thread::spawn(move || serve(&listener, &script, &recorder));
        Ok(Self {
            port,
            received,
            handle: Some(handle),
        })
    }

    /// Endpoint clients should dial.
    #[must_use]
    pub fn endpoint(&self) -> SocketEndpoint {
        SocketEndpoint::tcp("127.0.0.1", self.port)
    }

    /// Waits for the script to finish and returns the lines received.
    ///
    /// # Errors
    ///
    /// Returns the failure that stopped the script.
    pub fn finish(&mut self) -> Result<Vec<String>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake backend thread panicked"))?
                .context("fake backend failed")?;
        }
        let received = self
            .received
            .lock()
            .map_err(|error| anyhow!("lock received lines: {error}"))?;
        Ok(received.clone())
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            drop(handle.join());
        }
    }
}

fn serve(
    listener: &TcpListener,
    script: &[BackendStep],
    received: &Arc<Mutex<Vec<String>>>,
) -> Result<()> {
    let stream = accept(listener)?;
    stream
        .set_nonblocking(false)
        .context("fake backend blocking stream")?;
    let mut reader = BufReader::new(stream.try_clone().context("clone stream")?);
    let mut writer = stream;
    for step in script {
        match step {
            BackendStep::Send(text) => {
                writer.write_all(text.as_bytes()).context("write script text")?;
                writer.flush().context("flush script text")?;
            }
            BackendStep::ExpectLine => {
                let mut line = String::new();
                reader.read_line(&mut line).context("read client line")?;
                received
                    .lock()
                    .map_err(|error| anyhow!("lock received lines: {error}"))?
                    .push(line.trim_end_matches(['\r', '\n']).to_owned());
            }
            BackendStep::Pause(duration) => thread::sleep(*duration),
            BackendStep::AwaitClose => {
                let mut sink = Vec::new();
                // A reset is as good as an orderly close here.
                drop(reader.read_to_end(&mut sink));
            }
        }
    }
    Ok(())
}

fn accept(listener: &TcpListener) -> Result<TcpStream> {
    let deadline = Instant::now() + ACCEPT_DEADLINE;
    loop {
        match listener.accept() {
            Ok((stream, _)) => return Ok(stream),
            Err(ref error)
                if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
            {
                thread::sleep(Duration::from_millis(10));
            }
            Err(error) => return Err(error).context("accept client"),
        }
    }
}

/// Something a [`Recorder`] observed.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// [`Transcript::append`].
    Appended(String),
    /// [`Transcript::note`].
    Noted(String),
    /// [`AlertPresenter::alert`].
    Alerted {
        /// Alert title.
        title: String,
        /// Alert text.
        message: String,
        /// Alert severity.
        severity: Severity,
    },
    /// [`QueryPresenter::ask`], with the reply given.
    Asked {
        /// Query title.
        title: String,
        /// Reply returned to the router.
        reply: Option<String>,
    },
    /// [`ChartIngester::ingest_row`].
    Plotted {
        /// Column labels.
        labels: Vec<String>,
        /// Row values.
        values: Vec<PlotValue>,
    },
}

/// Collaborators that record every call and answer queries from a queue.
#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
    replies: Mutex<VecDeque<Option<String>>>,
}

impl Recorder {
    /// Creates a recorder that dismisses every query.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues the reply for the next query.
    pub fn queue_reply(&self, reply: Option<&str>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply.map(str::to_owned));
    }

    /// Everything observed so far.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wires the recorder in as every collaborator.
    #[must_use]
    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            transcript: Arc::clone(self) as Arc<dyn Transcript>,
            alerts: Arc::clone(self) as Arc<dyn AlertPresenter>,
            queries: Arc::clone(self) as Arc<dyn QueryPresenter>,
            charts: Arc::clone(self) as Arc<dyn ChartIngester>,
        }
    }

    fn record(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl Transcript for Recorder {
    fn append(&self, text: &str) {
        self.record(Event::Appended(text.to_owned()));
    }

    fn note(&self, text: &str) {
        self.record(Event::Noted(text.to_owned()));
    }
}

impl AlertPresenter for Recorder {
    fn alert(&self, title: &str, message: &str, severity: Severity) {
        self.record(Event::Alerted {
            title: title.to_owned(),
            message: message.to_owned(),
            severity,
        });
    }
}

impl QueryPresenter for Recorder {
    fn ask(&self, query: &QuerySpec) -> Option<String> {
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .flatten();
        self.record(Event::Asked {
            title: query.title().to_owned(),
            reply: reply.clone(),
        });
        reply
    }
}

impl ChartIngester for Recorder {
    fn ingest_row(&self, labels: &[String], values: &[PlotValue]) {
        self.record(Event::Plotted {
            labels: labels.to_vec(),
            values: values.to_vec(),
        });
    }
}
