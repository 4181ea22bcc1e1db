//! Terminal implementations of the session collaborators.
//!
//! Backend output goes to standard output and alerts to standard error. A
//! pending user query claims the next line of standard input through the
//! shared [`QuerySlot`].

use std::io::Write;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use phycas_session::{
    AlertPresenter, ChartIngester, Collaborators, PlotValue, QueryAnswer, QueryKind,
    QueryPresenter, QuerySpec, Severity, Transcript,
};
use tracing::warn;

pub(crate) const TERMINAL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::terminal");

type SharedWriter = Arc<Mutex<dyn Write + Send>>;

fn lock(writer: &SharedWriter) -> MutexGuard<'_, dyn Write + Send + 'static> {
    writer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Standard output and error, shared between threads.
#[derive(Clone)]
pub(crate) struct Console {
    stdout: SharedWriter,
    stderr: SharedWriter,
}

impl Console {
    pub(crate) fn new<W, E>(stdout: W, stderr: E) -> Self
    where
        W: Write + Send + 'static,
        E: Write + Send + 'static,
    {
        Self {
            stdout: Arc::new(Mutex::new(stdout)),
            stderr: Arc::new(Mutex::new(stderr)),
        }
    }

    /// Writes a line to standard output.
    pub(crate) fn out(&self, text: &str) {
        write_line(&self.stdout, text);
    }

    /// Writes a line to standard error.
    pub(crate) fn err(&self, text: &str) {
        write_line(&self.stderr, text);
    }

    /// Writes an alert line to standard error.
    pub(crate) fn alert(&self, title: &str, message: &str, severity: Severity) {
        self.err(&format!("[{severity}] {title}: {message}"));
    }
}

fn write_line(writer: &SharedWriter, text: &str) {
    let mut guard = lock(writer);
    let line_break = if text.ends_with('\n') { "" } else { "\n" };
    let outcome = write!(guard, "{text}{line_break}").and_then(|()| guard.flush());
    if let Err(error) = outcome {
        warn!(target: TERMINAL_TARGET, %error, "terminal write failed");
    }
}

/// Hands the next input line to a waiting query.
///
/// Once cancelled the slot stays closed: later queries resolve as
/// abandoned instead of waiting for input that will never come.
#[derive(Default)]
pub(crate) struct QuerySlot {
    pending: Mutex<Pending>,
}

#[derive(Default)]
struct Pending {
    sender: Option<Sender<String>>,
    closed: bool,
    abandoned: bool,
}

impl QuerySlot {
    fn register(&self) -> Receiver<String> {
        let (sender, receiver) = mpsc::channel();
        let mut pending = self.guard();
        if pending.closed {
            pending.abandoned = true;
        } else {
            pending.sender = Some(sender);
        }
        receiver
    }

    /// Delivers `line` to a waiting query. Returns the line when nothing is
    /// waiting.
    pub(crate) fn offer(&self, line: String) -> Option<String> {
        let Some(sender) = self.guard().sender.take() else {
            return Some(line);
        };
        sender.send(line).err().map(|unsent| unsent.0)
    }

    /// Dismisses a waiting query and closes the slot.
    pub(crate) fn cancel(&self) {
        let mut pending = self.guard();
        pending.closed = true;
        if pending.sender.take().is_some() {
            pending.abandoned = true;
        }
    }

    /// Returns `true` once a query was dismissed by closing the slot.
    pub(crate) fn is_abandoned(&self) -> bool {
        self.guard().abandoned
    }

    fn guard(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) fn interpret_answer(query: &QuerySpec, line: &str) -> QueryAnswer {
    let input = line.trim();
    match query.kind() {
        QueryKind::File | QueryKind::Text => QueryAnswer::Text(input.to_owned()),
        QueryKind::Alert => QueryAnswer::Acknowledged,
        QueryKind::Choices => {
            if input.is_empty() {
                QueryAnswer::Choice(query.default_choice())
            } else {
                input
                    .parse::<usize>()
                    .map_or(QueryAnswer::Cancelled, QueryAnswer::Choice)
            }
        }
        QueryKind::ConfirmOkCancel | QueryKind::ConfirmYesNo => {
            match input.to_ascii_lowercase().as_str() {
                "" | "y" | "yes" | "ok" => QueryAnswer::Confirmed(true),
                "n" | "no" => QueryAnswer::Confirmed(false),
                _ => QueryAnswer::Cancelled,
            }
        }
    }
}

fn prompt(query: &QuerySpec) -> String {
    let mut text = String::new();
    if !query.title().is_empty() {
        text.push_str(query.title());
        text.push('\n');
    }
    if !query.message().is_empty() {
        text.push_str(query.message());
        text.push('\n');
    }
    for (index, choice) in query.choices().iter().enumerate() {
        let marker = if index == query.default_choice() { "*" } else { " " };
        text.push_str(&format!("{marker}{index}) {choice}\n"));
    }
    let hint = match query.kind() {
        QueryKind::File => "path (blank to cancel)",
        QueryKind::Text => "text",
        QueryKind::Alert => "press enter",
        QueryKind::Choices => "choice number",
        QueryKind::ConfirmOkCancel => "ok/cancel",
        QueryKind::ConfirmYesNo => "yes/no",
    };
    text.push_str(&format!("[{hint}]> "));
    text
}

/// Collaborators writing to the terminal.
pub(crate) struct Terminal {
    console: Console,
    queries: Arc<QuerySlot>,
    plot_header: Mutex<Option<Vec<String>>>,
}

impl Terminal {
    pub(crate) fn new(console: Console, queries: Arc<QuerySlot>) -> Arc<Self> {
        Arc::new(Self {
            console,
            queries,
            plot_header: Mutex::new(None),
        })
    }

    pub(crate) fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            transcript: Arc::clone(self) as Arc<dyn Transcript>,
            alerts: Arc::clone(self) as Arc<dyn AlertPresenter>,
            queries: Arc::clone(self) as Arc<dyn QueryPresenter>,
            charts: Arc::clone(self) as Arc<dyn ChartIngester>,
        }
    }
}

impl Transcript for Terminal {
    fn append(&self, text: &str) {
        self.console.out(text);
    }

    fn note(&self, text: &str) {
        self.console.out(text);
    }
}

impl AlertPresenter for Terminal {
    fn alert(&self, title: &str, message: &str, severity: Severity) {
        self.console.alert(title, message, severity);
    }
}

impl QueryPresenter for Terminal {
    fn ask(&self, query: &QuerySpec) -> Option<String> {
        let receiver = self.queries.register();
        self.console.out(&prompt(query));
        let Ok(line) = receiver.recv() else {
            warn!(target: TERMINAL_TARGET, title = query.title(), "query abandoned");
            self.console.err("query abandoned: no more input");
            return None;
        };
        query.reply(interpret_answer(query, &line))
    }
}

impl ChartIngester for Terminal {
    fn ingest_row(&self, labels: &[String], values: &[PlotValue]) {
        let mut header = self
            .plot_header
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if header.as_deref() != Some(labels) {
            self.console.out(&labels.join("\t"));
            *header = Some(labels.to_vec());
        }
        let row: Vec<String> = values
            .iter()
            .map(|value| match value {
                PlotValue::Number(number) => number.to_string(),
                PlotValue::Text(text) => text.clone(),
            })
            .collect();
        self.console.out(&row.join("\t"));
    }
}
