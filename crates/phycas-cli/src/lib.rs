//! Terminal client runtime for phycas sessions.
//!
//! The runtime loads configuration, installs telemetry, starts the session
//! reader thread and relays standard input to the backend. Lines starting
//! with `:` are handled locally; see [`ConsoleCommand`](console::ConsoleCommand).
//! While the backend waits on a user query, the next input line answers it.
//!
//! End of input leaves the session running until the backend closes the
//! connection or asks a question nobody can answer. `:quit` closes it
//! immediately.

use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use phycas_config::Config;
use phycas_session::{
    CommandLanguage, FATAL_SESSION_MESSAGE, MessageRouter, ReplySink, Session, SessionConnection,
    SessionHandle, SessionModel, Severity, SharedModel,
};
use tracing::info;

mod config;
mod console;
mod errors;
mod telemetry;
mod terminal;

use config::{ConfigLoader, OrthoConfigLoader};
use console::ConsoleCommand;
use errors::AppError;
use terminal::{Console, QuerySlot, Terminal};

const CLI_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::runtime");
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs the client with the given arguments and standard streams.
#[must_use]
pub fn run<I, R, W, E>(args: I, input: R, stdout: W, stderr: E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
    E: Write + Send + 'static,
{
    let console = Console::new(stdout, stderr);
    run_with_loader(args, input, &console, &OrthoConfigLoader)
}

pub(crate) fn run_with_loader<I, R, L>(
    args: I,
    input: R,
    console: &Console,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead + Send + 'static,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    match execute(&args, input, console, loader) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error @ (AppError::StartSession(_) | AppError::SessionEnded(_))) => {
            console.alert("ERROR", FATAL_SESSION_MESSAGE, Severity::Error);
            console.err(&error.to_string());
            ExitCode::FAILURE
        }
        Err(error) => {
            console.err(&error.to_string());
            ExitCode::FAILURE
        }
    }
}

/// How the input relay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Quit,
    InputClosed,
    SessionEnded,
}

fn execute<R, L>(args: &[OsString], input: R, console: &Console, loader: &L) -> Result<(), AppError>
where
    R: BufRead + Send + 'static,
    L: ConfigLoader,
{
    let config = loader.load(args)?;
    telemetry::initialise(&config)?;
    let model = SessionModel::new(load_language(&config)?).into_shared();
    let queries = Arc::new(QuerySlot::default());
    let terminal = Terminal::new(console.clone(), Arc::clone(&queries));
    let connection = Arc::new(SessionConnection::new(config.backend_socket().clone()));
    let router = MessageRouter::new(
        terminal.collaborators(),
        Arc::clone(&connection) as Arc<dyn ReplySink>,
        Arc::clone(&model),
        config.warnings(),
    );
    let handle = Session::new(connection, router)
        .spawn()
        .map_err(AppError::StartSession)?;

    let relayed = spawn_input_reader(input).and_then(|lines| {
        relay(&lines, &handle, &queries, &model, console)
    });
    queries.cancel();
    if matches!(relayed, Ok(Exit::InputClosed)) {
        wait_for_backend(&handle, &queries);
    } else {
        handle.shutdown();
    }
    let ended = handle.join();
    let exit = relayed?;
    info!(target: CLI_TARGET, ?exit, "session finished");
    ended.map_err(AppError::SessionEnded)
}

/// Lets the backend finish after input ends. A query that can no longer be
/// answered would stall it, so the session is closed instead.
fn wait_for_backend(handle: &SessionHandle, queries: &QuerySlot) {
    while !handle.is_finished() {
        if queries.is_abandoned() {
            info!(target: CLI_TARGET, "query pending after end of input, closing session");
            handle.shutdown();
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn load_language(config: &Config) -> Result<CommandLanguage, AppError> {
    match config.command_language() {
        Some(path) => Ok(CommandLanguage::load(path.as_std_path())?),
        None => {
            info!(target: CLI_TARGET, "no command language configured");
            Ok(CommandLanguage::new())
        }
    }
}

fn spawn_input_reader<R>(input: R) -> Result<Receiver<io::Result<String>>, AppError>
where
    R: BufRead + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name(String::from("phycas-input"))
        .spawn(move || {
            for line in input.lines() {
                let failed = line.is_err();
                if sender.send(line).is_err() || failed {
                    break;
                }
            }
        })
        .map_err(AppError::ReadInput)?;
    Ok(receiver)
}

fn relay(
    lines: &Receiver<io::Result<String>>,
    handle: &SessionHandle,
    queries: &QuerySlot,
    model: &SharedModel,
    console: &Console,
) -> Result<Exit, AppError> {
    loop {
        if handle.is_finished() {
            return Ok(Exit::SessionEnded);
        }
        let received = match lines.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(received)) => received,
            Ok(Err(error)) => return Err(AppError::ReadInput(error)),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Ok(Exit::InputClosed),
        };
        let Some(line) = queries.offer(received) else {
            continue;
        };
        match ConsoleCommand::parse(&line) {
            Some(Ok(ConsoleCommand::Quit)) => return Ok(Exit::Quit),
            Some(Ok(command)) => {
                let rendered = {
                    let guard = model.read().unwrap_or_else(std::sync::PoisonError::into_inner);
                    command.render(&guard)
                };
                for text in rendered {
                    console.out(&text);
                }
            }
            Some(Err(error)) => console.err(&error.to_string()),
            None if line.trim().is_empty() => {}
            None => handle
                .send(line.trim_end())
                .map_err(AppError::SendCommand)?,
        }
    }
}

#[cfg(test)]
mod tests;
