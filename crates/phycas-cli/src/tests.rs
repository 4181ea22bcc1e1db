//! Runtime tests driving the client against a scripted backend.

use std::ffi::OsString;
use std::io::{self, Cursor, Write};
use std::net::TcpListener;
use std::process::ExitCode;
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use phycas_config::{Config, SocketEndpoint};
use phycas_session::FATAL_SESSION_MESSAGE;
use phycas_session::test_support::{BackendStep, FakeBackend};

use super::*;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct StaticLoader(Config);

impl ConfigLoader for StaticLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.0.clone())
    }
}

struct Outcome {
    code: ExitCode,
    stdout: String,
    stderr: String,
}

fn run_client(endpoint: SocketEndpoint, input: &str) -> Outcome {
    let stdout = SharedBuffer::default();
    let stderr = SharedBuffer::default();
    let console = Console::new(stdout.clone(), stderr.clone());
    let loader = StaticLoader(Config::default().with_backend_socket(endpoint));
    let code = run_with_loader(
        [OsString::from("phycas")],
        Cursor::new(input.to_owned()),
        &console,
        &loader,
    );
    Outcome {
        code,
        stdout: stdout.contents(),
        stderr: stderr.contents(),
    }
}

fn unused_endpoint() -> Result<SocketEndpoint> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind probe")?;
    let port = listener.local_addr().context("probe addr")?.port();
    drop(listener);
    Ok(SocketEndpoint::tcp("127.0.0.1", port))
}

#[test]
fn commands_are_relayed_until_the_backend_hangs_up() -> Result<()> {
    let mut backend = FakeBackend::spawn(vec![
        BackendStep::send("<out>Welcome</out><idle/>"),
        BackendStep::ExpectLine,
        BackendStep::send("<error>no data</error><idle/>"),
        BackendStep::settle(),
    ])?;

    let outcome = run_client(backend.endpoint(), "execute data.nex\n");

    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(outcome.stdout.contains("Welcome"));
    assert!(outcome.stderr.contains("[ERROR] ERROR: no data"));
    assert!(outcome.stderr.contains(FATAL_SESSION_MESSAGE));
    assert_eq!(backend.finish()?, vec![String::from("execute data.nex")]);
    Ok(())
}

#[test]
fn quit_closes_the_session_cleanly() -> Result<()> {
    let mut backend = FakeBackend::spawn(vec![BackendStep::AwaitClose])?;

    let outcome = run_client(backend.endpoint(), "\n:quit\n");

    assert_eq!(outcome.code, ExitCode::SUCCESS);
    assert!(!outcome.stderr.contains(FATAL_SESSION_MESSAGE));
    assert!(backend.finish()?.is_empty());
    Ok(())
}

#[test]
fn console_errors_do_not_reach_the_backend() -> Result<()> {
    let mut backend = FakeBackend::spawn(vec![BackendStep::AwaitClose])?;

    let outcome = run_client(backend.endpoint(), ":bogus\n:domain\n:quit\n");

    assert_eq!(outcome.code, ExitCode::SUCCESS);
    assert!(outcome.stderr.contains("unknown console command ':bogus'"));
    assert!(outcome.stderr.contains("':domain' needs one of char, tax or tree"));
    assert!(backend.finish()?.is_empty());
    Ok(())
}

#[test]
fn queries_after_input_ends_close_the_session() -> Result<()> {
    let mut backend = FakeBackend::spawn(vec![
        BackendStep::Pause(Duration::from_millis(300)),
        BackendStep::send(
            "<user_query type=\"string\"><title>Name</title>\
             <message>Enter a name</message></user_query>",
        ),
        BackendStep::AwaitClose,
    ])?;
    let endpoint = backend.endpoint();

    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || drop(sender.send(run_client(endpoint, ""))));
    let outcome = receiver
        .recv_timeout(Duration::from_secs(5))
        .map_err(|_| anyhow!("client kept waiting on an unanswerable query"))?;

    assert_eq!(outcome.code, ExitCode::SUCCESS);
    assert!(outcome.stdout.contains("Enter a name"));
    assert!(outcome.stderr.contains("query abandoned"));
    assert!(backend.finish()?.is_empty());
    Ok(())
}

#[test]
fn unreachable_backend_is_fatal() -> Result<()> {
    let outcome = run_client(unused_endpoint()?, "");

    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(outcome.stderr.contains(FATAL_SESSION_MESSAGE));
    assert!(outcome.stderr.contains("failed to start the session"));
    Ok(())
}
