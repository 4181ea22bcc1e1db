//! Unit tests for the session reader loop.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use phycas_config::{SocketEndpoint, WarningMode};

use super::*;
use crate::collaborators::Severity;
use crate::language::{CommandLanguage, LanguageCommand};
use crate::model::{SessionModel, SharedModel};
use crate::test_support::{BackendStep, Event, FakeBackend, Recorder};

struct Fixture {
    recorder: Arc<Recorder>,
    model: SharedModel,
    session: Session,
}

fn session_for(backend: &FakeBackend, warnings: WarningMode) -> Fixture {
    let mut language = CommandLanguage::new();
    language
        .register(LanguageCommand::new("Execute"))
        .expect("register Execute");
    let model = SessionModel::new(language).into_shared();
    let recorder = Recorder::shared();
    let connection = Arc::new(SessionConnection::new(backend.endpoint()));
    let router = MessageRouter::new(
        recorder.collaborators(),
        Arc::clone(&connection) as Arc<dyn ReplySink>,
        Arc::clone(&model),
        warnings,
    );
    Fixture {
        recorder,
        model,
        session: Session::new(connection, router),
    }
}

#[test]
fn messages_are_dispatched_until_the_backend_hangs_up() {
    let mut backend = FakeBackend::spawn(vec![
        BackendStep::send("<out>Reading data</out>"),
        BackendStep::settle(),
        BackendStep::send("<warning>slow</warning><idle/>\n"),
        BackendStep::settle(),
    ])
    .expect("fake backend");
    let fixture = session_for(&backend, WarningMode::Transcript);

    let error = fixture.session.run().expect_err("hang-up is fatal");

    assert!(matches!(
        error,
        SessionError::Framing(FramingError::ConnectionClosed)
    ));
    assert_eq!(
        fixture.recorder.events(),
        vec![
            Event::Appended(String::from("Reading data")),
            Event::Appended(String::from(" WARNING > slow")),
        ]
    );
    backend.finish().expect("backend script");
}

#[test]
fn queries_are_answered_before_reading_on() {
    let mut backend = FakeBackend::spawn(vec![
        BackendStep::send(
            "<user_query type=\"choices\"><title>Model</title><choice>JC</choice><choice>HKY</choice></user_query>",
        ),
        BackendStep::ExpectLine,
        BackendStep::send("<out>HKY selected</out>"),
        BackendStep::settle(),
    ])
    .expect("fake backend");
    let fixture = session_for(&backend, WarningMode::Dialog);
    fixture.recorder.queue_reply(Some("1"));

    let outcome = fixture.session.run();

    assert!(outcome.is_err());
    assert_eq!(backend.finish().expect("backend script"), vec!["1"]);
    assert_eq!(
        fixture.recorder.events(),
        vec![
            Event::Asked {
                title: String::from("Model"),
                reply: Some(String::from("1")),
            },
            Event::Appended(String::from("HKY selected")),
        ]
    );
}

#[test]
fn unknown_tags_end_the_session() {
    let backend = FakeBackend::spawn(vec![
        BackendStep::send("<progress>50</progress><out>never shown</out>"),
        BackendStep::AwaitClose,
    ])
    .expect("fake backend");
    let fixture = session_for(&backend, WarningMode::Dialog);

    let error = fixture.session.run().expect_err("unknown tag is fatal");

    assert!(matches!(
        error,
        SessionError::Dispatch(DispatchError::UnknownTag { ref tag }) if tag == "progress"
    ));
    assert!(fixture.recorder.events().is_empty());
}

#[test]
fn command_state_reaches_the_shared_model() {
    let mut backend = FakeBackend::spawn(vec![
        BackendStep::send(concat!(
            "<hidden_query><command_state>",
            "<command label=\"Execute\" available=\"true\"/>",
            "</command_state></hidden_query><idle/>",
        )),
        BackendStep::settle(),
    ])
    .expect("fake backend");
    let fixture = session_for(&backend, WarningMode::Dialog);

    drop(fixture.session.run());

    let model = fixture.model.read().expect("model lock");
    assert!(model.language().get("Execute").expect("Execute").enabled());
    drop(model);
    backend.finish().expect("backend script");
}

#[test]
fn spawned_sessions_stop_cleanly_on_shutdown() {
    let mut backend = FakeBackend::spawn(vec![
        BackendStep::send("<error>disk full</error><idle/>"),
        BackendStep::ExpectLine,
        BackendStep::AwaitClose,
    ])
    .expect("fake backend");
    let fixture = session_for(&backend, WarningMode::Dialog);
    let handle = fixture.session.spawn().expect("spawn session");
    wait_for(|| !fixture.recorder.events().is_empty());

    handle.send("quit").expect("send command");
    handle.shutdown();

    handle.join().expect("clean shutdown");
    assert_eq!(backend.finish().expect("backend script"), vec!["quit"]);
    assert_eq!(
        fixture.recorder.events(),
        vec![Event::Alerted {
            title: String::from("ERROR"),
            message: String::from("disk full"),
            severity: Severity::Error,
        }]
    );
}

#[test]
fn spawning_without_a_backend_fails_fast() {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).expect("bind");
    let port = listener.local_addr().expect("local address").port();
    drop(listener);
    let connection = Arc::new(SessionConnection::new(SocketEndpoint::tcp("127.0.0.1", port)));
    let router = MessageRouter::new(
        Recorder::shared().collaborators(),
        Arc::clone(&connection) as Arc<dyn ReplySink>,
        SessionModel::default().into_shared(),
        WarningMode::Dialog,
    );

    let error = Session::new(connection, router)
        .spawn()
        .expect_err("nothing is listening");

    assert!(matches!(
        error,
        SessionError::Connection(ConnectionError::OpenFailed { .. })
    ));
}

fn wait_for(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met in time");
        thread::sleep(Duration::from_millis(10));
    }
}
