//! Unit tests for message routing.

use std::io;

use mockall::mock;
use rstest::rstest;

use super::*;
use crate::collaborators::{AlertPresenter, ChartIngester, QueryPresenter, Transcript};
use crate::connection::ConnectionError;
use crate::language::{CommandLanguage, LanguageCommand};
use crate::message::PlotValue;
use crate::model::SessionModel;
use crate::sets::SetKind;

mock! {
    Sink {}
    impl Transcript for Sink {
        fn append(&self, text: &str);
        fn note(&self, text: &str);
    }
}

mock! {
    Alerts {}
    impl AlertPresenter for Alerts {
        fn alert(&self, title: &str, message: &str, severity: Severity);
    }
}

mock! {
    Queries {}
    impl QueryPresenter for Queries {
        fn ask(&self, query: &QuerySpec) -> Option<String>;
    }
}

mock! {
    Charts {}
    impl ChartIngester for Charts {
        fn ingest_row(&self, labels: &[String], values: &[PlotValue]);
    }
}

mock! {
    Replies {}
    impl ReplySink for Replies {
        fn send(&self, line: &str) -> Result<(), ConnectionError>;
    }
}

/// Mocks without expectations; any unexpected call fails the test.
#[derive(Default)]
struct Harness {
    transcript: MockSink,
    alerts: MockAlerts,
    queries: MockQueries,
    charts: MockCharts,
    replies: MockReplies,
    warnings: WarningMode,
}

impl Harness {
    fn router(self) -> (MessageRouter, SharedModel) {
        let mut language = CommandLanguage::new();
        language
            .register(LanguageCommand::new("Execute"))
            .expect("register Execute");
        let model = SessionModel::new(language).into_shared();
        let collaborators = Collaborators {
            transcript: Arc::new(self.transcript),
            alerts: Arc::new(self.alerts),
            queries: Arc::new(self.queries),
            charts: Arc::new(self.charts),
        };
        let router = MessageRouter::new(
            collaborators,
            Arc::new(self.replies),
            Arc::clone(&model),
            self.warnings,
        );
        (router, model)
    }
}

fn dispatch(harness: Harness, raw: &str) -> Result<(), DispatchError> {
    let (mut router, _) = harness.router();
    router.dispatch(&Frame::parse(raw).expect("valid frame"))
}

#[test]
fn output_and_comments_reach_the_transcript_unless_blank() {
    let mut harness = Harness::default();
    harness
        .transcript
        .expect_append()
        .withf(|text| text == "hello")
        .once()
        .return_const(());
    harness
        .transcript
        .expect_append()
        .withf(|text| text == "note")
        .once()
        .return_const(());

    dispatch(
        harness,
        "<out>hello</out><out>  \n </out><out/><comment>note</comment>",
    )
    .expect("dispatch");
}

#[test]
fn errors_raise_an_alert() {
    let mut harness = Harness::default();
    harness
        .alerts
        .expect_alert()
        .withf(|title, message, severity| {
            title == ERROR_TITLE && message == "bad input" && *severity == Severity::Error
        })
        .once()
        .return_const(());

    dispatch(harness, "<error>bad input</error>").expect("dispatch");
}

#[rstest]
#[case::dialog(WarningMode::Dialog)]
#[case::transcript(WarningMode::Transcript)]
#[case::suppress(WarningMode::Suppress)]
fn warnings_follow_the_configured_mode(#[case] mode: WarningMode) {
    let mut harness = Harness {
        warnings: mode,
        ..Harness::default()
    };
    match mode {
        WarningMode::Dialog => {
            harness
                .alerts
                .expect_alert()
                .withf(|title, message, severity| {
                    title == WARNING_TITLE && message == "careful" && *severity == Severity::Warning
                })
                .once()
                .return_const(());
        }
        WarningMode::Transcript => {
            harness
                .transcript
                .expect_append()
                .withf(|text| text == " WARNING > careful")
                .once()
                .return_const(());
        }
        WarningMode::Suppress => {}
    }

    dispatch(harness, "<warning>careful</warning>").expect("dispatch");
}

#[test]
fn unknown_tags_abort_before_any_side_effect() {
    let harness = Harness::default();

    let error = dispatch(harness, "<out>first</out><progress>50</progress><out>last</out>")
        .expect_err("unknown tag must fail");

    assert!(matches!(error, DispatchError::UnknownTag { tag } if tag == "progress"));
}

#[test]
fn answered_queries_send_the_reply() {
    let mut harness = Harness::default();
    harness
        .queries
        .expect_ask()
        .withf(|query| query.title() == "Continue?")
        .once()
        .returning(|_| Some(String::from("0")));
    harness
        .replies
        .expect_send()
        .withf(|line| line == "0")
        .once()
        .returning(|_| Ok(()));

    dispatch(
        harness,
        "<user_query type=\"no_yes\"><title>Continue?</title><message>Run?</message></user_query>",
    )
    .expect("dispatch");
}

#[test]
fn dismissed_queries_send_nothing() {
    let mut harness = Harness::default();
    harness.queries.expect_ask().once().returning(|_| None);

    dispatch(harness, "<user_query type=\"string\"><title>Name</title></user_query>")
        .expect("dispatch");
}

#[test]
fn failed_replies_are_noted_and_the_session_continues() {
    let mut harness = Harness::default();
    harness
        .queries
        .expect_ask()
        .once()
        .returning(|_| Some(String::from("1")));
    harness.replies.expect_send().once().returning(|_| {
        Err(ConnectionError::WriteFailed(io::Error::from(
            io::ErrorKind::BrokenPipe,
        )))
    });
    harness
        .transcript
        .expect_note()
        .withf(|text| text == REPLY_FAILED_NOTE)
        .once()
        .return_const(());
    harness
        .transcript
        .expect_append()
        .withf(|text| text == "after")
        .once()
        .return_const(());

    dispatch(
        harness,
        "<user_query type=\"alert\"><message>Done</message></user_query><out>after</out>",
    )
    .expect("dispatch");
}

#[test]
fn plot_entries_need_labels_first() {
    let mut harness = Harness::default();
    harness
        .charts
        .expect_ingest_row()
        .withf(|labels, values| {
            labels == ["gen", "lnL"]
                && values == [PlotValue::Number(10.0), PlotValue::Text(String::from("n/a"))]
        })
        .once()
        .return_const(());

    dispatch(
        harness,
        "<plot><entry>1 2</entry><label>gen lnL</label><entry>10 n/a</entry></plot>",
    )
    .expect("dispatch");
}

#[test]
fn command_state_updates_the_shared_model() {
    let (mut router, model) = Harness::default().router();
    let raw = concat!(
        "<hidden_query><command_state>",
        "<command label=\"Execute\" available=\"true\"/>",
        "<tax_set_manager max_index=\"2\"><index_label label=\"Homo\" index=\"1\"/></tax_set_manager>",
        "</command_state></hidden_query>",
    );

    router
        .dispatch(&Frame::parse(raw).expect("valid frame"))
        .expect("dispatch");

    let guard = model.read().expect("model lock");
    assert!(guard.language().get("Execute").expect("Execute").enabled());
    assert_eq!(guard.sets(SetKind::Taxon).get_domain(), vec!["Homo", "2"]);
    drop(guard);
    let report = router.last_sync().expect("sync report");
    assert_eq!(report.enabled_commands(), ["Execute"]);
}

#[test]
fn unparsable_command_state_is_noted() {
    let mut harness = Harness::default();
    harness
        .transcript
        .expect_note()
        .withf(|text| text == STATE_FAILED_NOTE)
        .once()
        .return_const(());

    dispatch(
        harness,
        "<hidden_query><command_state><bogus/></command_state></hidden_query>",
    )
    .expect("dispatch");
}

#[test]
fn malformed_payloads_are_noted_without_stopping_the_frame() {
    let mut harness = Harness::default();
    harness
        .transcript
        .expect_note()
        .withf(|text| text.contains("user_query"))
        .once()
        .return_const(());
    harness
        .transcript
        .expect_append()
        .withf(|text| text == "after")
        .once()
        .return_const(());

    dispatch(harness, "<user_query type=\"bogus\"/><out>after</out>").expect("dispatch");
}
