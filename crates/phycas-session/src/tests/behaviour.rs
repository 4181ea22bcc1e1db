//! Behavioural tests for command state synchronisation.

use std::cell::RefCell;
use std::sync::Arc;

use phycas_config::WarningMode;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::connection::{ConnectionError, ReplySink};
use crate::framer::Frame;
use crate::language::{CmdParam, LanguageCommand, LanguageTypeInfo};
use crate::model::{SessionModel, SharedModel};
use crate::router::{DispatchError, MessageRouter};
use crate::sets::SetKind;
use crate::test_support::Recorder;

struct Discard;

impl ReplySink for Discard {
    fn send(&self, _line: &str) -> Result<(), ConnectionError> {
        Ok(())
    }
}

struct TestWorld {
    recorder: Arc<Recorder>,
    model: SharedModel,
    router: MessageRouter,
    outcome: Option<Result<(), DispatchError>>,
}

impl TestWorld {
    fn new() -> Self {
        let recorder = Recorder::shared();
        let model = SessionModel::default().into_shared();
        let router = MessageRouter::new(
            recorder.collaborators(),
            Arc::new(Discard),
            Arc::clone(&model),
            WarningMode::Dialog,
        );
        Self {
            recorder,
            model,
            router,
            outcome: None,
        }
    }

    fn deliver(&mut self, raw: &str) {
        let frame = Frame::parse(raw).expect("frame should parse");
        self.outcome = Some(self.router.dispatch(&frame));
    }

    fn deliver_state(&mut self, body: &str) {
        self.deliver(&format!(
            "<hidden_query><command_state>{body}</command_state></hidden_query>"
        ));
        assert!(
            matches!(self.outcome, Some(Ok(()))),
            "state dispatch failed: {:?}",
            self.outcome
        );
    }

    fn with_model<T>(&self, read: impl FnOnce(&SessionModel) -> T) -> T {
        let model = self.model.read().expect("model lock");
        read(&model)
    }
}

#[fixture]
fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}

#[given("a language where \"{command}\" has an integer parameter \"{param}\" set to \"{value}\"")]
fn given_integer_param(world: &RefCell<TestWorld>, command: String, param: String, value: String) {
    let initial = value.parse::<i64>().expect("integer value");
    let state = world.borrow();
    let mut model = state.model.write().expect("model lock");
    model
        .language_mut()
        .register(LanguageCommand::new(command).with_param(CmdParam::labelled(
            param,
            LanguageTypeInfo::ConstantInteger {
                value: Some(initial),
                min: None,
                max: None,
            },
        )))
        .expect("register command");
}

#[when("the backend reports \"{command}\" available with \"{param}\" set to \"{value}\"")]
fn when_available_with_value(
    world: &RefCell<TestWorld>,
    command: String,
    param: String,
    value: String,
) {
    world.borrow_mut().deliver_state(&format!(
        "<command label=\"{command}\" available=\"true\">\
         <cmd_param label=\"{param}\" available=\"true\">\
         <integer_type_info default=\"{value}\"/></cmd_param></command>"
    ));
}

#[when("the backend reports \"{command}\" unavailable")]
fn when_unavailable(world: &RefCell<TestWorld>, command: String) {
    world
        .borrow_mut()
        .deliver_state(&format!("<command label=\"{command}\" available=\"false\"/>"));
}

#[when("the backend reports \"{command}\" available without parameters")]
fn when_available_bare(world: &RefCell<TestWorld>, command: String) {
    world
        .borrow_mut()
        .deliver_state(&format!("<command label=\"{command}\" available=\"true\"/>"));
}

#[when("the backend sends a frame ending in the unknown tag \"{tag}\"")]
fn when_unknown_tag(world: &RefCell<TestWorld>, tag: String) {
    world
        .borrow_mut()
        .deliver(&format!("<out>before</out><{tag}>50</{tag}>"));
}

#[when("the backend reports the taxon alias \"{label}\" for index \"{index}\" with {count} taxa")]
fn when_taxon_alias(world: &RefCell<TestWorld>, label: String, index: String, count: u32) {
    world.borrow_mut().deliver_state(&format!(
        "<tax_set_manager max_index=\"{count}\">\
         <index_label label=\"{label}\" index=\"{index}\"/></tax_set_manager>"
    ));
}

#[then("command \"{command}\" is disabled")]
fn then_disabled(world: &RefCell<TestWorld>, command: String) {
    let enabled = world
        .borrow()
        .with_model(|model| model.language().get(&command).map(LanguageCommand::enabled));
    assert_eq!(enabled, Some(false));
}

#[then("command \"{command}\" is enabled")]
fn then_enabled(world: &RefCell<TestWorld>, command: String) {
    let enabled = world
        .borrow()
        .with_model(|model| model.language().get(&command).map(LanguageCommand::enabled));
    assert_eq!(enabled, Some(true));
}

#[then("parameter \"{param}\" of \"{command}\" holds \"{value}\"")]
fn then_param_holds(world: &RefCell<TestWorld>, param: String, command: String, value: String) {
    let expected = value.parse::<i64>().expect("integer value");
    let held = world.borrow().with_model(|model| {
        model
            .language()
            .get(&command)
            .and_then(|found| found.param(&param))
            .map(|found| found.type_info().clone())
    });
    assert_eq!(
        held,
        Some(LanguageTypeInfo::ConstantInteger {
            value: Some(expected),
            min: None,
            max: None,
        })
    );
}

#[then("dispatch fails on the unknown tag \"{tag}\"")]
fn then_unknown_tag(world: &RefCell<TestWorld>, tag: String) {
    let state = world.borrow();
    match state.outcome.as_ref() {
        Some(Err(DispatchError::UnknownTag { tag: reported })) => assert_eq!(reported, &tag),
        other => panic!("expected an unknown tag failure, got {other:?}"),
    }
}

#[then("nothing reached the transcript")]
fn then_transcript_empty(world: &RefCell<TestWorld>) {
    assert!(world.borrow().recorder.events().is_empty());
}

#[then("the taxon domain reads \"{domain}\"")]
fn then_taxon_domain(world: &RefCell<TestWorld>, domain: String) {
    let labels = world
        .borrow()
        .with_model(|model| model.sets(SetKind::Taxon).get_domain());
    assert_eq!(labels.join(" "), domain);
}

#[scenario(path = "tests/features/state_sync.feature")]
fn state_sync(world: RefCell<TestWorld>) {
    let _ = world;
}
