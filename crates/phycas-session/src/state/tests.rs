//! Unit tests for command state decoding.

use rstest::{fixture, rstest};

use super::*;
use crate::framer::Frame;

const SAMPLE: &str = r#"<command_state>
  <command label="Execute" available="true">
    <cmd_param label="File" available="true">
      <infile_type_info default="data.nex"/>
    </cmd_param>
  </command>
  <command label="Mcmc" available="true">
    <cmd_param label="NGen" available="true">
      <integer_type_info default="1000" min_val="1" max_val="Burnin"/>
    </cmd_param>
    <cmd_param label="Burnin" available="false"/>
    <cmd_param label="" placement="2" available="true">
      <choice_type_info default="JC"><choice>JC</choice><choice>HKY</choice></choice_type_info>
    </cmd_param>
    <cmd_param label="Prior" available="true">
      <distribution_type_info distrib_class="Continuous" num_variates="1">
        <range_constraint constraint="NonNegative" min_val="0"/>
      </distribution_type_info>
    </cmd_param>
    <cmd_param label="Out" available="true">
      <output_type_info><default suppress="false"><redirect>Output</redirect><file append="true" replace="false" path="run.log"/></default></output_type_info>
    </cmd_param>
  </command>
  <command label="Quit" available="false"/>
  <tax_set_manager max_index="3">
    <index_label label="Homo" index="1"/>
    <known_set label="apes"><members>1-3</members></known_set>
  </tax_set_manager>
</command_state>"#;

fn parse(raw: &str) -> Result<CommandStateModel, StateParseError> {
    let frame = Frame::parse(raw).unwrap();
    CommandStateModel::from_element(frame.elements().first().unwrap())
}

#[fixture]
fn sample() -> CommandStateModel {
    parse(SAMPLE).unwrap()
}

#[rstest]
fn decodes_commands_in_wire_order(sample: CommandStateModel) {
    let labels: Vec<_> = sample.commands().iter().map(CommandState::label).collect();
    assert_eq!(labels, vec!["Execute", "Mcmc", "Quit"]);
    assert!(sample.command("Mcmc").unwrap().available());
    assert!(!sample.command("Quit").unwrap().available());
}

#[rstest]
fn scalar_types_keep_their_attributes(sample: CommandStateModel) {
    let execute = sample.command("Execute").unwrap();
    let info = execute.params().first().unwrap().type_info().unwrap();
    assert_eq!(info, &StateTypeInfo::scalar("infile", "data.nex"));
}

#[rstest]
fn bounds_distinguish_literals_from_label_references(sample: CommandStateModel) {
    let ngen = sample.command("Mcmc").unwrap().params().first().unwrap();
    assert_eq!(
        ngen.type_info().unwrap(),
        &StateTypeInfo::Integer {
            default: Some(String::from("1000")),
            min: Some(StateBound::Literal(String::from("1"))),
            max: Some(StateBound::LabelRef(String::from("Burnin"))),
        }
    );
}

#[rstest]
fn unavailable_params_carry_no_type_info(sample: CommandStateModel) {
    let burnin = sample.command("Mcmc").unwrap().params().get(1).unwrap();
    assert!(!burnin.available());
    assert!(burnin.type_info().is_none());
}

#[rstest]
fn positional_params_keep_their_placement(sample: CommandStateModel) {
    let model = sample.command("Mcmc").unwrap().params().get(2).unwrap();
    assert_eq!(model.label(), "");
    assert_eq!(model.placement(), Some(2));
    assert_eq!(model.display_name(), "#2");
    assert_eq!(model.type_info().unwrap().shape(), StateShape::Choice);
}

#[rstest]
fn distribution_reads_the_range_constraint(sample: CommandStateModel) {
    let prior = sample.command("Mcmc").unwrap().params().get(3).unwrap();
    assert_eq!(
        prior.type_info().unwrap(),
        &StateTypeInfo::Distribution {
            class: Some(String::from("Continuous")),
            num_variates: Some(1),
            constraint: String::from("NonNegative"),
            min: Some(String::from("0")),
            max: None,
        }
    );
}

#[rstest]
fn output_reads_file_and_redirects(sample: CommandStateModel) {
    let out = sample.command("Mcmc").unwrap().params().get(4).unwrap();
    assert_eq!(
        out.type_info().unwrap(),
        &StateTypeInfo::Output {
            suppress: false,
            file: Some(OutputFileSpec {
                append: true,
                replace: false,
                path: String::from("run.log"),
            }),
            redirects: vec![String::from("Output")],
        }
    );
}

#[rstest]
fn set_snapshots_are_attached(sample: CommandStateModel) {
    let (kind, snapshot) = sample.set_snapshots().first().unwrap();
    assert_eq!(*kind, SetKind::Taxon);
    assert_eq!(snapshot.max_index(), Some(3));
    assert_eq!(snapshot.aliases().get(&1).map(String::as_str), Some("Homo"));
    assert_eq!(
        snapshot.sets(),
        &[(String::from("apes"), String::from("1-3"))]
    );
}

#[rstest]
#[case::unknown_child("<command_state><macro/></command_state>")]
#[case::unlabelled_command("<command_state><command available=\"true\"/></command_state>")]
#[case::bad_placement(
    "<command_state><command label=\"A\"><cmd_param placement=\"x\"/></command></command_state>"
)]
#[case::unknown_type(
    "<command_state><command label=\"A\"><cmd_param label=\"p\"><widget/></cmd_param></command></command_state>"
)]
#[case::bad_alias(
    "<command_state><char_set_manager><index_label label=\"a\" index=\"one\"/></char_set_manager></command_state>"
)]
fn rejects_invalid_documents(#[case] raw: &str) {
    assert!(parse(raw).is_err());
}
