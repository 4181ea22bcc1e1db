//! Unit tests for the command registry.

use rstest::rstest;
use tempfile::NamedTempFile;

use super::*;

const DEFINITION: &str = r#"{
  "commands": [
    {
      "label": "Mcmc",
      "params": [
        { "label": "NGen", "type_info": { "type": "constant_integer", "value": 1000 } },
        { "placement": 1, "type_info": { "type": "choices", "choices": ["JC", "HKY"] } },
        {
          "label": "Prior",
          "type_info": {
            "type": "mixed",
            "alternatives": [
              { "label": "Prior", "type_info": { "type": "distribution_range" } },
              { "label": "Prior", "type_info": { "type": "constant_string" } }
            ]
          }
        }
      ]
    },
    { "label": "Quit" }
  ]
}"#;

#[test]
fn loads_json_definitions() {
    let language = CommandLanguage::from_json(DEFINITION).unwrap();
    assert_eq!(language.len(), 2);
    let mcmc = language.get("Mcmc").unwrap();
    assert!(!mcmc.enabled());
    assert_eq!(mcmc.params().len(), 3);
    let positional = mcmc.params().get(1).unwrap();
    assert!(positional.enabled());
    assert!(positional.matches("", Some(1)));
    assert_eq!(
        mcmc.param("Prior").unwrap().type_info().shape(),
        LanguageShape::Mixed
    );
}

#[test]
fn integer_values_and_bounds_load_from_json() {
    let language = CommandLanguage::from_json(
        r#"{"commands": [{"label": "Mcmc", "params": [{
            "label": "Burnin",
            "type_info": {
                "type": "constant_integer",
                "value": 100,
                "min": {"value": -5},
                "max": {"unresolved": "NGen"}
            }
        }]}]}"#,
    )
    .unwrap();
    let burnin = language.get("Mcmc").unwrap().param("Burnin").unwrap();
    assert_eq!(
        burnin.type_info(),
        &LanguageTypeInfo::ConstantInteger {
            value: Some(100),
            min: Some(Bound::Value(-5)),
            max: Some(Bound::Unresolved(String::from("NGen"))),
        }
    );
}

#[test]
fn loads_definitions_from_disk() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), DEFINITION).unwrap();
    let language = CommandLanguage::load(file.path()).unwrap();
    assert!(language.get("Quit").is_some());
}

#[test]
fn duplicate_labels_are_rejected() {
    let mut language = CommandLanguage::new();
    language.register(LanguageCommand::new("Quit")).unwrap();
    let error = language.register(LanguageCommand::new("Quit")).unwrap_err();
    assert!(matches!(error, LanguageError::DuplicateCommand { label } if label == "Quit"));
}

#[test]
fn disable_all_keeps_parameter_values() {
    let mut language = CommandLanguage::new();
    let mut command = LanguageCommand::new("Sample").with_param(CmdParam::labelled(
        "Seed",
        LanguageTypeInfo::ConstantInteger {
            value: Some(7),
            min: None,
            max: None,
        },
    ));
    command.set_enabled(true);
    language.register(command).unwrap();

    language.disable_all();

    let sample = language.get("Sample").unwrap();
    assert!(!sample.enabled());
    assert_eq!(
        sample.param("Seed").unwrap().type_info(),
        &LanguageTypeInfo::ConstantInteger {
            value: Some(7),
            min: None,
            max: None
        }
    );
    assert_eq!(language.enabled_labels().count(), 0);
}

#[rstest]
#[case::by_label("Seed", None, true)]
#[case::wrong_label("Other", None, false)]
#[case::placement_ignored_for_labelled("", Some(1), false)]
fn labelled_params_match_by_label(
    #[case] label: &str,
    #[case] placement: Option<u32>,
    #[case] expected: bool,
) {
    let mut param = CmdParam::labelled("Seed", LanguageTypeInfo::ConstantBool { value: true });
    param.set_enabled(false);
    assert_eq!(param.matches(label, placement), expected);
}

#[rstest]
#[case::same_placement(Some(2), true)]
#[case::other_placement(Some(3), false)]
#[case::no_placement(None, false)]
fn positional_params_match_by_placement(#[case] placement: Option<u32>, #[case] expected: bool) {
    let param = CmdParam::placed(2, LanguageTypeInfo::StringList { values: Vec::new() });
    assert_eq!(param.matches("", placement), expected);
}

#[test]
fn rejects_malformed_definitions() {
    assert!(matches!(
        CommandLanguage::from_json("{\"commands\": [{\"params\": []}]}"),
        Err(LanguageError::Parse(_))
    ));
}
