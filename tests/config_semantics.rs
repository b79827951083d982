use plain_modules::prelude::*;
use serde_json::json;
use std::io::Write;

#[test]
fn defaults_use_data_plain_attributes() {
    let cfg = SystemConfig::default();
    assert_eq!(cfg.module_attribute, "data-plain-module");
    assert_eq!(cfg.args_attribute, "data-plain-args");
    assert_eq!(cfg.refs_attribute, "data-plain-refs");
    assert_eq!(cfg.falsy_values, FalsyValues::CoerceToNull);
    assert_eq!(cfg.reactivation, Reactivation::Always);
    assert!(cfg.validate().is_ok());
}

#[test]
fn partial_json_fills_in_defaults() {
    let cfg = SystemConfig::from_json(r#"{"falsy_values":"preserve","module_attribute":"data-mod"}"#).unwrap();
    assert_eq!(cfg.falsy_values, FalsyValues::Preserve);
    assert_eq!(cfg.module_attribute, "data-mod");
    assert_eq!(cfg.args_attribute, "data-plain-args");
}

#[test]
fn unknown_keys_and_bad_names_are_rejected() {
    let err = SystemConfig::from_json(r#"{"module_attr":"x"}"#).unwrap_err();
    assert_eq!(err.kind(), "invalid_config");

    let err = SystemConfig::from_json(r#"{"args_attribute":""}"#).unwrap_err();
    assert!(err.to_string().contains("args_attribute is empty"), "{err}");

    let err = SystemConfig::from_json(r#"{"refs_attribute":"data plain"}"#).unwrap_err();
    assert!(err.to_string().contains("not a valid attribute name"), "{err}");

    let err = SystemConfig::from_json(r#"{"refs_attribute":"DATA-PLAIN-ARGS"}"#).unwrap_err();
    assert!(err.to_string().contains("distinct"), "{err}");
}

#[test]
fn system_refuses_an_invalid_config() {
    let cfg = SystemConfig {
        module_attribute: String::new(),
        ..SystemConfig::default()
    };
    let err = System::with_config(Document::new(), ComponentRegistry::new(), cfg).err().unwrap();
    assert!(matches!(err, ActivationError::InvalidConfig(_)));
}

#[test]
fn load_reads_a_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", json!({"reactivation": "skip_activated"})).unwrap();

    let cfg = SystemConfig::load(file.path()).unwrap();
    assert_eq!(cfg.reactivation, Reactivation::SkipActivated);

    let missing = SystemConfig::load(file.path().with_extension("absent")).unwrap_err();
    assert!(format!("{missing:#}").contains("reading system config"));
}

#[test]
fn preserve_policy_flows_through_activation() {
    let doc = Document::new();
    let el = doc.create_child(
        doc.document_element(),
        "div",
        &[("data-plain-module", "w"), ("data-plain-args", r#"{"count":0,"label":""}"#)],
    );
    let mut reg = ComponentRegistry::new();
    reg.register::<ComponentBase>("w");
    let cfg = SystemConfig {
        falsy_values: FalsyValues::Preserve,
        ..SystemConfig::default()
    };

    let report = System::with_config(doc, reg, cfg).unwrap().init();

    let base = report.entry(el).and_then(|e| e.instance()).unwrap().base();
    assert_eq!(base.prop("count"), Some(&json!(0)));
    assert_eq!(base.prop("label"), Some(&json!("")));
}

#[test]
fn duplicate_registration_keeps_the_last_factory() {
    let doc = Document::new();
    doc.create_child(doc.document_element(), "div", &[("data-plain-module", "w")]);
    let mut reg = ComponentRegistry::new();
    reg.register_fn("w", |_| anyhow::bail!("first factory"));
    reg.register::<ComponentBase>("w");
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.names(), ["w"]);

    let report = System::new(doc, reg).init();
    assert!(report.is_clean());
}

#[test]
fn summary_serializes_for_error_reporting() {
    let doc = Document::new();
    doc.create_child(doc.document_element(), "aside", &[("data-plain-module", "nope"), ("id", "side")]);
    let report = System::new(doc, ComponentRegistry::new()).init();

    let value = serde_json::to_value(report.summary()).unwrap();
    assert_eq!(value["discovered"], json!(1));
    assert_eq!(value["activated"], json!(0));
    assert_eq!(value["failures"][0]["element"], json!("aside#side"));
    assert_eq!(value["failures"][0]["module"], json!("nope"));
    assert_eq!(value["failures"][0]["kind"], json!("unknown_module"));
}
