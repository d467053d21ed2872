//! End-to-end tests over the plan fixtures
//!
//! Each test loads a plan from `test-fixtures/plans`, resolves settings the
//! way the CLI does and checks what the dictionary selects.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use rstest::rstest;
use scanner_extensions::{
    AnalysisSettings, Capability, Error, Extension, ExtensionPlan, PLAN_FILENAME,
};
use scanner_test_utils::fixtures::names;
use scanner_test_utils::workspace::TestWorkspace;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../test-fixtures/plans")
        .join(name)
}

fn load(name: &str) -> scanner_extensions::BuiltPlan {
    ExtensionPlan::from_path(&fixture(name))
        .unwrap()
        .build()
        .unwrap()
}

#[rstest]
#[case::module("module", vec!["scm", "java-metrics", "blame", "cobol", "cpd", "coverage"])]
#[case::project("project", vec!["scm", "cpd", "coverage"])]
#[case::global("global", vec!["scm", "cpd"])]
fn test_sensor_order_per_container(#[case] container: &str, #[case] expected: Vec<&str>) {
    let plan = load("multi-module.toml");
    let dict = plan.dictionary(container, &AnalysisSettings::new()).unwrap();
    let unit = plan.unit();

    let order = dict
        .select(Capability::Sensor, Some(&unit), true, None)
        .unwrap();
    assert_eq!(names(&order), expected);
}

#[test]
fn test_optimizer_passes() {
    let plan = load("multi-module.toml");
    let dict = plan.dictionary("module", &AnalysisSettings::new()).unwrap();
    let unit = plan.unit();

    assert_eq!(
        names(&dict.select_sensors(&unit, false).unwrap()),
        vec!["scm", "java-metrics", "blame", "coverage"]
    );
    assert_eq!(names(&dict.select_sensors(&unit, true).unwrap()), vec!["cpd"]);
    assert_eq!(
        names(&dict.select_post_jobs().unwrap()),
        vec!["publish-report", "quality-gate"]
    );
}

#[test]
fn test_settings_layers_reach_the_optimizer() {
    let ws = TestWorkspace::new();
    ws.write_global_settings("sonar.slack.webhook = \"https://global.example.test\"\n");

    let plan = load("multi-module.toml");
    let settings = ws.resolver().resolve().unwrap();
    let dict = plan.dictionary("module", &settings).unwrap();

    assert_eq!(
        names(&dict.select_post_jobs().unwrap()),
        vec!["publish-report", "slack-notify", "quality-gate"]
    );
}

#[test]
fn test_cycle_plan_fails_only_where_the_cycle_is_visible() {
    let plan = load("cycle.toml");
    let dict = plan.dictionary("root", &AnalysisSettings::new()).unwrap();

    match dict.select_without_filter(Capability::Sensor) {
        Err(Error::DependencyCycle { participants }) => {
            assert_eq!(participants, vec!["indexer", "parser"]);
        }
        other => panic!("expected a cycle, got {:?}", other.map(|v| names(&v))),
    }

    let bystander_only = |ext: &dyn Extension| ext.name() == "bystander";
    let selected = dict
        .select(Capability::Sensor, None, false, Some(&bystander_only))
        .unwrap();
    assert_eq!(names(&selected), vec!["bystander"]);
}

#[test]
fn test_unknown_reference_is_invalid_plan() {
    let err = ExtensionPlan::from_path(&fixture("unknown-reference.toml"))
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPlan { .. }));
    assert!(err.is_configuration_error());
}

#[test]
fn test_missing_plan_file() {
    let ws = TestWorkspace::new();
    let err = ExtensionPlan::from_path(&ws.root().join(PLAN_FILENAME)).unwrap_err();
    assert!(matches!(err, Error::PlanNotFound(_)));
}

#[test]
fn test_plan_survives_serialization() {
    let original = ExtensionPlan::from_path(&fixture("multi-module.toml")).unwrap();
    let ws = TestWorkspace::new();
    let path = ws.write_plan(&original.to_toml().unwrap());

    let reloaded = ExtensionPlan::from_path(&path).unwrap().build().unwrap();
    let dict = reloaded
        .dictionary("module", &AnalysisSettings::new())
        .unwrap();
    let order = dict
        .select(Capability::Sensor, Some(&reloaded.unit()), true, None)
        .unwrap();
    assert_eq!(
        names(&order),
        vec!["scm", "java-metrics", "blame", "cobol", "cpd", "coverage"]
    );
}

#[test]
fn test_concurrent_queries_agree() {
    let plan = load("multi-module.toml");
    let dict = Arc::new(plan.dictionary("module", &AnalysisSettings::new()).unwrap());
    let expected = names(&dict.select_without_filter(Capability::Extension).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let dict = Arc::clone(&dict);
            thread::spawn(move || names(&dict.select_without_filter(Capability::Extension).unwrap()))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
