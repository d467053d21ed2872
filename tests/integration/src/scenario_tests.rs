//! Ordering scenarios written as inline plans

use pretty_assertions::assert_eq;
use scanner_extensions::{AnalysisSettings, AnalysisUnit, Capability, ExtensionPlan};
use scanner_test_utils::fixtures::names;

const SENSOR_TYPES: &str = r#"
[[types]]
name = "Sensor"
roles = ["sensor"]

[[types]]
name = "PreSensor"
extends = ["Sensor"]
phase = "pre"

[[types]]
name = "PostSensor"
extends = ["Sensor"]
phase = "post"
"#;

fn order_of(extensions: &str) -> Vec<String> {
    let plan = ExtensionPlan::from_toml(&format!("{SENSOR_TYPES}\n{extensions}"))
        .unwrap()
        .build()
        .unwrap();
    let dict = plan.dictionary("root", &AnalysisSettings::new()).unwrap();
    names(&dict.select_without_filter(Capability::Sensor).unwrap())
}

#[test]
fn test_phases_win_over_registration_order() {
    let order = order_of(
        r#"
[[extensions]]
name = "mid"
type = "Sensor"

[[extensions]]
name = "post"
type = "PostSensor"

[[extensions]]
name = "pre"
type = "PreSensor"
"#,
    );
    assert_eq!(order, vec!["pre", "mid", "post"]);
}

#[test]
fn test_value_dependency_in_both_registration_orders() {
    let consumer_first = order_of(
        r#"
[[extensions]]
name = "b"
type = "Sensor"
depends_upon = ["k"]

[[extensions]]
name = "a"
type = "Sensor"
depended_upon = ["k"]
"#,
    );
    let provider_first = order_of(
        r#"
[[extensions]]
name = "a"
type = "Sensor"
depended_upon = ["k"]

[[extensions]]
name = "b"
type = "Sensor"
depends_upon = ["k"]
"#,
    );
    assert_eq!(consumer_first, vec!["a", "b"]);
    assert_eq!(provider_first, vec!["a", "b"]);
}

#[test]
fn test_reference_chain() {
    let order = order_of(
        r#"
[[extensions]]
name = "c"
type = "Sensor"
depends_upon = ["@b"]

[[extensions]]
name = "b"
type = "Sensor"
depends_upon = ["@a"]

[[extensions]]
name = "a"
type = "Sensor"
"#,
    );
    assert_eq!(order, vec!["a", "b", "c"]);
}

#[test]
fn test_type_level_declarations_are_inherited() {
    let plan = ExtensionPlan::from_toml(
        r#"
[[types]]
name = "Sensor"
roles = ["sensor"]

[[types]]
name = "SymbolProvider"
extends = ["Sensor"]
depended_upon = ["symbols"]

[[types]]
name = "JavaSymbols"
extends = ["SymbolProvider"]

[[types]]
name = "SymbolConsumer"
extends = ["Sensor"]
depends_upon = ["symbols"]

[[extensions]]
name = "highlighter"
type = "SymbolConsumer"

[[extensions]]
name = "java-symbols"
type = "JavaSymbols"
"#,
    )
    .unwrap()
    .build()
    .unwrap();

    let dict = plan.dictionary("root", &AnalysisSettings::new()).unwrap();
    let order = dict.select_without_filter(Capability::Sensor).unwrap();
    assert_eq!(names(&order), vec!["java-symbols", "highlighter"]);
}

#[test]
fn test_eligibility_only_checked_with_a_unit() {
    let plan = ExtensionPlan::from_toml(&format!(
        "{SENSOR_TYPES}\n{}",
        r#"
[[extensions]]
name = "web-only"
type = "Sensor"
execute_on = ["web"]
"#
    ))
    .unwrap()
    .build()
    .unwrap();
    let dict = plan.dictionary("root", &AnalysisSettings::new()).unwrap();

    let core = AnalysisUnit::new("core");
    assert!(
        dict.select(Capability::Sensor, Some(&core), true, None)
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        names(&dict.select(Capability::Sensor, None, true, None).unwrap()),
        vec!["web-only"]
    );
    assert_eq!(
        names(&dict.select(Capability::Sensor, Some(&core), false, None).unwrap()),
        vec!["web-only"]
    );
}

#[test]
fn test_multiple_build_breakers_follow_every_post_job() {
    let plan = ExtensionPlan::from_toml(
        r#"
[[types]]
name = "PostJob"
roles = ["post-job"]

[[types]]
name = "BuildBreaker"
roles = ["build-breaker"]

[[extensions]]
name = "gate"
type = "BuildBreaker"

[[extensions]]
name = "publish"
type = "PostJob"

[[extensions]]
name = "budget"
type = "BuildBreaker"

[[extensions]]
name = "notify"
type = "PostJob"
"#,
    )
    .unwrap()
    .build()
    .unwrap();
    let dict = plan.dictionary("root", &AnalysisSettings::new()).unwrap();

    let order = dict.select_without_filter(Capability::PostJob).unwrap();
    assert_eq!(names(&order), vec!["publish", "notify", "gate", "budget"]);
}

#[test]
fn test_depended_upon_reference_runs_before_its_target() {
    let order = order_of(
        r#"
[[extensions]]
name = "consumer"
type = "Sensor"

[[extensions]]
name = "provider"
type = "Sensor"
depended_upon = ["@consumer"]
"#,
    );
    assert_eq!(order, vec!["provider", "consumer"]);
}

#[test]
fn test_build_breaker_follows_post_phase_jobs() {
    let plan = ExtensionPlan::from_toml(
        r#"
[[types]]
name = "PostJob"
roles = ["post-job"]

[[types]]
name = "LatePostJob"
extends = ["PostJob"]
phase = "post"

[[types]]
name = "BuildBreaker"
roles = ["build-breaker"]

[[extensions]]
name = "gate"
type = "BuildBreaker"

[[extensions]]
name = "archive"
type = "LatePostJob"

[[extensions]]
name = "publish"
type = "PostJob"
"#,
    )
    .unwrap()
    .build()
    .unwrap();
    let dict = plan.dictionary("root", &AnalysisSettings::new()).unwrap();

    let order = dict.select_post_jobs().unwrap();
    assert_eq!(names(&order), vec!["publish", "archive", "gate"]);
}
