use std::collections::HashMap;

use serde_json::json;
use tracker_infra::function_env::{DISCORD_WEBHOOK_URL, KOOK_TOKEN, STRATZ_JWT};
use tracker_infra::provision::cloudformation::{preflight, PlaceholderPolicy};
use tracker_infra::stack::{AttributeType, CodeLocation, EnvValue, TABLE_ID};
use tracker_infra::{template, Error, StackConfig, StackDefinition};

const VERSION_A: &str = include_str!("../config/version-a.json");
const VERSION_B: &str = include_str!("../config/version-b.json");

fn versions() -> Vec<(&'static str, StackConfig)> {
    vec![
        ("a", StackConfig::from_json(VERSION_A).unwrap()),
        ("b", StackConfig::from_json(VERSION_B).unwrap()),
    ]
}

fn substituted(mut config: StackConfig) -> StackConfig {
    let values: HashMap<&str, &str> = HashMap::from([
        (STRATZ_JWT, "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiIxIn0.c2ln"),
        (DISCORD_WEBHOOK_URL, "https://discord.com/api/webhooks/1031/AbCd"),
        (KOOK_TOKEN, "1/MTA4MzE=/q8Zr"),
    ]);
    config
        .apply_overrides(|key| values.get(key).map(|value| value.to_string()))
        .unwrap();
    config
}

#[test]
fn partition_key_is_numeric_id_in_every_version() {
    for (name, config) in versions() {
        let stack = StackDefinition::from_config(&config).unwrap();
        assert_eq!(stack.table.partition_key.name, "id", "version {name}");
        assert_eq!(stack.table.partition_key.attribute_type, AttributeType::Number);
    }
}

#[test]
fn schedule_intervals_are_whole_positive_minutes() {
    let expected = [("a", 5, "rate(5 minutes)"), ("b", 2, "rate(2 minutes)")];
    for ((name, config), (_, minutes, expression)) in versions().into_iter().zip(expected) {
        let stack = StackDefinition::from_config(&config).unwrap();
        assert_eq!(stack.rule.interval_minutes, minutes, "version {name}");
        assert_eq!(stack.rule.expression(), expression);
    }
}

#[test]
fn timeout_never_exceeds_thirty_seconds() {
    for (_, config) in versions() {
        let stack = StackDefinition::from_config(&config).unwrap();
        assert!(stack.function.timeout_seconds <= 30);
    }
}

#[test]
fn capacities_are_positive_and_match_each_version() {
    let expected = [(5, 10), (2, 2)];
    for ((_, config), (read, write)) in versions().into_iter().zip(expected) {
        let stack = StackDefinition::from_config(&config).unwrap();
        assert_eq!((stack.table.read_capacity, stack.table.write_capacity), (read, write));
        assert!(read > 0 && write > 0);
    }
}

#[test]
fn environment_has_no_empty_keys() {
    for (_, config) in versions() {
        let stack = StackDefinition::from_config(&config).unwrap();
        assert!(stack.function.environment.keys().all(|key| !key.is_empty()));
    }
}

#[test]
fn version_b_adds_the_messaging_token() {
    let config = StackConfig::from_json(VERSION_B).unwrap();
    let stack = StackDefinition::from_config(&config).unwrap();
    assert!(matches!(
        stack.function.environment.get(KOOK_TOKEN),
        Some(EnvValue::Parameter(_))
    ));
}

#[test]
fn unsubstituted_version_b_is_blocked_from_deployment() {
    let config = StackConfig::from_json(VERSION_B).unwrap();

    assert_eq!(
        config.unsubstituted_placeholders(),
        vec!["jwtToken", "webhookUrl", "messagingToken"]
    );
    match preflight(&config, PlaceholderPolicy::Block) {
        Err(Error::UnsubstitutedPlaceholders(names)) => assert_eq!(names.len(), 3),
        other => panic!("expected deployment to be blocked, got {other:?}"),
    }

    // Synthesis still works so the template can be reviewed.
    let stack = StackDefinition::from_config(&config).unwrap();
    assert!(template::to_json_string(&stack).is_ok());
}

#[test]
fn substituted_version_b_passes_preflight_and_binds_parameters() {
    let config = substituted(StackConfig::from_json(VERSION_B).unwrap());
    preflight(&config, PlaceholderPolicy::Block).unwrap();

    let stack = StackDefinition::from_config(&config).unwrap();
    let code = CodeLocation {
        bucket: "tracker-artifacts".into(),
        key: "assets/0123.zip".into(),
    };
    let parameters = stack.bind_parameters(&config, &code).unwrap();

    assert_eq!(parameters["KookToken"], "1/MTA4MzE=/q8Zr");
    assert_eq!(parameters["AssetBucket"], "tracker-artifacts");
}

#[test]
fn rendered_table_matches_version_a() {
    let config = StackConfig::from_json(VERSION_A).unwrap();
    let rendered = template::render(&StackDefinition::from_config(&config).unwrap());
    let table = &rendered["Resources"][TABLE_ID]["Properties"];

    assert_eq!(table["TableName"], "Guilds");
    assert_eq!(
        table["ProvisionedThroughput"],
        json!({ "ReadCapacityUnits": 5, "WriteCapacityUnits": 10 })
    );
    assert_eq!(
        table["AttributeDefinitions"],
        json!([{ "AttributeName": "id", "AttributeType": "N" }])
    );
}
