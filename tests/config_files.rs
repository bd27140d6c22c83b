use std::fs;

use mdbi_rs::config::{ChartConfig, ChartKind, DEFAULT_ENTITIES, SliderCommit, preset};
use mdbi_rs::{ConfigError, Since};

#[test]
fn json_config_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chart.json");
    fs::write(
        &path,
        r#"{
            "metrics": [
                {"id": "__all__", "title": "Show all"},
                {"id": "wabr", "title": "WABR", "value_axis_digits": 0},
                {"id": "wasr", "title": "WASR", "treat_zero_as_missing": false}
            ],
            "default_metric": "wabr",
            "endpoint_path": "/wabr-wasr/",
            "start_date": "2012-01-01",
            "slider_commit": "extend_to_edge",
            "kind": "latest_bar"
        }"#,
    )
    .unwrap();

    let cfg = ChartConfig::from_json_file(&path).unwrap();
    assert_eq!(cfg.default_entities, DEFAULT_ENTITIES.to_vec());
    assert_eq!(cfg.grid_metric_ids(), vec!["wabr", "wasr"]);
    assert!(cfg.has_show_all());
    assert!(cfg.metric("wabr").unwrap().treat_zero_as_missing);
    assert!(!cfg.metric("wasr").unwrap().treat_zero_as_missing);
    assert_eq!(cfg.metric("wasr").unwrap().picker_label(), "WASR");
    assert_eq!(cfg.slider_commit, SliderCommit::ExtendToEdge);
    assert_eq!(cfg.kind, ChartKind::LatestBar);
    assert_eq!(
        cfg.since(),
        Since::StartDate(chrono::NaiveDate::from_ymd_opt(2012, 1, 1).unwrap())
    );
}

#[test]
fn invalid_configs_are_reported() {
    let dir = tempfile::tempdir().unwrap();

    let bad_default = dir.path().join("default.json");
    fs::write(
        &bad_default,
        r#"{"metrics": [{"id": "a", "title": "A"}], "default_metric": "b"}"#,
    )
    .unwrap();
    assert!(matches!(
        ChartConfig::from_json_file(&bad_default),
        Err(ConfigError::Invalid(_))
    ));

    let zero_divisor = dir.path().join("divisor.json");
    fs::write(
        &zero_divisor,
        r#"{"metrics": [{"id": "a", "title": "A", "value_divisor": 0}], "default_metric": "a"}"#,
    )
    .unwrap();
    let err = ChartConfig::from_json_file(&zero_divisor).unwrap_err();
    assert!(err.to_string().contains("value_divisor"));

    let not_json = dir.path().join("broken.json");
    fs::write(&not_json, "{").unwrap();
    assert!(matches!(
        ChartConfig::from_json_file(&not_json),
        Err(ConfigError::Json { .. })
    ));

    assert!(matches!(
        ChartConfig::from_json_file(dir.path().join("missing.json")),
        Err(ConfigError::Io { .. })
    ));
}

#[test]
fn presets_round_trip_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = preset("balance").unwrap();
    let path = dir.path().join("balance.json");
    fs::write(&path, serde_json::to_string_pretty(&cfg).unwrap()).unwrap();
    assert_eq!(ChartConfig::from_json_file(&path).unwrap(), cfg);
    assert!(matches!(preset("nope"), Err(ConfigError::UnknownPreset(_))));
}
