//! Live API tests against `$MDBI_API_URL`. Run with: `cargo test --features online -- --nocapture`
#![cfg(feature = "online")]

use mdbi_rs::api::{DEFAULT_VALUES_PATH, Since};
use mdbi_rs::Client;

#[test]
fn fetch_values_for_two_metrics() {
    let cli = Client::default();
    let rows = cli
        .fetch_values(
            DEFAULT_VALUES_PATH,
            &["moodys_01".into(), "moodys_02".into()],
            Since::YearFrom(2015),
        )
        .unwrap();
    assert!(!rows.is_empty());
    assert!(rows.iter().all(|r| r.year().is_some_and(|y| y >= 2015)));
}

#[test]
fn listings_decode() {
    let cli = Client::default();
    let entities = cli.fetch_entities().unwrap();
    assert!(!entities.is_empty());
    assert!(entities.iter().all(|e| !e.label().is_empty()));
    let metrics = cli.fetch_metric_metadata().unwrap();
    assert!(metrics.iter().any(|m| m.source_info().is_some()));
}
