//! Tests for configuration consistency validation.

use rstest::rstest;

use crate::PrdashConfig;
use crate::github::FetchError;

#[rstest]
fn default_configuration_is_valid() {
    assert!(PrdashConfig::default().validate().is_ok());
}

#[rstest]
fn zero_poll_interval_is_accepted_without_watch_mode() {
    let config = PrdashConfig {
        poll_interval_seconds: 0,
        ..Default::default()
    };

    assert!(config.validate().is_ok(), "poll interval only matters when watching");
}

#[rstest]
#[case::zero_timeout(PrdashConfig { request_timeout_seconds: 0, ..Default::default() })]
#[case::zero_poll_interval_when_watching(PrdashConfig {
    watch: true,
    poll_interval_seconds: 0,
    ..Default::default()
})]
#[case::non_http_api_base(PrdashConfig { api_base: "file:///tmp".to_owned(), ..Default::default() })]
fn rejects_inconsistent_settings(#[case] config: PrdashConfig) {
    let result = config.validate();

    assert!(
        matches!(result, Err(FetchError::Configuration { .. })),
        "expected a configuration error, got {result:?}"
    );
}

#[rstest]
fn rejects_malformed_repository_scope() {
    let config = PrdashConfig {
        repositories: Some("not-a-slug".to_owned()),
        ..Default::default()
    };

    assert!(matches!(
        config.validate(),
        Err(FetchError::InvalidRepository { .. })
    ));
}
