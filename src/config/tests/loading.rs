//! Tests for loading configuration from the environment, CLI, and files.

use std::ffi::OsString;
use std::fs;

use ortho_config::OrthoConfig;
use rstest::rstest;
use tempfile::TempDir;

use crate::PrdashConfig;

/// Loads configuration with an isolated home directory.
///
/// `file_contents`, when present, is written to `<home>/.prdash.toml`.
fn load_isolated(
    env: &[(&str, Option<&str>)],
    cli_args: &[&str],
    file_contents: Option<&str>,
) -> PrdashConfig {
    let temp_dir = TempDir::new().expect("temp dir should be created");
    let home = temp_dir.path().to_string_lossy().to_string();
    if let Some(contents) = file_contents {
        fs::write(temp_dir.path().join(".prdash.toml"), contents)
            .expect("config file should be written");
    }

    let mut vars: Vec<(&str, Option<&str>)> = [
        "PRDASH_ORGANIZATIONS",
        "PRDASH_CACHE_TTL_SECONDS",
        "PRDASH_POLL_INTERVAL_SECONDS",
    ]
    .into_iter()
    .filter(|name| env.iter().all(|(key, _)| key != name))
    .map(|name| (name, None))
    .collect();
    vars.push(("HOME", Some(home.as_str())));
    vars.push(("XDG_CONFIG_HOME", Some(home.as_str())));
    vars.extend_from_slice(env);
    let _guard = env_lock::lock_env(vars);

    let mut args: Vec<OsString> = vec![OsString::from("prdash")];
    args.extend(cli_args.iter().map(OsString::from));

    PrdashConfig::load_from_iter(args).expect("config should load")
}

#[rstest]
fn organizations_load_from_environment_variable() {
    let config = load_isolated(&[("PRDASH_ORGANIZATIONS", Some("acme,globex"))], &[], None);

    assert_eq!(
        config.organization_scope().logins(),
        ["acme", "globex"],
        "expected PRDASH_ORGANIZATIONS to set the organization scope"
    );
}

#[rstest]
#[case::environment(Some("90"), &[], 90)]
#[case::cli(None, &["--cache-ttl-seconds", "15"], 15)]
#[case::cli_overrides_environment(Some("90"), &["--cache-ttl-seconds", "15"], 15)]
fn cache_ttl_seconds_loading(
    #[case] env_ttl: Option<&str>,
    #[case] cli_args: &[&str],
    #[case] expected: u64,
) {
    let config = load_isolated(&[("PRDASH_CACHE_TTL_SECONDS", env_ttl)], cli_args, None);
    assert_eq!(config.cache_ttl_seconds, expected);
}

#[rstest]
fn short_flags_set_scope_and_watch_mode() {
    let config = load_isolated(&[], &["-o", "acme", "-r", "acme/api", "-w"], None);

    assert_eq!(config.organizations.as_deref(), Some("acme"));
    assert_eq!(config.repositories.as_deref(), Some("acme/api"));
    assert!(config.watch, "-w should enable watch mode");
}

#[rstest]
fn dotfile_in_home_directory_is_discovered() {
    let config = load_isolated(
        &[],
        &[],
        Some("organizations = \"initech\"\npoll_interval_seconds = 45\nreviewing = true\n"),
    );

    assert_eq!(config.organizations.as_deref(), Some("initech"));
    assert_eq!(config.poll_interval_seconds, 45);
    assert!(config.reviewing, "booleans load from the configuration file");
}

#[rstest]
fn cli_overrides_discovered_file() {
    let config = load_isolated(
        &[],
        &["--poll-interval-seconds", "10"],
        Some("poll_interval_seconds = 45\n"),
    );

    assert_eq!(config.poll_interval_seconds, 10);
}
