//! Configuration precedence tests: defaults, file, environment, CLI flags.

use clap::Parser;
use ragchat::config::{AppConfig, Cli};
use serial_test::serial;
use std::env;

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("RAGCHAT_CONFIG_FILE");
        env::remove_var("RAGCHAT_BASE_URL");
        env::remove_var("RAGCHAT_TIMEOUT_SECS");
        env::remove_var("RAGCHAT_API__BASE_URL");
        env::remove_var("RAGCHAT_API__TIMEOUT_SECS");
        env::remove_var("RAGCHAT_CHAT__TOP_K");
        env::remove_var("RAGCHAT_CHAT__MAX_TOKENS");
        env::remove_var("RAGCHAT_CHAT__STREAMING");
    }
}

fn bare_cli() -> Cli {
    Cli::try_parse_from(["ragchat"]).expect("bare CLI parses")
}

#[test]
#[serial]
fn default_config() {
    clear_env_vars();

    let config = AppConfig::load(&bare_cli()).expect("defaults load");
    assert_eq!(config.api.base_url, "http://localhost:8000/api");
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.chat.top_k, 5);
    assert_eq!(config.chat.memory_limit, 5);
    assert_eq!(config.chat.max_tokens, 1000);
    assert_eq!(config.chat.history_limit, 50);
    assert!(config.chat.streaming);
}

#[test]
#[serial]
fn env_overrides_defaults() {
    clear_env_vars();
    unsafe {
        env::set_var("RAGCHAT_API__BASE_URL", "http://env-host:9000/api");
        env::set_var("RAGCHAT_CHAT__TOP_K", "9");
    }

    let config = AppConfig::load(&bare_cli()).expect("config loads");
    assert_eq!(config.api.base_url, "http://env-host:9000/api");
    assert_eq!(config.chat.top_k, 9);

    clear_env_vars();
}

#[test]
#[serial]
fn file_overrides_defaults() {
    clear_env_vars();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ragchat.yaml");
    std::fs::write(
        &path,
        "api:\n  timeout_secs: 7\nchat:\n  max_tokens: 256\n",
    )
    .unwrap();

    let cli = Cli::try_parse_from(["ragchat", "--config", path.to_str().unwrap()])
        .expect("CLI parses");
    let config = AppConfig::load(&cli).expect("config loads from file");
    assert_eq!(config.api.timeout_secs, 7);
    assert_eq!(config.chat.max_tokens, 256);
    // Untouched keys keep their defaults.
    assert_eq!(config.chat.top_k, 5);
}

#[test]
#[serial]
fn cli_flag_beats_environment() {
    clear_env_vars();
    unsafe {
        env::set_var("RAGCHAT_API__BASE_URL", "http://env-host:9000/api");
    }

    let cli = Cli::try_parse_from(["ragchat", "--base-url", "http://flag-host:7000/api"])
        .expect("CLI parses");
    let config = AppConfig::load(&cli).expect("config loads");
    assert_eq!(config.api.base_url, "http://flag-host:7000/api");

    clear_env_vars();
}

#[test]
#[serial]
fn no_stream_flag_disables_streaming() {
    clear_env_vars();

    let cli = Cli::try_parse_from(["ragchat", "--no-stream"]).expect("CLI parses");
    let config = AppConfig::load(&cli).expect("config loads");
    assert!(!config.chat.streaming);
}

#[test]
#[serial]
fn derived_settings_map_through() {
    clear_env_vars();

    let config = AppConfig::load(&bare_cli()).expect("defaults load");
    let api = config.api_config();
    assert_eq!(api.base_url, "http://localhost:8000/api");
    assert_eq!(api.timeout.as_secs(), 30);

    let tuning = config.tuning();
    assert_eq!(tuning.top_k, 5);
    assert_eq!(tuning.max_tokens, 1000);
    assert!((tuning.temperature - 0.7).abs() < f32::EPSILON);
}
