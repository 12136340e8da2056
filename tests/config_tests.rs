//! Integration tests for layered client configuration

use anyhow::Context;
use bulkpay::config::{ENV_BASE_URL, ENV_PAGE_SIZE, ENV_TIMEOUT_SECS};
use bulkpay::prelude::*;
use std::collections::HashMap;
use std::io::Write;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_no_layers_gives_defaults() {
    let config = ClientConfig::from_layers(vec![]).unwrap();
    assert_eq!(config, ClientConfig::default());
    assert_eq!(config.selection_policy, SelectionPolicy::ClearAll);
}

#[test]
fn test_later_layers_win_field_by_field() {
    let file = ConfigLayer::from_yaml_str(
        r#"
base_url: https://erp.example.com/api/v1
timeout_secs: 15
default_page_size: 50
selection_policy: keep_failed
"#,
    )
    .unwrap();
    let env = ConfigLayer::from_lookup(lookup(&[(ENV_PAGE_SIZE, "10")])).unwrap();

    let config = ClientConfig::from_layers(vec![file, env]).unwrap();

    assert_eq!(config.base_url, "https://erp.example.com/api/v1");
    assert_eq!(config.timeout_secs, Some(15));
    assert_eq!(config.default_page_size, 10);
    assert_eq!(config.selection_policy, SelectionPolicy::KeepFailed);
    assert!(config.refresh_after_bulk);
}

#[test]
fn test_env_layer_parses_numbers() {
    let layer = ConfigLayer::from_lookup(lookup(&[
        (ENV_BASE_URL, "http://localhost:9000/api"),
        (ENV_TIMEOUT_SECS, " 30 "),
    ]))
    .unwrap();

    assert_eq!(layer.base_url.as_deref(), Some("http://localhost:9000/api"));
    assert_eq!(layer.timeout_secs, Some(30));
    assert_eq!(layer.default_page_size, None);
}

#[test]
fn test_env_layer_rejects_garbage() {
    let err = ConfigLayer::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "soon")])).unwrap_err();
    assert!(matches!(
        err,
        PayError::Config(ConfigError::InvalidValue { ref field, .. }) if field == ENV_TIMEOUT_SECS
    ));
}

#[test]
fn test_page_size_out_of_range_is_rejected() {
    let layer = ConfigLayer {
        default_page_size: Some(500),
        ..ConfigLayer::default()
    };
    assert!(ClientConfig::from_layers(vec![layer]).is_err());
}

#[test]
fn test_zero_timeout_is_rejected() {
    assert!(ClientConfig::from_yaml_str("timeout_secs: 0").is_err());
}

#[test]
fn test_from_yaml_file() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "base_url: https://ledger.test/api")?;
    writeln!(file, "refresh_after_bulk: false")?;
    let path = file.path().to_str().context("temp path is not UTF-8")?;

    let config = ClientConfig::from_yaml_file(path)?;
    assert_eq!(config.api_root(), "https://ledger.test/api");
    assert!(!config.refresh_after_bulk);
    Ok(())
}

#[test]
fn test_yaml_file_parse_error_names_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "default_page_size: [not, a, number]").unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let err = ConfigLayer::from_yaml_file(&path).unwrap_err();
    assert!(err.to_string().contains(&path));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = ClientConfig::from_yaml_file("/definitely/not/here.yaml").unwrap_err();
    assert!(matches!(err, PayError::Config(ConfigError::IoError { .. })));
}
