//! Consumer configuration file tests

use popqueue::config::{ConfigError, ConsumerConfig};
use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_load_full_configuration() {
    let file = write_config(
        r#"
group = "GID_orders"
endpoints = "10.0.0.1:8081;10.0.0.2:8081"
namespace = "prod"
polling_timeout_ms = 20000
invisible_duration_ms = 1500
max_cached_message_quantity = 512
max_cached_message_memory = 0

[credentials]
access_key = "ak"
access_secret = "sk"
"#,
    );

    let config = ConsumerConfig::load(file.path()).await.unwrap();

    assert_eq!(config.group, "GID_orders");
    assert_eq!(config.namespace, "prod");
    assert_eq!(config.polling_timeout, Duration::from_secs(20));
    assert_eq!(config.invisible_duration, Duration::from_millis(1500));
    assert_eq!(config.max_cached_message_quantity, 512);
    assert_eq!(config.max_cached_message_memory, 0);
    assert_eq!(config.receive_batch_size, 32);
    assert_eq!(config.credentials.unwrap().access_key, "ak");
}

#[tokio::test]
async fn test_unknown_key_is_rejected() {
    let file = write_config("group = \"GID_orders\"\nmax_cached_messages = 10\n");

    let result = ConsumerConfig::load(file.path()).await;

    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[tokio::test]
async fn test_invalid_group_is_rejected() {
    let file = write_config("group = \"orders group\"\n");

    let result = ConsumerConfig::load(file.path()).await;

    assert!(matches!(result, Err(ConfigError::Invalid { ref field, .. }) if field == "group"));
}

#[tokio::test]
async fn test_missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("consumer.toml");

    let result = ConsumerConfig::load(&path).await;

    match result {
        Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected an I/O error, got {:?}", other),
    }
}

#[cfg(target_os = "linux")]
fn with_config_home<T>(dir: &TempDir, body: impl FnOnce() -> T) -> T {
    let previous = std::env::var_os("XDG_CONFIG_HOME");
    std::env::set_var("XDG_CONFIG_HOME", dir.path());
    let result = body();
    match previous {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }
    result
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_load_default_reads_user_config_dir() {
    let home = TempDir::new().unwrap();
    let config_dir = home.path().join("popqueue");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("consumer.toml"),
        "group = \"GID_default\"\nreceive_batch_size = 8\n",
    )
    .unwrap();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let config = with_config_home(&home, || runtime.block_on(ConsumerConfig::load_default()))
        .unwrap()
        .unwrap();

    assert_eq!(config.group, "GID_default");
    assert_eq!(config.receive_batch_size, 8);
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_load_default_without_file_is_none() {
    let home = TempDir::new().unwrap();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let loaded = with_config_home(&home, || runtime.block_on(ConsumerConfig::load_default()));

    assert!(loaded.unwrap().is_none());
}
