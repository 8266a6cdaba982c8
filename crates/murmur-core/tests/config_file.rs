//! Loading configuration from disk

use murmur_core::{MurmurConfig, MurmurError};
use std::io::Write;
use std::time::Duration;

#[test]
fn load_from_file_reads_all_sections() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[endpoint]
bind_ip = "127.0.0.1"
port = 9100
abort_on_send_error = true

[scheduler]
max_tasks_per_tick = 32
"#
    )
    .unwrap();

    let config = MurmurConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.endpoint.bind_ip.to_string(), "127.0.0.1");
    assert_eq!(config.endpoint.port, 9100);
    assert!(config.endpoint.abort_on_send_error);
    assert_eq!(config.scheduler.max_tasks_per_tick, 32);
    assert_eq!(config.scheduler.slow_task_warning, Duration::from_secs(1));
}

#[test]
fn missing_file_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let err = MurmurConfig::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert_matches::assert_matches!(err, MurmurError::Invalid { .. });
}

#[test]
fn zero_timeouts_are_rejected() {
    let err = MurmurConfig::from_toml_str(
        r#"
[suspension]
missing_member_timeout_ms = 0
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("suspension.missing_member_timeout_ms"));
}
