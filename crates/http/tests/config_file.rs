//! Client configuration file tests.

use std::io::Write;

use icinga2_http::{read_client_config, ConfigError, HttpTransport};

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn config_file_builds_transport() {
    let file = write_config(
        r#"
[api]
url = "monitoring.internal"
username = "director"
password = "secret"
verify_tls = false
timeout_secs = 10
"#,
    );
    let config = read_client_config(file.path()).unwrap();
    assert_eq!(config.username.as_deref(), Some("director"));

    let transport = HttpTransport::new(&config).unwrap();
    assert_eq!(transport.base_url(), "https://monitoring.internal:5665/v1/");
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    match read_client_config(&path) {
        Err(ConfigError::Read { path: p, .. }) => assert!(p.ends_with("absent.toml")),
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn invalid_toml_is_parse_error() {
    let file = write_config("[api\nurl = 1");
    assert!(matches!(
        read_client_config(file.path()),
        Err(ConfigError::Parse { .. })
    ));
}
