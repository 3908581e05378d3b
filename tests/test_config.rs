mod common;
use common::*;

use std::io::Write as _;
use wifibat_bridge::config::{DEFAULT_DEVICE_PORT, DEFAULT_QUERY_COMMAND};

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn minimal_config_uses_defaults() {
    common_setup();

    let file = write_config(
        r#"
devices:
  - host: 192.168.4.1
mqtt:
  host: localhost
"#,
    );
    let config = Config::new(file.path().to_string_lossy().to_string()).unwrap();

    assert_eq!(config.devices.len(), 1);
    assert_eq!(config.devices[0].port(), DEFAULT_DEVICE_PORT);
    assert!(config.devices[0].enabled());
    assert_eq!(config.mqtt.port(), 1883);
    assert_eq!(config.mqtt.client_id(), "wifibat-bridge");
    assert_eq!(config.mqtt.namespace(), None);
    assert_eq!(config.query.command(), DEFAULT_QUERY_COMMAND);
    assert_eq!(config.query.timeout(), Duration::from_millis(5000));
    assert_eq!(config.query.delimiter(), Some("}"));
    assert_eq!(config.poll_interval(), None);
    assert_eq!(config.loglevel, "info");

    let options = config.query.options();
    assert_eq!(options.timeout, Duration::from_millis(5000));
    assert_eq!(options.delimiter(), Some(&b"}"[..]));
}

#[test]
fn full_config() {
    common_setup();

    let config = Config::from_yaml(
        r#"
devices:
  - host: 192.168.4.1
    port: 12345
  - host: 192.168.4.2
    enabled: false
mqtt:
  host: broker.local
  port: 8883
  username: bat
  password: secret
  client_id: garage
  namespace: batteries
  retain: true
query:
  timeout_ms: 2500
  delimiter: null
poll_interval_secs: 30
loglevel: debug
"#,
    )
    .unwrap();

    assert_eq!(
        config.targets(),
        vec![DeviceTarget::new("192.168.4.1", 12345)]
    );
    assert_eq!(config.mqtt.username(), &Some("bat".to_string()));
    assert_eq!(config.mqtt.namespace(), Some("batteries"));
    assert!(config.mqtt.retain());
    assert_eq!(config.query.timeout(), Duration::from_millis(2500));
    assert_eq!(config.query.delimiter(), None);
    assert_eq!(config.query.options().delimiter(), None);
    assert_eq!(config.poll_interval(), Some(Duration::from_secs(30)));
}

#[test]
fn rejects_invalid_config() {
    common_setup();

    let no_enabled_devices = r#"
devices:
  - host: 192.168.4.1
    enabled: false
mqtt:
  host: localhost
"#;
    assert!(Config::from_yaml(no_enabled_devices).is_err());

    let empty_delimiter = r#"
devices:
  - host: 192.168.4.1
mqtt:
  host: localhost
query:
  delimiter: ""
"#;
    assert!(Config::from_yaml(empty_delimiter).is_err());

    let zero_timeout = r#"
devices:
  - host: 192.168.4.1
mqtt:
  host: localhost
query:
  timeout_ms: 0
"#;
    assert!(Config::from_yaml(zero_timeout).is_err());

    let empty_host = r#"
devices:
  - host: ""
mqtt:
  host: localhost
"#;
    assert!(Config::from_yaml(empty_host).is_err());

    let missing_mqtt = r#"
devices:
  - host: 192.168.4.1
"#;
    assert!(Config::from_yaml(missing_mqtt).is_err());
}

#[test]
fn missing_file() {
    common_setup();

    let err = Config::new("/nonexistent/wifibat.yaml".to_string()).unwrap_err();
    assert!(err.to_string().contains("error reading"));
}
