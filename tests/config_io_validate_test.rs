use vesta::config::{Config, MIN_POLL_INTERVAL_MS};

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.modbus.host = "10.0.0.5".to_string();
    cfg.device_instance = 42;
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.modbus.host, "10.0.0.5");
    assert_eq!(loaded.modbus.unit_id, 255);
    assert_eq!(loaded.device_instance, 42);
    assert_eq!(loaded.logging.file, cfg.logging.file);
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();

    // Empty host
    cfg.modbus.host.clear();
    assert!(cfg.validate().is_err());

    // Invalid port
    cfg = Config::default();
    cfg.modbus.port = 0;
    assert!(cfg.validate().is_err());

    // Poll interval zero
    cfg = Config::default();
    cfg.poll_interval_ms = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(tmp.path(), "modbus: [not, a, mapping").unwrap();
    assert!(Config::from_file(tmp.path()).is_err());
}

#[test]
fn partial_yaml_fills_defaults() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(tmp.path(), "modbus:\n  host: 172.16.0.9\n").unwrap();

    let cfg = Config::from_file(tmp.path()).unwrap();
    assert_eq!(cfg.modbus.host, "172.16.0.9");
    assert_eq!(cfg.modbus.port, 502);
    assert_eq!(cfg.poll_interval_ms, 1000);
}

#[test]
fn poll_interval_floor_is_enforced() {
    let mut cfg = Config::default();
    cfg.poll_interval_ms = 50;
    assert_eq!(cfg.effective_poll_interval_ms(), MIN_POLL_INTERVAL_MS);
}
