use crate::config::GraphConfig;

#[test]
fn empty_config_gets_all_defaults() {
    let config = GraphConfig::from_yaml("{}").unwrap();
    assert!(!config.accept_partial_success);
    assert_eq!(config.heartbeat_interval_secs, 10);
    assert_eq!(config.vid_len, 8);
    assert!(config.num_path_thread >= 1);
}

#[test]
fn partial_config_overrides_only_named_fields() {
    let yaml = r#"
accept_partial_success: true
vid_len: 16
"#;
    let config = GraphConfig::from_yaml(yaml).unwrap();
    assert!(config.accept_partial_success);
    assert_eq!(config.vid_len, 16);
    assert_eq!(config.storage_rpc_timeout_ms, 60_000);
}

#[test]
fn heartbeat_interval_deserializes() {
    let yaml = r#"
heartbeat_interval_secs: 3
"#;
    let config = GraphConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.heartbeat_interval_secs, 3);
}
