use hubsync_core::config::SyncConfig;
use hubsync_core::error::SyncError;
use hubsync_core::retry::RetryPolicy;
use std::collections::HashMap;
use std::time::Duration;

fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

const CREDENTIALS: [(&str, &str); 2] = [("HUBSPOT_CID", "cid"), ("HUBSPOT_CS", "secret")];

#[test]
fn defaults() {
    let config = SyncConfig::default();
    assert_eq!(config.api_base_url, "https://api.hubapi.com");
    assert_eq!(config.entities, vec!["contacts", "companies", "meetings"]);
    assert_eq!(config.page_size, 100);
    assert_eq!(config.offset_ceiling, 9900);
    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.backoff_base_ms, 5000);
}

#[test]
fn minimal_env_uses_defaults() {
    let config = SyncConfig::from_vars(vars(&CREDENTIALS)).unwrap();
    assert_eq!(config.client_id, "cid");
    assert_eq!(config.client_secret, "secret");
    assert_eq!(config.entities, SyncConfig::default().entities);
    assert_eq!(config.retry_policy(), RetryPolicy::default());
}

#[test]
fn missing_client_id_is_config_error() {
    let err = SyncConfig::from_vars(vars(&[("HUBSPOT_CS", "secret")])).unwrap_err();
    match err {
        SyncError::Config(msg) => assert!(msg.contains("HUBSPOT_CID")),
        other => panic!("expected Config, got {other:?}"),
    }
}

#[test]
fn empty_client_secret_is_config_error() {
    let err = SyncConfig::from_vars(vars(&[("HUBSPOT_CID", "cid"), ("HUBSPOT_CS", "")]))
        .unwrap_err();
    assert!(matches!(err, SyncError::Config(ref m) if m.contains("HUBSPOT_CS")));
}

#[test]
fn overrides_are_applied() {
    let mut pairs = CREDENTIALS.to_vec();
    pairs.extend([
        ("HUBSPOT_API_BASE_URL", "http://localhost:9000"),
        ("HUBSYNC_ENTITIES", " Companies, deals ,,"),
        ("HUBSYNC_PAGE_SIZE", "50"),
        ("HUBSYNC_MAX_ATTEMPTS", "3"),
        ("HUBSYNC_BACKOFF_BASE_MS", "10"),
    ]);
    let config = SyncConfig::from_vars(vars(&pairs)).unwrap();

    assert_eq!(config.api_base_url, "http://localhost:9000");
    assert_eq!(config.entities, vec!["companies", "deals"]);
    assert_eq!(config.page_size, 50);
    assert_eq!(
        config.retry_policy(),
        RetryPolicy::new(3, Duration::from_millis(10))
    );
}

#[test]
fn blank_entity_list_is_rejected() {
    let mut pairs = CREDENTIALS.to_vec();
    pairs.push(("HUBSYNC_ENTITIES", " , "));
    let err = SyncConfig::from_vars(vars(&pairs)).unwrap_err();
    assert!(matches!(err, SyncError::Config(_)));
}

#[test]
fn unparseable_number_names_the_variable() {
    let mut pairs = CREDENTIALS.to_vec();
    pairs.push(("HUBSYNC_PAGE_SIZE", "lots"));
    let err = SyncConfig::from_vars(vars(&pairs)).unwrap_err();
    assert!(err.to_string().contains("invalid HUBSYNC_PAGE_SIZE"));
}

#[test]
fn config_serde_roundtrip() {
    let config = SyncConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    let parsed: SyncConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.entities, config.entities);
    assert_eq!(parsed.offset_ceiling, config.offset_ceiling);
}
