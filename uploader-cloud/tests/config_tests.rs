use uploader_cloud::{UploadError, UploaderConfig};

#[test]
fn default_refresh_margin() {
    let config = UploaderConfig::default();
    assert_eq!(config.token_refresh_margin_secs, 30);
}

#[test]
fn default_request_timeout() {
    let config = UploaderConfig::default();
    assert_eq!(config.request_timeout_secs, 30);
    assert_eq!(config.request_timeout(), std::time::Duration::from_secs(30));
}

#[test]
fn default_has_no_endpoints() {
    let config = UploaderConfig::default();
    assert!(config.presign_url().is_none());
    assert!(matches!(
        config.token_url(),
        Err(UploadError::ConfigurationMissing(_))
    ));
}

#[test]
fn explicit_token_endpoint_wins_over_domain() {
    let config = UploaderConfig {
        token_endpoint: Some("https://idp.example.com/token".into()),
        cognito_domain: Some("pool.auth.us-east-1.amazoncognito.com".into()),
        ..UploaderConfig::default()
    };
    assert_eq!(config.token_url().unwrap(), "https://idp.example.com/token");
}

#[test]
fn domain_trailing_slash_trimmed() {
    let config = UploaderConfig {
        cognito_domain: Some("pool.auth.us-east-1.amazoncognito.com/".into()),
        ..UploaderConfig::default()
    };
    assert_eq!(
        config.token_url().unwrap(),
        "https://pool.auth.us-east-1.amazoncognito.com/oauth2/token"
    );
}

#[test]
fn domain_with_scheme_kept() {
    let config = UploaderConfig {
        cognito_domain: Some("http://localhost:9229".into()),
        ..UploaderConfig::default()
    };
    assert_eq!(config.token_url().unwrap(), "http://localhost:9229/oauth2/token");
}

#[test]
fn blank_values_treated_as_missing() {
    let config = UploaderConfig {
        presign_endpoint: Some("   ".into()),
        scope: Some("".into()),
        ..UploaderConfig::default()
    };
    assert!(config.presign_url().is_none());
    assert!(config.effective_scope().is_none());
}

#[test]
fn zero_timeout_rejected() {
    let config = UploaderConfig {
        request_timeout_secs: 0,
        ..UploaderConfig::default()
    };
    assert!(matches!(
        config.http_client(),
        Err(UploadError::InvalidConfiguration(_))
    ));
}

#[test]
fn debug_redacts_client_secret() {
    let config = UploaderConfig {
        client_id: "svc".into(),
        client_secret: "hunter2".into(),
        ..UploaderConfig::default()
    };
    let printed = format!("{config:?}");
    assert!(printed.contains("svc"));
    assert!(!printed.contains("hunter2"));
}

#[test]
fn partial_json_fills_defaults() {
    let config: UploaderConfig = serde_json::from_str(
        r#"{"cognito_domain": "pool.example.com", "client_id": "svc", "client_secret": "s"}"#,
    )
    .unwrap();
    assert_eq!(config.client_id, "svc");
    assert_eq!(config.token_refresh_margin_secs, 30);
    assert_eq!(config.body_snippet_limit, 512);
}
