use reloader_config::ConfigLoader;
use std::collections::HashMap;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_env_overrides_file_overrides_defaults() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("reloader.toml");
    fs::write(
        &path,
        r#"
[observatorium]
url = "https://from-file.example.com"

[oidc]
audience = "file-audience"
client_id = "file-id"
client_secret = "file-secret"
issuer_url = "https://sso.example.com"

[sync]
sleep_duration_seconds = 60
"#,
    )
    .unwrap();

    let env: HashMap<&str, &str> = [
        ("OBSERVATORIUM_URL", "https://from-env.example.com"),
        ("OIDC_CLIENT_SECRET", "env-secret"),
        ("MANAGED_TENANTS", "rhobs,telemeter"),
    ]
    .into_iter()
    .collect();

    let config = ConfigLoader::with_file(&path)
        .load_with_env(|key| env.get(key).map(|v| v.to_string()))
        .unwrap();

    // 环境变量覆盖文件
    assert_eq!(config.observatorium.url, "https://from-env.example.com");
    assert_eq!(config.oidc.client_secret, "env-secret");
    // 文件覆盖默认值
    assert_eq!(config.oidc.client_id, "file-id");
    assert_eq!(config.sync.sleep_duration_seconds, 60);
    // 默认值
    assert_eq!(config.sync.max_backoff_seconds, 300);
    assert_eq!(config.source.resource, "prometheusrules");
    assert_eq!(config.tenants.managed, vec!["rhobs", "telemeter"]);

    ConfigLoader::validate(&config).unwrap();
}
