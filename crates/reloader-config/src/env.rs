use anyhow::{anyhow, Result};

use crate::ReloaderConfig;
use reloader_types::ClientCredentials;

pub const OBSERVATORIUM_URL: &str = "OBSERVATORIUM_URL";
pub const OIDC_AUDIENCE: &str = "OIDC_AUDIENCE";
pub const OIDC_CLIENT_ID: &str = "OIDC_CLIENT_ID";
pub const OIDC_CLIENT_SECRET: &str = "OIDC_CLIENT_SECRET";
pub const OIDC_ISSUER_URL: &str = "OIDC_ISSUER_URL";
pub const SLEEP_DURATION_SECONDS: &str = "SLEEP_DURATION_SECONDS";
pub const ALLOW_CLI_LOGS: &str = "ALLOW_CLI_LOGS";
pub const MANAGED_TENANTS: &str = "MANAGED_TENANTS";
pub const NAMESPACE_NAME: &str = "NAMESPACE_NAME";
pub const LOG_LEVEL: &str = "LOG_LEVEL";

/// 租户专属凭据环境变量前缀：`rhobs-prod` -> `RHOBS_PROD`
pub fn tenant_env_prefix(tenant: &str) -> String {
    tenant
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

/// 用环境变量覆盖配置
///
/// `lookup` 一般是 `std::env::var(..).ok()`，测试时传入固定的表。
pub fn apply_env<F>(config: &mut ReloaderConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(OBSERVATORIUM_URL) {
        config.observatorium.url = url;
    }
    if let Some(audience) = lookup(OIDC_AUDIENCE) {
        config.oidc.audience = audience;
    }
    if let Some(client_id) = lookup(OIDC_CLIENT_ID) {
        config.oidc.client_id = client_id;
    }
    if let Some(client_secret) = lookup(OIDC_CLIENT_SECRET) {
        config.oidc.client_secret = client_secret;
    }
    if let Some(issuer_url) = lookup(OIDC_ISSUER_URL) {
        config.oidc.issuer_url = issuer_url;
    }

    if let Some(raw) = lookup(SLEEP_DURATION_SECONDS) {
        config.sync.sleep_duration_seconds = raw.trim().parse().map_err(|e| {
            anyhow!("{} must be a whole number of seconds, got {:?}: {}", SLEEP_DURATION_SECONDS, raw, e)
        })?;
    }

    // 只看是否存在，不看取值
    if lookup(ALLOW_CLI_LOGS).is_some() {
        config.obsctl.cli_logs = true;
    }

    if let Some(raw) = lookup(MANAGED_TENANTS) {
        config.tenants.managed = split_tenants(&raw);
    }
    if let Some(namespace) = lookup(NAMESPACE_NAME).filter(|ns| !ns.is_empty()) {
        config.source.namespace = Some(namespace);
    }
    if let Some(level) = lookup(LOG_LEVEL) {
        config.logging.level = level;
    }

    apply_tenant_credentials(config, lookup);
    Ok(())
}

/// 读取受管租户的 `<TENANT>_CLIENT_ID` / `<TENANT>_CLIENT_SECRET`
///
/// 两者都存在才生效。受管租户列表被命令行改写后需要再调用一次。
pub fn apply_tenant_credentials<F>(config: &mut ReloaderConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for tenant in config.tenants.managed.clone() {
        let prefix = tenant_env_prefix(&tenant);
        let client_id = lookup(&format!("{}_CLIENT_ID", prefix));
        let client_secret = lookup(&format!("{}_CLIENT_SECRET", prefix));

        if let (Some(client_id), Some(client_secret)) = (client_id, client_secret) {
            config
                .oidc
                .tenants
                .insert(tenant, ClientCredentials::new(client_id, client_secret));
        }
    }
}

pub(crate) fn split_tenants(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tenant| !tenant.is_empty())
        .map(String::from)
        .collect()
}
