use reloader_types::{ClientCredentials, SwitchTarget};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 全局配置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloaderConfig {
    pub observatorium: ObservatoriumConfig,
    pub oidc: OidcConfig,
    pub source: SourceConfig,
    pub obsctl: ObsctlConfig,
    pub sync: SyncConfig,
    pub tenants: TenantsConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

/// Observatorium API
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservatoriumConfig {
    pub url: String,
    /// obsctl context 名称，多个租户串行复用
    pub context_name: String,
    pub switch_target: SwitchTarget,
}

/// OIDC 认证参数
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OidcConfig {
    pub audience: String,
    pub client_id: String,
    pub client_secret: String,
    pub issuer_url: String,
    /// 按租户覆盖 client id/secret
    pub tenants: BTreeMap<String, ClientCredentials>,
}

/// 规则来源（集群 CLI）
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    pub command: String,
    pub resource: String,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObsctlConfig {
    pub binary: String,
    /// 给每次 obsctl 调用追加 `--log.level=debug`
    pub cli_logs: bool,
}

/// 同步循环
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    pub sleep_duration_seconds: u64,
    /// 失败后退避的上限，小于 sleep_duration_seconds 时按后者处理
    pub max_backoff_seconds: u64,
    /// 0 表示不限制
    pub max_consecutive_failures: u32,
    /// 0 表示不设超时
    pub command_timeout_seconds: u64,
    pub once: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TenantsConfig {
    /// 为空时同步所有带 tenant 标签的规则
    pub managed: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// text | json
    pub format: String,
}

/// 内部 HTTP 服务（metrics / healthz）
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub listen: String,
}

impl Default for ObservatoriumConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            context_name: "api".to_string(),
            switch_target: SwitchTarget::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            command: "oc".to_string(),
            resource: "prometheusrules".to_string(),
            namespace: None,
        }
    }
}

impl Default for ObsctlConfig {
    fn default() -> Self {
        Self {
            binary: "obsctl".to_string(),
            cli_logs: false,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sleep_duration_seconds: 30,
            max_backoff_seconds: 300,
            max_consecutive_failures: 0,
            command_timeout_seconds: 0,
            once: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: "0.0.0.0:8081".to_string(),
        }
    }
}
