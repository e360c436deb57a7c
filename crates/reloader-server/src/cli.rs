use anyhow::Result;
use clap::Parser;
use reloader_config::{apply_tenant_credentials, ConfigLoader, ReloaderConfig};
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about = "Syncs PrometheusRule resources to Observatorium tenants via obsctl"
)]
pub struct Args {
    /// Config file path (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Run a single sync cycle and exit
    #[arg(long)]
    pub once: bool,

    #[arg(long)]
    pub sleep_duration_seconds: Option<u64>,

    #[arg(long)]
    pub log_level: Option<String>,

    /// text | json
    #[arg(long)]
    pub log_format: Option<String>,

    /// Address of the /metrics and /healthz listener
    #[arg(long)]
    pub internal_listen: Option<String>,

    /// Only read rules from this namespace
    #[arg(long)]
    pub namespace: Option<String>,

    /// Comma separated tenant list
    #[arg(long, value_delimiter = ',')]
    pub managed_tenants: Vec<String>,
}

impl Args {
    /// 默认值 < 配置文件 < 环境变量 < 命令行
    pub fn load_config(&self) -> Result<ReloaderConfig> {
        self.load_config_with_env(|key| std::env::var(key).ok())
    }

    pub fn load_config_with_env<F>(&self, lookup: F) -> Result<ReloaderConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let loader = match &self.config {
            Some(path) => ConfigLoader::with_file(path),
            None => ConfigLoader::new(),
        };

        let mut config = loader.load_with_env(&lookup)?;
        if self.apply_overrides(&mut config) {
            apply_tenant_credentials(&mut config, &lookup);
        }

        ConfigLoader::validate(&config)?;
        Ok(config)
    }

    /// 命令行覆盖配置；受管租户列表被改写时返回 true
    pub fn apply_overrides(&self, config: &mut ReloaderConfig) -> bool {
        if self.once {
            config.sync.once = true;
        }
        if let Some(seconds) = self.sleep_duration_seconds {
            config.sync.sleep_duration_seconds = seconds;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
        if let Some(listen) = &self.internal_listen {
            config.server.listen = listen.clone();
        }
        if let Some(namespace) = self.namespace.as_ref().filter(|ns| !ns.is_empty()) {
            config.source.namespace = Some(namespace.clone());
        }

        let managed: Vec<String> = self
            .managed_tenants
            .iter()
            .map(|tenant| tenant.trim())
            .filter(|tenant| !tenant.is_empty())
            .map(String::from)
            .collect();
        if managed.is_empty() {
            return false;
        }
        config.tenants.managed = managed;
        true
    }
}
