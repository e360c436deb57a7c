use anyhow::{anyhow, Result};
use config::{Config, File, FileFormat};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::env::apply_env;
use crate::ReloaderConfig;

/// 配置加载器
///
/// 优先级：默认值 < TOML 文件 < 环境变量。命令行参数由调用方最后覆盖。
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// 不读文件，只用默认值和环境变量
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_file<P: AsRef<Path>>(config_path: P) -> Self {
        Self {
            config_path: Some(config_path.as_ref().to_path_buf()),
        }
    }

    /// 加载配置（读取进程环境变量）
    pub fn load(&self) -> Result<ReloaderConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// 加载配置，环境变量由 `lookup` 提供
    pub fn load_with_env<F>(&self, lookup: F) -> Result<ReloaderConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self.load_file()?;
        apply_env(&mut config, lookup)?;
        Ok(config)
    }

    /// 只加载文件层
    pub fn load_file(&self) -> Result<ReloaderConfig> {
        let Some(config_path) = &self.config_path else {
            return Ok(ReloaderConfig::default());
        };

        if !config_path.exists() {
            return Err(anyhow!("Config file not found: {}", config_path.display()));
        }

        let config = Config::builder()
            .add_source(File::new(
                config_path.to_str().ok_or_else(|| anyhow!("Invalid config path"))?,
                FileFormat::Toml,
            ))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// 验证配置
    pub fn validate(config: &ReloaderConfig) -> Result<()> {
        let required = [
            ("observatorium.url (OBSERVATORIUM_URL)", &config.observatorium.url),
            ("oidc.audience (OIDC_AUDIENCE)", &config.oidc.audience),
            ("oidc.client_id (OIDC_CLIENT_ID)", &config.oidc.client_id),
            ("oidc.client_secret (OIDC_CLIENT_SECRET)", &config.oidc.client_secret),
            ("oidc.issuer_url (OIDC_ISSUER_URL)", &config.oidc.issuer_url),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(anyhow!("{} must be set", name));
            }
        }

        if config.observatorium.context_name.trim().is_empty() {
            return Err(anyhow!("observatorium.context_name must not be empty"));
        }

        if config.sync.sleep_duration_seconds == 0 && !config.sync.once {
            return Err(anyhow!("sleep_duration_seconds must be greater than 0"));
        }

        if config.server.enabled {
            config
                .server
                .listen
                .parse::<SocketAddr>()
                .map_err(|e| anyhow!("Invalid server.listen {:?}: {}", config.server.listen, e))?;
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
