use crate::level::{LogFormat, LogLevel};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Failed to install subscriber: {0}")]
    InitError(String),
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    /// 为 true 时 `RUST_LOG` 优先于 `level`
    pub respect_env: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Text,
            respect_env: true,
        }
    }
}

/// 构建过滤器
pub fn build_filter(settings: &LoggingSettings) -> Result<EnvFilter, LoggingError> {
    if settings.respect_env {
        if let Ok(directives) = std::env::var(EnvFilter::DEFAULT_ENV) {
            if !directives.trim().is_empty() {
                return EnvFilter::try_new(&directives)
                    .map_err(|e| LoggingError::InvalidFilter(e.to_string()));
            }
        }
    }

    EnvFilter::try_new(settings.level.as_str())
        .map_err(|e| LoggingError::InvalidFilter(e.to_string()))
}

/// 安装全局 tracing subscriber，进程内只能调用一次
pub fn init_logging(settings: &LoggingSettings) -> Result<(), LoggingError> {
    let filter = build_filter(settings)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match settings.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
    };

    result.map_err(|e| LoggingError::InitError(e.to_string()))
}
