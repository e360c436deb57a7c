use thiserror::Error;

/// 同步过程中的错误
#[derive(Error, Debug)]
pub enum ReloaderError {
    /// 列出规则的命令失败或超时
    #[error("Rule source unavailable: {0}")]
    SourceUnavailable(String),

    /// 命令输出不是预期的 JSON
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// 规则资源缺少必需字段
    #[error("Malformed rule {name}: {reason}")]
    MalformedRule { name: String, reason: String },

    #[error("Login failed for tenant {tenant}: {reason}")]
    AuthFailure { tenant: String, reason: String },

    #[error("Setting rules failed for tenant {tenant}: {reason}")]
    PublishFailure { tenant: String, reason: String },

    /// obsctl context add / switch / rm 失败
    #[error("obsctl context {operation} failed for {context}: {reason}")]
    ContextOpFailure {
        operation: &'static str,
        context: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 单次运行模式下有租户同步失败
    #[error("Sync cycle incomplete, failed tenants: {}", failed.join(", "))]
    CycleIncomplete { failed: Vec<String> },

    #[error("Giving up after {count} consecutive failed cycles, last error: {last}")]
    TooManyFailures { count: u32, last: String },
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, ReloaderError>;

impl ReloaderError {
    pub fn malformed_rule(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ReloaderError::MalformedRule {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// 出错的租户（如果有）
    pub fn tenant(&self) -> Option<&str> {
        match self {
            ReloaderError::AuthFailure { tenant, .. }
            | ReloaderError::PublishFailure { tenant, .. } => Some(tenant),
            _ => None,
        }
    }
}
