pub mod env;
pub mod global;
pub mod loader;

pub use env::{apply_env, apply_tenant_credentials, tenant_env_prefix};
pub use global::{
    LoggingConfig, ObservatoriumConfig, ObsctlConfig, OidcConfig,
    ReloaderConfig, ServerConfig, SourceConfig, SyncConfig, TenantsConfig,
};
pub use loader::ConfigLoader;
