use crate::command::{CommandRunner, Invocation};
use crate::error::{ReloaderError, Result};
use crate::session::TenantSession;
use async_trait::async_trait;
use reloader_types::{ClientCredentials, SwitchTarget, TenantRules};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, error, info};

const CLI_DEBUG_LOGS: &str = "--log.level=debug";

/// 把一个租户的规则推送到后端
#[async_trait]
pub trait TenantPublisher: Send + Sync {
    async fn publish(&self, tenant: &str, rules: &TenantRules) -> Result<()>;
}

/// obsctl 参数
#[derive(Debug, Clone)]
pub struct ObsctlSettings {
    pub binary: String,
    pub context_name: String,
    pub api_url: String,
    pub audience: String,
    pub issuer_url: String,
    pub switch_target: SwitchTarget,
    pub cli_logs: bool,
}

impl Default for ObsctlSettings {
    fn default() -> Self {
        Self {
            binary: "obsctl".to_string(),
            context_name: "api".to_string(),
            api_url: String::new(),
            audience: String::new(),
            issuer_url: String::new(),
            switch_target: SwitchTarget::default(),
            cli_logs: false,
        }
    }
}

/// obsctl 命令封装，每个方法对应一条命令
pub struct ObsctlClient {
    runner: Arc<dyn CommandRunner>,
    settings: ObsctlSettings,
}

impl ObsctlClient {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: ObsctlSettings) -> Self {
        Self { runner, settings }
    }

    pub fn settings(&self) -> &ObsctlSettings {
        &self.settings
    }

    pub fn context_name(&self) -> &str {
        &self.settings.context_name
    }

    fn command(&self) -> Invocation {
        Invocation::new(&self.settings.binary)
    }

    async fn run(&self, invocation: Invocation) -> std::result::Result<String, String> {
        let invocation = if self.settings.cli_logs {
            invocation.arg(CLI_DEBUG_LOGS)
        } else {
            invocation
        };

        debug!(command = %invocation, "running obsctl");
        match self.runner.run(&invocation).await {
            Ok(output) => Ok(output.stdout),
            Err(e) => Err(e.to_string()),
        }
    }

    /// `obsctl context api add --name <ctx> --url <url>`
    pub async fn context_add(&self) -> Result<()> {
        let invocation = self
            .command()
            .args(["context", "api", "add", "--name"])
            .arg(self.context_name())
            .arg("--url")
            .arg(&self.settings.api_url);

        self.run(invocation)
            .await
            .map(|_| ())
            .map_err(|reason| self.context_error("add", reason))
    }

    /// `obsctl login --api <ctx> --oidc.* ... --tenant <tenant>`
    pub async fn login(&self, tenant: &str, credentials: &ClientCredentials) -> Result<()> {
        let invocation = self
            .command()
            .args(["login", "--api"])
            .arg(self.context_name())
            .arg("--oidc.audience")
            .arg(&self.settings.audience)
            .arg("--oidc.client-id")
            .arg(&credentials.client_id)
            .secret("--oidc.client-secret", &credentials.client_secret)
            .arg("--oidc.issuer-url")
            .arg(&self.settings.issuer_url)
            .arg("--tenant")
            .arg(tenant);

        self.run(invocation)
            .await
            .map(|_| ())
            .map_err(|reason| ReloaderError::AuthFailure {
                tenant: tenant.to_string(),
                reason,
            })
    }

    /// `obsctl context switch <target>`
    pub async fn context_switch(&self, tenant: &str) -> Result<()> {
        let target = self.settings.switch_target.render(self.context_name(), tenant);
        let invocation = self.command().args(["context", "switch"]).arg(&target);

        self.run(invocation)
            .await
            .map(|_| ())
            .map_err(|reason| ReloaderError::ContextOpFailure {
                operation: "switch",
                context: target,
                reason,
            })
    }

    /// `obsctl metrics set --rule.file <tmp>`
    ///
    /// 临时文件在函数返回时删除，包括命令失败的情况。
    pub async fn metrics_set(&self, tenant: &str, rules: &TenantRules) -> Result<()> {
        info!(tenant, groups = rules.len(), "setting metrics rules for tenant");

        let publish_error = |reason: String| ReloaderError::PublishFailure {
            tenant: tenant.to_string(),
            reason,
        };

        let body = serde_json::to_vec(rules)?;
        let mut rule_file = tempfile::Builder::new()
            .prefix("obsctl-rules-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| publish_error(format!("creating rule file: {}", e)))?;
        rule_file
            .write_all(&body)
            .and_then(|_| rule_file.flush())
            .map_err(|e| publish_error(format!("writing rule file: {}", e)))?;

        let path = rule_file.path().to_string_lossy().into_owned();
        let invocation = self
            .command()
            .args(["metrics", "set", "--rule.file"])
            .arg(path);

        let result = self.run(invocation).await.map(|_| ()).map_err(publish_error);
        drop(rule_file);
        result
    }

    /// `obsctl context api rm --name <ctx>`
    pub async fn context_remove(&self) -> Result<()> {
        let invocation = self
            .command()
            .args(["context", "api", "rm", "--name"])
            .arg(self.context_name());

        self.run(invocation)
            .await
            .map(|_| ())
            .map_err(|reason| self.context_error("rm", reason))
    }

    fn context_error(&self, operation: &'static str, reason: String) -> ReloaderError {
        ReloaderError::ContextOpFailure {
            operation,
            context: self.context_name().to_string(),
            reason,
        }
    }
}

/// 租户凭据，未单独配置的租户使用默认凭据
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    default: ClientCredentials,
    tenants: BTreeMap<String, ClientCredentials>,
}

impl CredentialStore {
    pub fn new(default: ClientCredentials) -> Self {
        Self {
            default,
            tenants: BTreeMap::new(),
        }
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>, credentials: ClientCredentials) -> Self {
        self.tenants.insert(tenant.into(), credentials);
        self
    }

    pub fn for_tenant(&self, tenant: &str) -> &ClientCredentials {
        self.tenants
            .get(tenant)
            .filter(|creds| creds.is_complete())
            .unwrap_or(&self.default)
    }
}

/// 通过 obsctl 推送规则
///
/// 每个租户一个 [`TenantSession`]：add → login → switch → set，最后总是 rm。
pub struct ObsctlPublisher {
    client: ObsctlClient,
    credentials: CredentialStore,
}

impl ObsctlPublisher {
    pub fn new(client: ObsctlClient, credentials: CredentialStore) -> Self {
        Self { client, credentials }
    }
}

#[async_trait]
impl TenantPublisher for ObsctlPublisher {
    async fn publish(&self, tenant: &str, rules: &TenantRules) -> Result<()> {
        let credentials = self.credentials.for_tenant(tenant);

        let session = TenantSession::begin(&self.client, tenant);
        let outcome = session.sync(credentials, rules).await;
        let teardown = session.close().await;

        match (outcome, teardown) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(teardown_err)) => {
                error!(tenant, error = %teardown_err, "removing obsctl context failed after earlier error");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;
    use serde_json::json;

    fn settings() -> ObsctlSettings {
        ObsctlSettings {
            api_url: "https://observatorium.example.com".to_string(),
            audience: "observatorium".to_string(),
            issuer_url: "https://sso.example.com/auth/realms/redhat-external".to_string(),
            ..Default::default()
        }
    }

    fn publisher(runner: Arc<ScriptedRunner>, settings: ObsctlSettings) -> ObsctlPublisher {
        ObsctlPublisher::new(
            ObsctlClient::new(runner, settings),
            CredentialStore::new(ClientCredentials::new("id", "secret")),
        )
    }

    fn rules() -> TenantRules {
        TenantRules {
            groups: vec![json!({"name": "g1", "rules": [{"alert": "Down", "expr": "up == 0"}]})],
        }
    }

    #[tokio::test]
    async fn test_publish_command_sequence() {
        let runner = Arc::new(ScriptedRunner::new());
        let publisher = publisher(runner.clone(), settings());

        publisher.publish("rhobs", &rules()).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(
            calls[0],
            vec!["context", "api", "add", "--name", "api", "--url", "https://observatorium.example.com"]
        );
        assert_eq!(
            calls[1],
            vec![
                "login",
                "--api",
                "api",
                "--oidc.audience",
                "observatorium",
                "--oidc.client-id",
                "id",
                "--oidc.client-secret",
                "secret",
                "--oidc.issuer-url",
                "https://sso.example.com/auth/realms/redhat-external",
                "--tenant",
                "rhobs",
            ]
        );
        assert_eq!(calls[2], vec!["context", "switch", "api/rhobs"]);
        assert_eq!(&calls[3][..3], &["metrics", "set", "--rule.file"]);
        assert_eq!(calls[4], vec!["context", "api", "rm", "--name", "api"]);
    }

    #[tokio::test]
    async fn test_rule_file_content_and_cleanup() {
        let runner = Arc::new(ScriptedRunner::new());
        let publisher = publisher(runner.clone(), settings());

        publisher.publish("rhobs", &rules()).await.unwrap();

        let written: serde_json::Value = serde_json::from_str(&runner.rule_files()[0]).unwrap();
        assert_eq!(written, serde_json::to_value(rules()).unwrap());

        let path = &runner.rule_file_paths()[0];
        assert!(!std::path::Path::new(path).exists());
    }

    #[tokio::test]
    async fn test_rule_file_removed_when_set_fails() {
        let runner = Arc::new(ScriptedRunner::new().fail_on(&["metrics", "set"]));
        let publisher = publisher(runner.clone(), settings());

        let err = publisher.publish("rhobs", &rules()).await.unwrap_err();

        assert!(matches!(err, ReloaderError::PublishFailure { .. }));
        assert!(!std::path::Path::new(&runner.rule_file_paths()[0]).exists());
        assert_eq!(runner.count_matching(&["context", "api", "rm"]), 1);
    }

    #[tokio::test]
    async fn test_teardown_runs_after_login_failure() {
        let runner = Arc::new(ScriptedRunner::new().fail_on(&["login"]));
        let publisher = publisher(runner.clone(), settings());

        let err = publisher.publish("rhobs", &rules()).await.unwrap_err();

        assert!(matches!(err, ReloaderError::AuthFailure { ref tenant, .. } if tenant == "rhobs"));
        assert_eq!(runner.verbs(), vec!["context api", "login --api", "context api"]);
        assert_eq!(runner.count_matching(&["context", "api", "rm"]), 1);
    }

    #[tokio::test]
    async fn test_teardown_runs_after_context_add_failure() {
        let runner = Arc::new(ScriptedRunner::new().fail_on(&["context", "api", "add"]));
        let publisher = publisher(runner.clone(), settings());

        let err = publisher.publish("rhobs", &rules()).await.unwrap_err();

        assert!(matches!(err, ReloaderError::ContextOpFailure { operation: "add", .. }));
        assert_eq!(runner.calls().len(), 2);
        assert_eq!(runner.count_matching(&["context", "api", "rm"]), 1);
    }

    #[tokio::test]
    async fn test_teardown_failure_reported_when_sync_succeeds() {
        let runner = Arc::new(ScriptedRunner::new().fail_on(&["context", "api", "rm"]));
        let publisher = publisher(runner.clone(), settings());

        let err = publisher.publish("rhobs", &rules()).await.unwrap_err();
        assert!(matches!(err, ReloaderError::ContextOpFailure { operation: "rm", .. }));
    }

    #[tokio::test]
    async fn test_first_error_wins_over_teardown_error() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .fail_on(&["context", "switch"])
                .fail_on(&["context", "api", "rm"]),
        );
        let publisher = publisher(runner.clone(), settings());

        let err = publisher.publish("rhobs", &rules()).await.unwrap_err();
        assert!(matches!(err, ReloaderError::ContextOpFailure { operation: "switch", .. }));
    }

    #[tokio::test]
    async fn test_tenant_switch_target_and_cli_logs() {
        let runner = Arc::new(ScriptedRunner::new());
        let publisher = publisher(
            runner.clone(),
            ObsctlSettings {
                switch_target: SwitchTarget::TenantTenant,
                cli_logs: true,
                ..settings()
            },
        );

        publisher.publish("rhobs", &rules()).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls[2], vec!["context", "switch", "rhobs/rhobs", "--log.level=debug"]);
        assert!(calls.iter().all(|argv| argv.last().unwrap() == "--log.level=debug"));
    }

    #[tokio::test]
    async fn test_tenant_specific_credentials() {
        let runner = Arc::new(ScriptedRunner::new());
        let publisher = ObsctlPublisher::new(
            ObsctlClient::new(runner.clone(), settings()),
            CredentialStore::new(ClientCredentials::new("id", "secret"))
                .with_tenant("telemeter", ClientCredentials::new("tele-id", "tele-secret")),
        );

        publisher.publish("telemeter", &rules()).await.unwrap();
        publisher.publish("rhobs", &rules()).await.unwrap();

        let logins: Vec<Vec<String>> = runner
            .calls()
            .into_iter()
            .filter(|argv| argv[0] == "login")
            .collect();
        assert_eq!(logins[0][6], "tele-id");
        assert_eq!(logins[0][8], "tele-secret");
        assert_eq!(logins[1][6], "id");
    }
}
