use crate::error::Result;
use crate::publisher::ObsctlClient;
use reloader_types::{ClientCredentials, TenantRules};
use tracing::{debug, error, warn};

/// 单个租户的 obsctl 上下文
///
/// `begin` 不执行命令；`sync` 依次执行 add、login、switch、set；
/// `close` 总是执行 `context api rm`，无论 `sync` 成功与否。
/// 未调用 `close` 就被丢弃时记录错误日志。
pub struct TenantSession<'a> {
    client: &'a ObsctlClient,
    tenant: &'a str,
    closed: bool,
}

impl<'a> TenantSession<'a> {
    pub fn begin(client: &'a ObsctlClient, tenant: &'a str) -> Self {
        debug!(tenant, context = client.context_name(), "beginning obsctl session");
        Self {
            client,
            tenant,
            closed: false,
        }
    }

    pub fn tenant(&self) -> &str {
        self.tenant
    }

    /// 第一个失败的步骤终止后续步骤
    pub async fn sync(&self, credentials: &ClientCredentials, rules: &TenantRules) -> Result<()> {
        if !credentials.is_complete() {
            warn!(tenant = self.tenant, "client credentials are incomplete");
        }

        self.client.context_add().await?;
        self.client.login(self.tenant, credentials).await?;
        self.client.context_switch(self.tenant).await?;
        self.client.metrics_set(self.tenant, rules).await
    }

    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        debug!(tenant = self.tenant, "closing obsctl session");
        self.client.context_remove().await
    }
}

impl Drop for TenantSession<'_> {
    fn drop(&mut self) {
        if !self.closed {
            error!(
                tenant = self.tenant,
                context = self.client.context_name(),
                "obsctl session dropped without removing its context"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReloaderError;
    use crate::publisher::ObsctlSettings;
    use crate::testing::ScriptedRunner;
    use std::sync::Arc;

    fn client(runner: Arc<ScriptedRunner>) -> ObsctlClient {
        ObsctlClient::new(
            runner,
            ObsctlSettings {
                api_url: "https://observatorium.example.com".to_string(),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_begin_runs_nothing() {
        let runner = Arc::new(ScriptedRunner::new());
        let client = client(runner.clone());

        let session = TenantSession::begin(&client, "rhobs");
        assert_eq!(session.tenant(), "rhobs");
        assert!(runner.calls().is_empty());

        session.close().await.unwrap();
        assert_eq!(runner.verbs(), vec!["context api"]);
    }

    #[tokio::test]
    async fn test_sync_stops_at_first_failure() {
        let runner = Arc::new(ScriptedRunner::new().fail_on(&["context", "switch"]));
        let client = client(runner.clone());

        let session = TenantSession::begin(&client, "rhobs");
        let err = session
            .sync(&ClientCredentials::new("id", "secret"), &TenantRules::new())
            .await
            .unwrap_err();
        session.close().await.unwrap();

        assert!(matches!(err, ReloaderError::ContextOpFailure { operation: "switch", .. }));
        assert_eq!(runner.count_matching(&["metrics", "set"]), 0);
        assert_eq!(runner.count_matching(&["context", "api", "rm"]), 1);
    }

    #[tokio::test]
    async fn test_empty_rules_still_published() {
        let runner = Arc::new(ScriptedRunner::new());
        let client = client(runner.clone());

        let session = TenantSession::begin(&client, "rhobs");
        session
            .sync(&ClientCredentials::new("id", "secret"), &TenantRules::new())
            .await
            .unwrap();
        session.close().await.unwrap();

        assert_eq!(runner.rule_files(), vec![r#"{"groups":[]}"#.to_string()]);
    }
}
