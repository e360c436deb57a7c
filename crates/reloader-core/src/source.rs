use crate::command::{CommandRunner, Invocation};
use crate::error::{ReloaderError, Result};
use async_trait::async_trait;
use reloader_types::RuleResource;
use std::sync::Arc;
use tracing::{debug, error};

/// 规则来源
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// 拉取全部 PrometheusRule
    async fn list_rules(&self) -> Result<Vec<RuleResource>>;
}

/// 通过 `oc` / `kubectl` 读取规则
pub struct CliRuleSource {
    runner: Arc<dyn CommandRunner>,
    command: String,
    resource: String,
    namespace: Option<String>,
}

impl CliRuleSource {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        command: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            command: command.into(),
            resource: resource.into(),
            namespace: None,
        }
    }

    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace.filter(|ns| !ns.is_empty());
        self
    }

    fn invocation(&self) -> Invocation {
        let invocation = Invocation::new(&self.command).args(["get", self.resource.as_str(), "-o", "json"]);
        match &self.namespace {
            Some(namespace) => invocation.args(["-n", namespace.as_str()]),
            None => invocation,
        }
    }
}

#[async_trait]
impl RuleSource for CliRuleSource {
    async fn list_rules(&self) -> Result<Vec<RuleResource>> {
        let invocation = self.invocation();

        let output = self.runner.run(&invocation).await.map_err(|e| {
            error!(command = %invocation, error = %e, "listing rule resources failed");
            ReloaderError::SourceUnavailable(e.to_string())
        })?;

        let resources = parse_rule_list(&output.stdout)?;
        debug!(count = resources.len(), resource = %self.resource, "listed rule resources");
        Ok(resources)
    }
}

/// 解析 `get -o json` 的输出
pub fn parse_rule_list(raw: &str) -> Result<Vec<RuleResource>> {
    let mut document: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| ReloaderError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let items = document
        .get_mut("items")
        .map(serde_json::Value::take)
        .ok_or_else(|| ReloaderError::MalformedResponse("missing top-level `items` field".to_string()))?;

    serde_json::from_value(items)
        .map_err(|e| ReloaderError::MalformedResponse(format!("unexpected item shape: {}", e)))
}
