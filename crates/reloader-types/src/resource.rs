use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 租户标签名
pub const TENANT_LABEL: &str = "tenant";

/// 规则组，对本服务来说是不透明的 JSON 值
pub type RuleGroup = serde_json::Value;

/// 集群中的 PrometheusRule 资源（只保留同步需要的字段）
///
/// `spec` 不做结构校验：没有 tenant 标签的资源不会被读取，
/// 它的 spec 是什么形状都不影响其他资源。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResource {
    pub metadata: ObjectMeta,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<serde_json::Value>,
}

/// 资源元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

impl RuleResource {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// `metadata.labels.tenant`，标签不存在或为空时返回 None
    pub fn tenant(&self) -> Option<&str> {
        self.metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(TENANT_LABEL))
            .map(String::as_str)
            .filter(|tenant| !tenant.is_empty())
    }

    /// 原始的 `spec.groups`，字段缺失时返回 None；是否为列表由调用方判断
    pub fn groups(&self) -> Option<&serde_json::Value> {
        self.spec.as_ref().and_then(|spec| spec.get("groups"))
    }
}
