use crate::error::{ReloaderError, Result};
use reloader_types::{RuleResource, TenantBundle};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// 按 `tenant` 标签聚合规则组
///
/// 没有 tenant 标签的资源直接跳过；同一租户的规则组按资源顺序拼接，不去重。
#[derive(Debug, Clone, Default)]
pub struct TenantAggregator {
    managed: Option<BTreeSet<String>>,
}

impl TenantAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 只同步这些租户；它们即使没有规则也会得到一个空条目。
    /// 传入空列表等于不限制。
    pub fn with_managed_tenants<I, S>(mut self, tenants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let managed: BTreeSet<String> = tenants
            .into_iter()
            .map(Into::into)
            .filter(|tenant: &String| !tenant.is_empty())
            .collect();
        self.managed = (!managed.is_empty()).then_some(managed);
        self
    }

    pub fn managed_tenants(&self) -> Option<&BTreeSet<String>> {
        self.managed.as_ref()
    }

    pub fn aggregate(&self, resources: &[RuleResource]) -> Result<TenantBundle> {
        let mut bundle = TenantBundle::new();

        if let Some(managed) = &self.managed {
            for tenant in managed {
                bundle.entry(tenant);
            }
        }

        for resource in resources {
            let name = resource.name();
            debug!(name, "checking prometheus rule for tenant");

            let Some(tenant) = resource.tenant() else {
                info!(name, "skipping prometheus rule without tenant label");
                continue;
            };

            if let Some(managed) = &self.managed {
                if !managed.contains(tenant) {
                    info!(name, tenant, "skipping prometheus rule with unmanaged tenant");
                    continue;
                }
            }

            let groups = resource
                .groups()
                .ok_or_else(|| ReloaderError::malformed_rule(name, "missing spec.groups"))?
                .as_array()
                .ok_or_else(|| ReloaderError::malformed_rule(name, "spec.groups is not a list"))?;

            debug!(name, tenant, groups = groups.len(), "adding prometheus rule groups to tenant");
            bundle.entry(tenant).extend_from(groups);
        }

        Ok(bundle)
    }
}

/// 不限制租户的聚合
pub fn aggregate_by_tenant(resources: &[RuleResource]) -> Result<TenantBundle> {
    TenantAggregator::new().aggregate(resources)
}
