use prometheus::{Counter, CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use tracing::warn;

/// 同步周期结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleResult {
    /// 所有租户都已同步
    Success,
    /// 部分租户失败
    Partial,
    /// 读取或聚合失败，周期中止
    Failed,
}

impl CycleResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleResult::Success => "success",
            CycleResult::Partial => "partial",
            CycleResult::Failed => "failed",
        }
    }
}

/// 指标收集器
pub struct ReloaderMetrics {
    // 规则读取
    rule_fetches: Counter,
    rule_fetch_failures: Counter,

    // 每个租户的规则组数量
    tenant_rule_groups: GaugeVec,

    // obsctl set
    rule_sets: CounterVec,
    rule_set_failures: CounterVec,

    sync_cycles: CounterVec,

    registry: Registry,
}

impl ReloaderMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let rule_fetches = Counter::new(
            "obsctl_reloader_prom_rule_fetches_total",
            "Total number of list operations for PrometheusRules.",
        )?;
        registry.register(Box::new(rule_fetches.clone()))?;

        let rule_fetch_failures = Counter::new(
            "obsctl_reloader_prom_rule_fetch_failures_total",
            "Total number of failed list operations for PrometheusRules.",
        )?;
        registry.register(Box::new(rule_fetch_failures.clone()))?;

        let tenant_rule_groups = GaugeVec::new(
            Opts::new(
                "obsctl_reloader_prom_tenant_rulegroups",
                "Number of Prometheus rule groups loaded per tenant.",
            ),
            &["tenant"],
        )?;
        registry.register(Box::new(tenant_rule_groups.clone()))?;

        let rule_sets = CounterVec::new(
            Opts::new(
                "obsctl_reloader_prom_rule_sets_total",
                "Total number of successful obsctl set operations for Prometheus rules.",
            ),
            &["tenant"],
        )?;
        registry.register(Box::new(rule_sets.clone()))?;

        let rule_set_failures = CounterVec::new(
            Opts::new(
                "obsctl_reloader_prom_rule_set_failures_total",
                "Total number of failed obsctl publish sequences for Prometheus rules.",
            ),
            &["tenant"],
        )?;
        registry.register(Box::new(rule_set_failures.clone()))?;

        let sync_cycles = CounterVec::new(
            Opts::new(
                "obsctl_reloader_sync_cycles_total",
                "Total number of reconciliation cycles by result.",
            ),
            &["result"],
        )?;
        registry.register(Box::new(sync_cycles.clone()))?;

        Ok(Self {
            rule_fetches,
            rule_fetch_failures,
            tenant_rule_groups,
            rule_sets,
            rule_set_failures,
            sync_cycles,
            registry,
        })
    }

    pub fn record_fetch(&self) {
        self.rule_fetches.inc();
    }

    pub fn record_fetch_failure(&self) {
        self.rule_fetch_failures.inc();
    }

    pub fn set_tenant_rule_groups(&self, tenant: &str, count: usize) {
        self.tenant_rule_groups
            .with_label_values(&[tenant])
            .set(count as f64);
    }

    pub fn record_rule_set(&self, tenant: &str) {
        self.rule_sets.with_label_values(&[tenant]).inc();
    }

    pub fn record_rule_set_failure(&self, tenant: &str) {
        self.rule_set_failures.with_label_values(&[tenant]).inc();
    }

    pub fn record_cycle(&self, result: CycleResult) {
        self.sync_cycles.with_label_values(&[result.as_str()]).inc();
    }

    /// Prometheus 文本格式
    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            warn!("Failed to encode metrics: {}", e);
            return String::new();
        }

        String::from_utf8(buffer).unwrap_or_default()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
