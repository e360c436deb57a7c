use crate::aggregator::TenantAggregator;
use crate::error::{ReloaderError, Result};
use crate::publisher::TenantPublisher;
use crate::source::RuleSource;
use rand::Rng;
use reloader_metrics::{CycleResult, ReloaderMetrics};
use reloader_shutdown::{recv_shutdown, ShutdownSignal};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// 单个租户的失败
#[derive(Debug)]
pub struct TenantFailure {
    pub tenant: String,
    pub error: ReloaderError,
}

/// 一次同步周期的结果
#[derive(Debug, Default)]
pub struct CycleReport {
    pub synced: Vec<String>,
    pub failures: Vec<TenantFailure>,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_tenants(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.tenant.clone()).collect()
    }

    /// 有租户失败时返回 `CycleIncomplete`
    pub fn into_result(self) -> Result<()> {
        if self.is_clean() {
            Ok(())
        } else {
            Err(ReloaderError::CycleIncomplete {
                failed: self.failed_tenants(),
            })
        }
    }

    fn cycle_result(&self) -> CycleResult {
        if self.is_clean() {
            CycleResult::Success
        } else {
            CycleResult::Partial
        }
    }
}

/// 读取 → 聚合 → 逐个租户推送
pub struct Reconciler {
    source: Arc<dyn RuleSource>,
    aggregator: TenantAggregator,
    publisher: Arc<dyn TenantPublisher>,
    metrics: Arc<ReloaderMetrics>,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn RuleSource>,
        aggregator: TenantAggregator,
        publisher: Arc<dyn TenantPublisher>,
        metrics: Arc<ReloaderMetrics>,
    ) -> Self {
        Self {
            source,
            aggregator,
            publisher,
            metrics,
        }
    }

    /// 执行一次同步
    ///
    /// 读取或聚合失败时整个周期失败；单个租户失败只记录在报告里，
    /// 其余租户照常推送。
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        self.metrics.record_fetch();
        let resources = match self.source.list_rules().await {
            Ok(resources) => resources,
            Err(e) => {
                self.metrics.record_fetch_failure();
                self.metrics.record_cycle(CycleResult::Failed);
                return Err(e);
            }
        };

        let bundle = self.aggregator.aggregate(&resources).map_err(|e| {
            self.metrics.record_cycle(CycleResult::Failed);
            e
        })?;
        info!(
            resources = resources.len(),
            tenants = bundle.len(),
            "aggregated prometheus rules"
        );

        let mut report = CycleReport::default();
        for (tenant, rules) in &bundle {
            self.metrics.set_tenant_rule_groups(tenant, rules.len());

            match self.publisher.publish(tenant, rules).await {
                Ok(()) => {
                    info!(tenant = %tenant, groups = rules.len(), "synced rules for tenant");
                    self.metrics.record_rule_set(tenant);
                    report.synced.push(tenant.clone());
                }
                Err(e) => {
                    error!(tenant = %tenant, error = %e, "failed to sync rules for tenant");
                    self.metrics.record_rule_set_failure(tenant);
                    report.failures.push(TenantFailure {
                        tenant: tenant.clone(),
                        error: e,
                    });
                }
            }
        }

        self.metrics.record_cycle(report.cycle_result());
        Ok(report)
    }
}

/// 同步间隔与退避策略
#[derive(Debug, Clone)]
pub struct Schedule {
    pub interval: Duration,
    pub max_backoff: Duration,
    pub jitter: bool,
    /// 连续失败次数上限，0 表示不限
    pub max_consecutive_failures: u32,
}

// 2^16 倍之后必然超过上限
const MAX_BACKOFF_EXPONENT: u32 = 16;

impl Schedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_backoff: interval,
            jitter: false,
            max_consecutive_failures: 0,
        }
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max;
        self
    }

    /// 第 n 次连续失败后的基础等待时间：`interval * 2^(n-1)`，不超过 `max_backoff`
    pub fn base_delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return self.interval;
        }

        let exponent = (consecutive_failures - 1).min(MAX_BACKOFF_EXPONENT);
        let cap = self.max_backoff.max(self.interval);
        self.interval.saturating_mul(1 << exponent).min(cap)
    }

    /// 基础等待时间加上至多 10% 的随机抖动（仅失败后）
    pub fn delay_after(&self, consecutive_failures: u32) -> Duration {
        let base = self.base_delay(consecutive_failures);
        if !self.jitter || consecutive_failures == 0 {
            return base;
        }

        let max_jitter_ms = u64::try_from(base.as_millis() / 10).unwrap_or(u64::MAX);
        if max_jitter_ms == 0 {
            return base;
        }
        base.saturating_add(Duration::from_millis(rand::thread_rng().gen_range(0..=max_jitter_ms)))
    }

    fn gave_up(&self, consecutive_failures: u32) -> bool {
        self.max_consecutive_failures > 0 && consecutive_failures >= self.max_consecutive_failures
    }
}

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// 只执行一个周期，有租户失败则返回错误
    Once,
    /// 循环执行直到收到关闭信号
    Forever,
}

/// 同步主循环
pub struct SyncLoop {
    reconciler: Reconciler,
    schedule: Schedule,
    mode: RunMode,
}

impl SyncLoop {
    pub fn new(reconciler: Reconciler, schedule: Schedule, mode: RunMode) -> Self {
        Self {
            reconciler,
            schedule,
            mode,
        }
    }

    /// 正在执行的周期不会被打断；关闭信号只在周期之间的等待中生效。
    pub async fn run(&self, mut shutdown: broadcast::Receiver<ShutdownSignal>) -> Result<()> {
        let mut consecutive_failures: u32 = 0;

        loop {
            let outcome = self.reconciler.run_cycle().await;

            if self.mode == RunMode::Once {
                return outcome.and_then(CycleReport::into_result);
            }

            match outcome {
                Ok(report) => {
                    if !report.is_clean() {
                        warn!(failed = ?report.failed_tenants(), "sync cycle finished with failed tenants");
                    }
                    consecutive_failures = 0;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    error!(error = %e, consecutive_failures, "sync cycle failed");

                    if self.schedule.gave_up(consecutive_failures) {
                        return Err(ReloaderError::TooManyFailures {
                            count: consecutive_failures,
                            last: e.to_string(),
                        });
                    }
                }
            }

            let delay = self.schedule.delay_after(consecutive_failures);
            info!(seconds = delay.as_secs_f64(), "waiting for next sync cycle");

            if sleep_or_shutdown(delay, &mut shutdown).await {
                info!("sync loop stopped");
                return Ok(());
            }
        }
    }
}

/// 等待 `delay`；收到关闭信号返回 true
async fn sleep_or_shutdown(
    delay: Duration,
    shutdown: &mut broadcast::Receiver<ShutdownSignal>,
) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    tokio::select! {
        _ = &mut sleep => false,
        received = recv_shutdown(shutdown) => match received {
            Some(signal) => {
                info!(signal = signal.as_str(), "shutdown requested");
                true
            }
            // 发送端已全部释放，不会再有信号
            None => {
                sleep.await;
                false
            }
        },
    }
}
