use crate::cli::Args;
use crate::internal;
use anyhow::{anyhow, Result};
use reloader_config::{LoggingConfig, ReloaderConfig, SyncConfig};
use reloader_core::{
    CliRuleSource, CommandRunner, CredentialStore, ObsctlClient, ObsctlPublisher, ObsctlSettings,
    ProcessRunner, Reconciler, RunMode, Schedule, SyncLoop, TenantAggregator,
};
use reloader_logging::{init_logging, LogFormat, LogLevel, LoggingSettings};
use reloader_metrics::ReloaderMetrics;
use reloader_shutdown::SignalHandler;
use reloader_types::ClientCredentials;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// 服务入口：加载配置、初始化日志与指标、运行同步循环
pub async fn run(args: Args) -> Result<()> {
    let config = args.load_config()?;
    init_logging(&logging_settings(&config.logging)?)?;

    let mode = run_mode(&config.sync);
    info!(
        url = %config.observatorium.url,
        context = %config.observatorium.context_name,
        source = %config.source.command,
        namespace = config.source.namespace.as_deref().unwrap_or("<all>"),
        managed_tenants = ?config.tenants.managed,
        ?mode,
        "starting obsctl-reloader"
    );

    let metrics = Arc::new(ReloaderMetrics::new()?);

    let (signal_handler, shutdown_rx) = SignalHandler::new();
    let signals = signal_handler.clone();
    tokio::spawn(async move {
        if let Err(e) = signals.wait_for_system_signal().await {
            error!(error = %e, "failed to install signal handlers");
        }
    });

    let server = if config.server.enabled && mode == RunMode::Forever {
        let addr: SocketAddr = config.server.listen.parse()?;
        Some(tokio::spawn(internal::serve(
            addr,
            metrics.clone(),
            signal_handler.subscribe(),
        )))
    } else {
        None
    };

    let runner: Arc<dyn CommandRunner> = Arc::new(process_runner(&config.sync));
    let sync_loop = build_sync_loop(&config, runner, metrics);
    let result = sync_loop.run(shutdown_rx).await;

    // 同步循环结束后停止内部 HTTP 服务
    signal_handler.trigger_shutdown();
    if let Some(server) = server {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "internal server stopped with error"),
            Err(e) => warn!(error = %e, "internal server task failed"),
        }
    }

    result?;
    info!("obsctl-reloader stopped");
    Ok(())
}

pub fn logging_settings(config: &LoggingConfig) -> Result<LoggingSettings> {
    let level: LogLevel = config.level.parse().map_err(|e: String| anyhow!(e))?;
    let format: LogFormat = config.format.parse().map_err(|e: String| anyhow!(e))?;

    Ok(LoggingSettings {
        level,
        format,
        ..Default::default()
    })
}

pub fn run_mode(config: &SyncConfig) -> RunMode {
    if config.once {
        RunMode::Once
    } else {
        RunMode::Forever
    }
}

pub fn schedule(config: &SyncConfig) -> Schedule {
    Schedule::new(Duration::from_secs(config.sleep_duration_seconds))
        .with_max_backoff(Duration::from_secs(config.max_backoff_seconds))
        .with_jitter(true)
        .with_max_consecutive_failures(config.max_consecutive_failures)
}

pub fn process_runner(config: &SyncConfig) -> ProcessRunner {
    match config.command_timeout_seconds {
        0 => ProcessRunner::new(),
        seconds => ProcessRunner::new().with_timeout(Duration::from_secs(seconds)),
    }
}

pub fn obsctl_settings(config: &ReloaderConfig) -> ObsctlSettings {
    ObsctlSettings {
        binary: config.obsctl.binary.clone(),
        context_name: config.observatorium.context_name.clone(),
        api_url: config.observatorium.url.clone(),
        audience: config.oidc.audience.clone(),
        issuer_url: config.oidc.issuer_url.clone(),
        switch_target: config.observatorium.switch_target,
        cli_logs: config.obsctl.cli_logs,
    }
}

pub fn credential_store(config: &ReloaderConfig) -> CredentialStore {
    let default = ClientCredentials::new(&config.oidc.client_id, &config.oidc.client_secret);
    config
        .oidc
        .tenants
        .iter()
        .fold(CredentialStore::new(default), |store, (tenant, credentials)| {
            store.with_tenant(tenant, credentials.clone())
        })
}

/// 按配置组装读取、聚合、推送三部分
pub fn build_sync_loop(
    config: &ReloaderConfig,
    runner: Arc<dyn CommandRunner>,
    metrics: Arc<ReloaderMetrics>,
) -> SyncLoop {
    let source = CliRuleSource::new(runner.clone(), &config.source.command, &config.source.resource)
        .with_namespace(config.source.namespace.clone());
    let aggregator = TenantAggregator::new().with_managed_tenants(config.tenants.managed.iter());
    let publisher = ObsctlPublisher::new(
        ObsctlClient::new(runner, obsctl_settings(config)),
        credential_store(config),
    );

    let reconciler = Reconciler::new(Arc::new(source), aggregator, Arc::new(publisher), metrics);
    SyncLoop::new(reconciler, schedule(&config.sync), run_mode(&config.sync))
}
