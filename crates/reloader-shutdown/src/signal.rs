use std::io;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::info;

/// 关闭原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGTERM
    Term,

    /// SIGINT / Ctrl+C
    Interrupt,

    /// 进程内触发，例如同步循环已退出
    Manual,
}

impl ShutdownSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownSignal::Term => "SIGTERM",
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Manual => "manual",
        }
    }
}

/// 把系统信号广播给同步循环和内部 HTTP 服务
#[derive(Clone)]
pub struct SignalHandler {
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
}

impl SignalHandler {
    /// 返回的 Receiver 在信号到达前创建，不会漏掉信号
    pub fn new() -> (Self, broadcast::Receiver<ShutdownSignal>) {
        let (shutdown_tx, rx) = broadcast::channel(16);
        (Self { shutdown_tx }, rx)
    }

    /// 等待第一个 SIGTERM / SIGINT 并广播
    pub async fn wait_for_system_signal(&self) -> io::Result<ShutdownSignal> {
        let received = next_system_signal().await?;
        info!(signal = received.as_str(), "Received shutdown signal");
        let _ = self.shutdown_tx.send(received);
        Ok(received)
    }

    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(ShutdownSignal::Manual);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownSignal> {
        self.shutdown_tx.subscribe()
    }
}

#[cfg(unix)]
async fn next_system_signal() -> io::Result<ShutdownSignal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(tokio::select! {
        _ = sigterm.recv() => ShutdownSignal::Term,
        _ = sigint.recv() => ShutdownSignal::Interrupt,
    })
}

#[cfg(not(unix))]
async fn next_system_signal() -> io::Result<ShutdownSignal> {
    tokio::signal::ctrl_c().await?;
    Ok(ShutdownSignal::Interrupt)
}

/// 等待下一个关闭信号
///
/// 所有发送端都已释放时返回 None，之后不会再有信号。
pub async fn recv_shutdown(rx: &mut broadcast::Receiver<ShutdownSignal>) -> Option<ShutdownSignal> {
    loop {
        match rx.recv().await {
            Ok(signal) => return Some(signal),
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return None,
        }
    }
}
