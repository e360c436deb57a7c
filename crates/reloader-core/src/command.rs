use async_trait::async_trait;
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// 外部命令执行错误
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}: {output}", exit_code_display(.code))]
    Exit {
        program: String,
        code: Option<i32>,
        output: String,
    },

    #[error("{program} timed out after {}s", .after.as_secs())]
    Timeout { program: String, after: Duration },
}

fn exit_code_display(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "signal".to_string(),
    }
}

#[derive(Clone)]
enum Arg {
    Plain(String),
    Secret(String),
}

impl Arg {
    fn value(&self) -> &str {
        match self {
            Arg::Plain(value) | Arg::Secret(value) => value,
        }
    }
}

/// 一次外部命令调用
///
/// `Display` 输出可直接写日志，secret 参数显示为 `***`。
#[derive(Clone)]
pub struct Invocation {
    program: String,
    args: Vec<Arg>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Plain(arg.into()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|a| Arg::Plain(a.into())));
        self
    }

    /// 追加 `flag value`，value 不会出现在日志里
    pub fn secret(mut self, flag: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push(Arg::Plain(flag.into()));
        self.args.push(Arg::Secret(value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// 真实参数（含 secret）
    pub fn argv(&self) -> Vec<&str> {
        self.args.iter().map(Arg::value).collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            match arg {
                Arg::Plain(value) => write!(f, " {}", value)?,
                Arg::Secret(_) => f.write_str(" ***")?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invocation({})", self)
    }
}

/// 命令输出
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// 外部命令执行器
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// 执行命令，退出码非 0 时返回错误
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError>;
}

/// 基于 `tokio::process` 的执行器
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// 超时后子进程会被 kill
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError> {
        debug!(command = %invocation, "running command");

        let mut command = Command::new(invocation.program());
        command
            .args(invocation.argv())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(after) => tokio::time::timeout(after, command.output())
                .await
                .map_err(|_| CommandError::Timeout {
                    program: invocation.program().to_string(),
                    after,
                })?,
            None => command.output().await,
        }
        .map_err(|source| CommandError::Spawn {
            program: invocation.program().to_string(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let detail = if stderr.trim().is_empty() { &stdout } else { &stderr };
            return Err(CommandError::Exit {
                program: invocation.program().to_string(),
                code: output.status.code(),
                output: detail.trim().to_string(),
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display_hides_secret() {
        let invocation = Invocation::new("obsctl")
            .args(["login", "--api", "api"])
            .secret("--oidc.client-secret", "hunter2")
            .arg("--tenant")
            .arg("rhobs");

        assert_eq!(
            invocation.to_string(),
            "obsctl login --api api --oidc.client-secret *** --tenant rhobs"
        );
        assert_eq!(
            invocation.argv(),
            vec!["login", "--api", "api", "--oidc.client-secret", "hunter2", "--tenant", "rhobs"]
        );
    }

    #[test]
    fn test_exit_error_message() {
        let err = CommandError::Exit {
            program: "oc".to_string(),
            code: Some(1),
            output: "forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "oc exited with status 1: forbidden");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_captures_stdout() {
        let runner = ProcessRunner::new();
        let output = runner
            .run(&Invocation::new("sh").args(["-c", "echo '{\"items\": []}'"]))
            .await
            .unwrap();

        assert_eq!(output.stdout.trim(), r#"{"items": []}"#);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_non_zero_exit() {
        let runner = ProcessRunner::new();
        let err = runner
            .run(&Invocation::new("sh").args(["-c", "echo denied >&2; exit 3"]))
            .await
            .unwrap_err();

        match err {
            CommandError::Exit { code, output, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(output, "denied");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_process_runner_missing_binary() {
        let runner = ProcessRunner::new();
        let err = runner
            .run(&Invocation::new("definitely-not-a-real-binary-for-reloader"))
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_timeout() {
        let runner = ProcessRunner::new().with_timeout(Duration::from_millis(100));
        let err = runner
            .run(&Invocation::new("sh").args(["-c", "sleep 5"]))
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Timeout { .. }));
    }
}
