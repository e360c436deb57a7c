//! 测试用的命令执行器

use crate::command::{CommandError, CommandOutput, CommandRunner, Invocation};
use async_trait::async_trait;
use std::sync::Mutex;

type Matcher = Box<dyn Fn(&[&str]) -> bool + Send + Sync>;

/// 记录每次调用；按规则返回输出或失败
#[derive(Default)]
pub struct ScriptedRunner {
    calls: Mutex<Vec<Vec<String>>>,
    rule_files: Mutex<Vec<String>>,
    rule_file_paths: Mutex<Vec<String>>,
    stdout: Mutex<Vec<(Matcher, String)>>,
    failures: Mutex<Vec<Matcher>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// 参数以 `prefix` 开头的调用返回 `stdout`
    pub fn respond(self, prefix: &[&str], stdout: &str) -> Self {
        let prefix: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
        self.stdout.lock().unwrap().push((
            Box::new(move |argv: &[&str]| starts_with(argv, &prefix)),
            stdout.to_string(),
        ));
        self
    }

    /// 参数以 `prefix` 开头的调用失败
    pub fn fail_on(self, prefix: &[&str]) -> Self {
        let prefix: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
        self.failures
            .lock()
            .unwrap()
            .push(Box::new(move |argv: &[&str]| starts_with(argv, &prefix)));
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// 每次调用的前两个参数，例如 `context api`、`login --api`
    pub fn verbs(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|argv| argv.iter().take(2).cloned().collect::<Vec<_>>().join(" "))
            .collect()
    }

    pub fn count_matching(&self, prefix: &[&str]) -> usize {
        self.calls()
            .iter()
            .filter(|argv| {
                let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
                let prefix: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
                starts_with(&argv, &prefix)
            })
            .count()
    }

    /// `--rule.file` 在调用时的内容
    pub fn rule_files(&self) -> Vec<String> {
        self.rule_files.lock().unwrap().clone()
    }

    pub fn rule_file_paths(&self) -> Vec<String> {
        self.rule_file_paths.lock().unwrap().clone()
    }
}

fn starts_with(argv: &[&str], prefix: &[String]) -> bool {
    argv.len() >= prefix.len() && argv.iter().zip(prefix).all(|(a, p)| *a == p.as_str())
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, CommandError> {
        let argv = invocation.argv();
        self.calls
            .lock()
            .unwrap()
            .push(argv.iter().map(|s| s.to_string()).collect());

        if let Some(pos) = argv.iter().position(|a| *a == "--rule.file") {
            let path = argv[pos + 1];
            let content = std::fs::read_to_string(path).unwrap_or_default();
            self.rule_files.lock().unwrap().push(content);
            self.rule_file_paths.lock().unwrap().push(path.to_string());
        }

        if self.failures.lock().unwrap().iter().any(|m| m(argv.as_slice())) {
            return Err(CommandError::Exit {
                program: invocation.program().to_string(),
                code: Some(1),
                output: "scripted failure".to_string(),
            });
        }

        let stdout = self
            .stdout
            .lock()
            .unwrap()
            .iter()
            .find(|(m, _)| m(argv.as_slice()))
            .map(|(_, out)| out.clone())
            .unwrap_or_default();

        Ok(CommandOutput {
            stdout,
            stderr: String::new(),
        })
    }
}
