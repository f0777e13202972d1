/// Wrapper around external CLI invocations (gcloud, kubectl)
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished command
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandOutput {
    fn from_output(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        }
    }
}

/// Builder for running an external program with captured output
pub struct CommandBuilder {
    program: String,
    command: Command,
    context_msg: Option<String>,
}

impl CommandBuilder {
    pub fn new(program: &str) -> Self {
        let mut command = Command::new(program);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Self {
            program: program.to_string(),
            command,
            context_msg: None,
        }
    }

    /// Add a single argument
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.command.arg(arg);
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.command.args(args);
        self
    }

    /// Add `--flag value`
    pub fn flag<V: AsRef<OsStr>>(self, flag: &str, value: V) -> Self {
        self.arg(flag).arg(value)
    }

    /// Set an environment variable
    pub fn env<K, V>(mut self, key: K, val: V) -> Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.command.env(key, val);
        self
    }

    /// Point kubectl at a kubeconfig
    pub fn kubeconfig(self, path: &Path) -> Self {
        self.env("KUBECONFIG", path)
    }

    /// Message prefixed to any failure
    pub fn context<S: Into<String>>(mut self, msg: S) -> Self {
        self.context_msg = Some(msg.into());
        self
    }

    /// Execute and return raw output, whatever the exit status
    pub async fn output(mut self) -> Result<CommandOutput> {
        debug!("Running {} {:?}", self.program, self.command.as_std().get_args());

        let program = self.program.clone();
        let output = self
            .command
            .output()
            .await
            .with_context(|| format!("Failed to execute {}", program));

        let output = match self.context_msg {
            Some(ctx) => output.context(ctx)?,
            None => output?,
        };

        Ok(CommandOutput::from_output(output))
    }

    /// Execute and return stdout, failing on a non-zero exit status
    pub async fn run(self) -> Result<String> {
        let stdout = self.run_unless(|_| false).await?;
        Ok(stdout.unwrap_or_default())
    }

    /// Execute and return stdout, or `None` when the command failed with a stderr that
    /// `tolerated` accepts. Any other failure is an error.
    pub async fn run_unless<P>(self, tolerated: P) -> Result<Option<String>>
    where
        P: Fn(&str) -> bool,
    {
        let program = self.program.clone();
        let context_msg = self.context_msg.clone();
        let output = self.output().await?;

        if output.success {
            return Ok(Some(output.stdout));
        }

        if tolerated(&output.stderr) {
            debug!("{} failed with tolerated error: {}", program, output.stderr.trim());
            return Ok(None);
        }

        let err = anyhow::anyhow!("{} failed: {}", program, output.stderr.trim());
        match context_msg {
            Some(ctx) => Err(err.context(ctx)),
            None => Err(err),
        }
    }

    /// Execute and parse stdout as JSON
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let program = self.program.clone();
        let stdout = self.run().await?;
        serde_json::from_str(&stdout)
            .with_context(|| format!("Failed to parse {} output as JSON", program))
    }
}

/// Check if a command-line tool is installed
pub async fn check_tool_installed(
    tool_name: &str,
    version_args: &[&str],
    install_url: &str,
) -> Result<()> {
    let output = CommandBuilder::new(tool_name)
        .args(version_args)
        .output()
        .await;

    match output {
        Ok(out) if out.success => Ok(()),
        _ => anyhow::bail!(
            "{} is not installed or not in PATH. Please install from {}",
            tool_name,
            install_url
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_returns_stdout() {
        let stdout = CommandBuilder::new("echo")
            .arg("gke")
            .context("Testing echo command")
            .run()
            .await
            .unwrap();

        assert_eq!(stdout.trim(), "gke");
    }

    #[tokio::test]
    async fn test_env_and_flag() {
        let stdout = CommandBuilder::new("sh")
            .flag("-c", "echo $CLOUDSDK_CORE_PROJECT")
            .env("CLOUDSDK_CORE_PROJECT", "my-proj")
            .run()
            .await
            .unwrap();

        assert!(stdout.contains("my-proj"));
    }

    #[tokio::test]
    async fn test_failure_carries_stderr_and_context() {
        let err = CommandBuilder::new("sh")
            .flag("-c", "echo cluster not found >&2; exit 1")
            .context("Failed to describe cluster")
            .run()
            .await
            .unwrap_err();

        let msg = format!("{:#}", err);
        assert!(msg.contains("Failed to describe cluster"));
        assert!(msg.contains("cluster not found"));
    }

    #[tokio::test]
    async fn test_run_unless_tolerates_matching_failure() {
        let stdout = CommandBuilder::new("sh")
            .flag("-c", "echo 'code=404, message=Not found' >&2; exit 1")
            .run_unless(|stderr| stderr.contains("code=404"))
            .await
            .unwrap();
        assert!(stdout.is_none());

        let err = CommandBuilder::new("sh")
            .flag("-c", "echo 'code=403, message=Permission denied' >&2; exit 1")
            .context("Failed to describe cluster")
            .run_unless(|stderr| stderr.contains("code=404"))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Permission denied"));
    }

    #[tokio::test]
    async fn test_json_output() {
        #[derive(serde::Deserialize)]
        struct Status {
            status: String,
        }

        let status: Status = CommandBuilder::new("echo")
            .arg(r#"{"status": "RUNNING"}"#)
            .json()
            .await
            .unwrap();

        assert_eq!(status.status, "RUNNING");
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let result =
            check_tool_installed("definitely-not-a-real-tool", &["--version"], "https://x").await;
        assert!(result.is_err());
    }
}
