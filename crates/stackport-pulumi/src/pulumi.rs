//! pulumi CLI wrapper
//!
//! Wraps the pulumi CLI commands used for stack lifecycle operations.
//! Every command runs non-interactively inside a project directory that holds
//! the `Pulumi.yaml` of the stack being operated on.

use crate::error::{PulumiError, Result};
use serde::Deserialize;
use stackport_cloud::{ProgressObserver, StackOutputs};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

/// pulumi CLI wrapper
pub struct Pulumi {
    binary: String,
}

impl Default for Pulumi {
    fn default() -> Self {
        Self::new("pulumi")
    }
}

impl Pulumi {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Check if pulumi is installed and logged in
    pub async fn whoami(&self, cwd: &Path) -> Result<WhoAmI> {
        let output = self.run_command("-", &["whoami", "--json"], cwd).await?;
        let who: WhoAmI = serde_json::from_str(&output)?;
        Ok(who)
    }

    fn command(&self, args: &[&str], cwd: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        cmd.arg("--non-interactive");
        cmd.current_dir(cwd);
        cmd.env("PULUMI_SKIP_UPDATE_CHECK", "true");
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::debug!(
            "Running: {} {} (in {})",
            self.binary,
            args.join(" "),
            cwd.display()
        );
        cmd
    }

    fn spawn_error(&self, err: std::io::Error) -> PulumiError {
        if err.kind() == std::io::ErrorKind::NotFound {
            PulumiError::PulumiNotFound
        } else {
            PulumiError::IoError(err)
        }
    }

    async fn output(&self, args: &[&str], cwd: &Path) -> Result<Output> {
        self.command(args, cwd)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))
    }

    /// Run a pulumi command against `stack` and return stdout
    async fn run_command(&self, stack: &str, args: &[&str], cwd: &Path) -> Result<String> {
        let output = self.output(args, cwd).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PulumiError::classify(stack, &stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run a long pulumi command, forwarding each stdout line to `observer`
    async fn run_streaming(
        &self,
        stack: &str,
        args: &[&str],
        cwd: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<()> {
        let mut child = self
            .command(args, cwd)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                observer.on_output(&line);
            }
        }

        let status = child.wait().await?;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(PulumiError::classify(stack, &stderr));
        }
        Ok(())
    }

    /// Create a new stack in the project at `cwd`
    pub async fn stack_init(&self, stack: &str, cwd: &Path) -> Result<()> {
        let output = self.output(&["stack", "init", stack], cwd).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PulumiError::classify_init(stack, &stderr));
        }
        Ok(())
    }

    /// Select an existing stack in the project at `cwd`
    pub async fn stack_select(&self, stack: &str, cwd: &Path) -> Result<()> {
        self.run_command(stack, &["stack", "select", stack], cwd).await?;
        Ok(())
    }

    /// Remove a stack and its history; its resources must already be destroyed
    pub async fn stack_rm(&self, stack: &str, cwd: &Path) -> Result<()> {
        self.run_command(stack, &["stack", "rm", stack, "--yes"], cwd)
            .await?;
        Ok(())
    }

    /// Set a configuration value on a stack
    pub async fn config_set(
        &self,
        stack: &str,
        key: &str,
        value: &str,
        cwd: &Path,
    ) -> Result<()> {
        self.run_command(stack, &["config", "set", key, value, "--stack", stack], cwd)
            .await?;
        Ok(())
    }

    /// Deploy the program at `cwd` to the stack
    pub async fn up(&self, stack: &str, cwd: &Path, observer: &dyn ProgressObserver) -> Result<()> {
        self.run_streaming(
            stack,
            &["up", "--yes", "--skip-preview", "--stack", stack],
            cwd,
            observer,
        )
        .await
    }

    /// Tear down every resource of the stack
    pub async fn destroy(
        &self,
        stack: &str,
        cwd: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<()> {
        self.run_streaming(
            stack,
            &["destroy", "--yes", "--skip-preview", "--stack", stack],
            cwd,
            observer,
        )
        .await
    }

    /// List all stacks of the project at `cwd`
    pub async fn stack_ls(&self, cwd: &Path) -> Result<Vec<StackSummary>> {
        let output = self
            .run_command("-", &["stack", "ls", "--json"], cwd)
            .await?;

        if output.trim().is_empty() || output.trim() == "[]" {
            return Ok(Vec::new());
        }

        let stacks: Vec<StackSummary> = serde_json::from_str(&output)?;
        Ok(stacks)
    }

    /// Read the exported outputs of a stack
    pub async fn stack_output(&self, stack: &str, cwd: &Path) -> Result<StackOutputs> {
        let output = self
            .run_command(
                stack,
                &["stack", "output", "--json", "--show-secrets", "--stack", stack],
                cwd,
            )
            .await?;

        parse_outputs(&output)
    }
}

/// Parse `pulumi stack output --json` into string outputs
pub fn parse_outputs(json: &str) -> Result<StackOutputs> {
    if json.trim().is_empty() {
        return Ok(StackOutputs::new());
    }

    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
    Ok(raw
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect())
}

/// Output of `pulumi whoami --json`
#[derive(Debug, Clone, Deserialize)]
pub struct WhoAmI {
    pub user: String,
    #[serde(default)]
    pub organizations: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One entry of `pulumi stack ls --json`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackSummary {
    pub name: String,
    #[serde(default)]
    pub current: bool,
    #[serde(default)]
    pub update_in_progress: bool,
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default)]
    pub resource_count: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
}

impl StackSummary {
    /// Stack name without any `org/project/` qualification
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stack_ls() {
        let json = r#"[
            {
                "name": "demo",
                "current": true,
                "lastUpdate": "2026-10-01T09:00:00.000Z",
                "updateInProgress": false,
                "resourceCount": 5,
                "url": "https://app.pulumi.com/acme/stackport/demo"
            },
            {
                "name": "acme/stackport/dev-box",
                "current": false,
                "updateInProgress": true
            }
        ]"#;

        let stacks: Vec<StackSummary> = serde_json::from_str(json).unwrap();
        assert_eq!(stacks.len(), 2);
        assert_eq!(stacks[0].short_name(), "demo");
        assert_eq!(stacks[0].resource_count, Some(5));
        assert_eq!(stacks[1].short_name(), "dev-box");
        assert!(stacks[1].update_in_progress);
        assert!(stacks[1].last_update.is_none());
    }

    #[test]
    fn test_parse_outputs_stringifies_values() {
        let json = r#"{
            "website_url": "demo.s3-website-us-east-1.amazonaws.com",
            "port": 22,
            "tags": ["a", "b"],
            "missing": null
        }"#;

        let outputs = parse_outputs(json).unwrap();
        assert_eq!(
            outputs.get("website_url"),
            Some("demo.s3-website-us-east-1.amazonaws.com")
        );
        assert_eq!(outputs.get("port"), Some("22"));
        assert_eq!(outputs.get("tags"), Some(r#"["a","b"]"#));
        assert!(!outputs.contains("missing"));
    }

    #[test]
    fn test_parse_outputs_empty() {
        assert!(parse_outputs("").unwrap().is_empty());
        assert!(parse_outputs("{}").unwrap().is_empty());
    }

    #[test]
    fn test_parse_whoami() {
        let json = r#"{"user":"alice","organizations":["alice","acme"],"url":"https://app.pulumi.com/alice"}"#;
        let who: WhoAmI = serde_json::from_str(json).unwrap();
        assert_eq!(who.user, "alice");
        assert_eq!(who.organizations, vec!["alice", "acme"]);
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let pulumi = Pulumi::new("stackport-no-such-pulumi-binary");
        let dir = tempfile::tempdir().unwrap();

        let result = pulumi.stack_ls(dir.path()).await;
        assert!(matches!(result, Err(PulumiError::PulumiNotFound)));
    }
}
