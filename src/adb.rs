//! ADB bridge: `adb connect` / `adb disconnect` as a subprocess.
//!
//! Stateless: every call spawns the executable, waits with a deadline and
//! inspects the exit status and output. The endpoint is passed through as-is.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::types::{AdbConfig, AdbEndpoint, BridgeError};

/// `adb connect` exits 0 on these; the output is the only failure signal.
const CONNECT_FAILURE_MARKERS: &[&str] = &["failed to connect", "cannot connect", "unable to connect"];

/// Local ADB operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdbBridge: Send + Sync {
    async fn connect(&self, endpoint: &AdbEndpoint) -> Result<(), BridgeError>;

    async fn disconnect(&self, endpoint: &AdbEndpoint) -> Result<(), BridgeError>;
}

/// [`AdbBridge`] backed by the `adb` executable.
#[derive(Debug, Clone)]
pub struct AdbCli {
    program: PathBuf,
    timeout: Duration,
}

impl AdbCli {
    pub fn new(config: &AdbConfig) -> Self {
        Self {
            program: config.program.clone(),
            timeout: config.command_timeout,
        }
    }

    async fn run(&self, subcommand: &str, endpoint: &AdbEndpoint) -> Result<String, BridgeError> {
        tracing::debug!(
            program = %self.program.display(),
            subcommand,
            endpoint = %endpoint,
            "running adb"
        );

        let mut cmd = Command::new(&self.program);
        cmd.arg(subcommand)
            .arg(endpoint.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_elapsed) => {
                tracing::warn!(subcommand, endpoint = %endpoint, "adb timed out");
                return Err(BridgeError::Timeout(self.timeout));
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BridgeError::ExecutionFailed(format!(
                    "adb executable '{}' not found; install Android platform-tools or set ADB_PATH",
                    self.program.display()
                )));
            }
            Ok(Err(e)) => {
                return Err(BridgeError::ExecutionFailed(format!(
                    "failed to spawn '{}': {}",
                    self.program.display(),
                    e
                )));
            }
            Ok(Ok(output)) => output,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            let detail = if stderr.is_empty() { &stdout } else { &stderr };
            return Err(BridgeError::ExecutionFailed(format!(
                "adb {} {} exited with {}: {}",
                subcommand, endpoint, code, detail
            )));
        }

        Ok(stdout)
    }
}

#[async_trait]
impl AdbBridge for AdbCli {
    async fn connect(&self, endpoint: &AdbEndpoint) -> Result<(), BridgeError> {
        let stdout = self.run("connect", endpoint).await?;
        let lowered = stdout.to_lowercase();
        if CONNECT_FAILURE_MARKERS.iter().any(|m| lowered.contains(m)) {
            return Err(BridgeError::ExecutionFailed(stdout));
        }
        tracing::info!(endpoint = %endpoint, "adb connected");
        Ok(())
    }

    async fn disconnect(&self, endpoint: &AdbEndpoint) -> Result<(), BridgeError> {
        self.run("disconnect", endpoint).await?;
        tracing::info!(endpoint = %endpoint, "adb disconnected");
        Ok(())
    }
}
