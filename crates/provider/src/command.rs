//! Provider backed by a platform-supplied executable.
//!
//! Platforms that cannot be probed through sysfs alone ship a helper that
//! answers the two provider calls on stdout:
//!
//! | Invocation                  | Output                                        |
//! |-----------------------------|-----------------------------------------------|
//! | `<cmd> check`               | JSON array of `{name, bus, dev, fn, result}`  |
//! | `<cmd> aer <bus> <dev> <fn>`| JSON object `group -> field -> value`, or nothing |
//!
//! A non-zero exit status or a timeout fails the call.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use pcied_core::{AerStats, CheckResult, PciAddress};
use tokio::process::Command;

use crate::error::ProviderError;
use crate::DiagnosticProvider;

/// Default timeout for one helper invocation.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider that shells out to an external helper.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: PathBuf,
    timeout: Duration,
}

impl CommandProvider {
    /// Verify the helper exists and build a provider around it.
    pub async fn load(program: &Path, timeout: Duration) -> Result<Self, ProviderError> {
        let meta = tokio::fs::metadata(program)
            .await
            .map_err(|e| ProviderError::Unavailable {
                path: program.to_path_buf(),
                reason: e.to_string(),
            })?;

        if !meta.is_file() {
            return Err(ProviderError::Unavailable {
                path: program.to_path_buf(),
                reason: "not a regular file".to_string(),
            });
        }

        Ok(Self {
            program: program.to_path_buf(),
            timeout,
        })
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, ProviderError> {
        let command = format!("{} {}", self.program.display(), args.join(" "));
        tracing::debug!(command = %command, "Invoking provider helper");

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .args(args)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match output {
            Ok(Ok(output)) if output.status.success() => Ok(output.stdout),
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ProviderError::Command {
                    command,
                    details: format!(
                        "exit {}: {}",
                        output.status.code().unwrap_or(-1),
                        stderr.trim()
                    ),
                })
            }
            Ok(Err(e)) => Err(ProviderError::Command {
                command,
                details: e.to_string(),
            }),
            Err(_) => Err(ProviderError::Timeout {
                command,
                secs: self.timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl DiagnosticProvider for CommandProvider {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn pcie_check(&self) -> Result<Vec<CheckResult>, ProviderError> {
        let stdout = self.run(&["check"]).await?;
        serde_json::from_slice(&stdout).map_err(|source| ProviderError::Output {
            command: "check".to_string(),
            source,
        })
    }

    async fn aer_stats(&self, addr: &PciAddress) -> Result<AerStats, ProviderError> {
        let bus = format!("{:02x}", addr.bus);
        let dev = format!("{:02x}", addr.device);
        let func = format!("{:x}", addr.function);
        let stdout = self.run(&["aer", &bus, &dev, &func]).await?;
        parse_aer_output(&stdout)
    }
}

/// Decode helper AER output. Counter values may be JSON strings or numbers.
fn parse_aer_output(stdout: &[u8]) -> Result<AerStats, ProviderError> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(AerStats::new());
    }

    let raw: BTreeMap<String, BTreeMap<String, serde_json::Value>> =
        serde_json::from_slice(stdout).map_err(|source| ProviderError::Output {
            command: "aer".to_string(),
            source,
        })?;

    Ok(raw
        .into_iter()
        .map(|(group, fields)| {
            let fields = fields
                .into_iter()
                .map(|(field, value)| {
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (field, value)
                })
                .collect();
            (group, fields)
        })
        .collect())
}
