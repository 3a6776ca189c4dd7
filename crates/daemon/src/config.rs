use std::path::PathBuf;
use std::time::Duration;

use pcied_provider::command::DEFAULT_COMMAND_TIMEOUT;
use pcied_provider::{ProviderKind, DEFAULT_SYSFS_ROOT};

/// Default seconds between reconciliation cycles.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

const DEFAULT_PLATFORM_CONFIG: &str = "/usr/share/pcied/pcie.yaml";
const DEFAULT_STATE_DIR: &str = "/var/run/pcied";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is required when {reason}")]
    Missing { var: &'static str, reason: String },

    #[error("Invalid {var}='{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Daemon configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Wait between cycles.
    pub interval: Duration,
    /// Which diagnostic provider to load.
    pub provider: ProviderKind,
    /// Expected-device list for the sysfs provider.
    pub platform_config: PathBuf,
    /// PCI device directory, used for presence checks and device IDs.
    pub sysfs_root: PathBuf,
    /// Helper executable for the command provider.
    pub provider_command: Option<PathBuf>,
    /// Timeout per helper invocation.
    pub provider_timeout: Duration,
    /// Directory holding the file-backed tables.
    pub state_dir: PathBuf,
    /// Whether detach-lifecycle hints apply to this deployment.
    pub detach_tracking: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            provider: ProviderKind::Sysfs,
            platform_config: PathBuf::from(DEFAULT_PLATFORM_CONFIG),
            sysfs_root: PathBuf::from(DEFAULT_SYSFS_ROOT),
            provider_command: None,
            provider_timeout: DEFAULT_COMMAND_TIMEOUT,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            detach_tracking: false,
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                       | Default                      |
    /// |-------------------------------|------------------------------|
    /// | `PCIED_INTERVAL_SECS`         | `60`                         |
    /// | `PCIED_PROVIDER`              | `sysfs`                      |
    /// | `PCIED_PLATFORM_CONFIG`       | `/usr/share/pcied/pcie.yaml` |
    /// | `PCIED_SYSFS_ROOT`            | `/sys/bus/pci/devices`       |
    /// | `PCIED_PROVIDER_COMMAND`      | --                           |
    /// | `PCIED_PROVIDER_TIMEOUT_SECS` | `30`                         |
    /// | `PCIED_STATE_DIR`             | `/var/run/pcied`             |
    /// | `PCIED_DETACH_TRACKING`       | `false`                      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let interval = match get("PCIED_INTERVAL_SECS") {
            Some(raw) => Duration::from_secs(parse_positive_secs("PCIED_INTERVAL_SECS", &raw)?),
            None => defaults.interval,
        };

        let provider = match get("PCIED_PROVIDER") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                var: "PCIED_PROVIDER",
                value: raw.clone(),
                reason,
            })?,
            None => defaults.provider,
        };

        let provider_command = get("PCIED_PROVIDER_COMMAND")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
        if provider == ProviderKind::Command && provider_command.is_none() {
            return Err(ConfigError::Missing {
                var: "PCIED_PROVIDER_COMMAND",
                reason: "PCIED_PROVIDER=command".to_string(),
            });
        }

        let provider_timeout = match get("PCIED_PROVIDER_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_positive_secs(
                "PCIED_PROVIDER_TIMEOUT_SECS",
                &raw,
            )?),
            None => defaults.provider_timeout,
        };

        let detach_tracking = match get("PCIED_DETACH_TRACKING") {
            Some(raw) => parse_bool("PCIED_DETACH_TRACKING", &raw)?,
            None => defaults.detach_tracking,
        };

        Ok(Self {
            interval,
            provider,
            platform_config: get("PCIED_PLATFORM_CONFIG")
                .map(PathBuf::from)
                .unwrap_or(defaults.platform_config),
            sysfs_root: get("PCIED_SYSFS_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.sysfs_root),
            provider_command,
            provider_timeout,
            state_dir: get("PCIED_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_dir),
            detach_tracking,
        })
    }
}

fn parse_positive_secs(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        Ok(secs) => Ok(secs),
        Err(e) => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: "expected true/false".to_string(),
        }),
    }
}
