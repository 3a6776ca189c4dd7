//! Diagnostic providers.
//!
//! A provider answers two questions for the monitor: which of the expected
//! PCIe devices are present right now, and what AER counters a given device
//! reports. Implementations are chosen once at startup:
//!
//! - [`SysfsProvider`] checks an expected-device list against
//!   `/sys/bus/pci/devices` and reads the kernel's AER counter files;
//! - [`CommandProvider`] delegates both calls to a platform-supplied
//!   executable that speaks JSON.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use pcied_core::{AerStats, CheckResult, PciAddress};

pub mod command;
pub mod device_id;
pub mod error;
pub mod platform_config;
pub mod sysfs;

pub use command::CommandProvider;
pub use device_id::DeviceIdReader;
pub use error::ProviderError;
pub use platform_config::ExpectedDevice;
pub use sysfs::SysfsProvider;

/// Default location of the kernel's PCI device directory.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/bus/pci/devices";

/// Capability interface over the hardware diagnostic backend.
#[async_trait]
pub trait DiagnosticProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Check every expected device and report pass/fail for each.
    async fn pcie_check(&self) -> Result<Vec<CheckResult>, ProviderError>;

    /// AER counter snapshot for one device. An empty map means the device
    /// exposes no counters.
    async fn aer_stats(&self, addr: &PciAddress) -> Result<AerStats, ProviderError>;
}

/// Which provider implementation to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Sysfs,
    Command,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sysfs => "sysfs",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sysfs" => Ok(Self::Sysfs),
            "command" => Ok(Self::Command),
            other => Err(format!(
                "Unknown provider '{other}'. Must be one of: sysfs, command"
            )),
        }
    }
}
