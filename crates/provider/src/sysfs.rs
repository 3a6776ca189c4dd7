//! Sysfs-backed provider.
//!
//! A device passes its check when `<root>/0000:BB:DD.F` exists. AER counters
//! come from the per-device files the kernel exposes when the port has AER
//! enabled:
//!
//! ```text
//! aer_dev_correctable    RxErr 0\nBadTLP 0\n...\nTOTAL_ERR_COR 0
//! aer_dev_fatal          Undefined 0\nDLP 0\n...\nTOTAL_ERR_FATAL 0
//! aer_dev_nonfatal       Undefined 0\nDLP 0\n...\nTOTAL_ERR_NONFATAL 0
//! ```

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pcied_core::{AerStats, CheckOutcome, CheckResult, PciAddress};

use crate::error::ProviderError;
use crate::platform_config::{self, ExpectedDevice};
use crate::DiagnosticProvider;

/// AER group name and the sysfs file backing it.
const AER_FILES: &[(&str, &str)] = &[
    ("correctable", "aer_dev_correctable"),
    ("fatal", "aer_dev_fatal"),
    ("non_fatal", "aer_dev_nonfatal"),
];

/// Provider that inspects the kernel's PCI device directory directly.
#[derive(Debug, Clone)]
pub struct SysfsProvider {
    root: PathBuf,
    expected: Vec<ExpectedDevice>,
}

impl SysfsProvider {
    pub fn new(root: impl Into<PathBuf>, expected: Vec<ExpectedDevice>) -> Self {
        Self {
            root: root.into(),
            expected,
        }
    }

    /// Load the expected-device list from `config_path`.
    pub async fn load(config_path: &Path, root: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        let expected = platform_config::load(config_path).await?;
        if expected.is_empty() {
            tracing::warn!(
                config = %config_path.display(),
                "Platform config lists no devices; every check will pass trivially",
            );
        }
        Ok(Self::new(root, expected))
    }

    pub fn expected(&self) -> &[ExpectedDevice] {
        &self.expected
    }

    fn device_dir(&self, addr: &PciAddress) -> PathBuf {
        self.root.join(addr.bus_info())
    }

    async fn check_one(&self, device: &ExpectedDevice) -> CheckOutcome {
        let addr = match PciAddress::from_hex(&device.bus, &device.dev, &device.func) {
            Ok(addr) => addr,
            Err(e) => {
                tracing::warn!(name = %device.name, error = %e, "Unparseable expected device");
                return CheckOutcome::Failed;
            }
        };

        match tokio::fs::try_exists(self.device_dir(&addr)).await {
            Ok(true) => CheckOutcome::Passed,
            Ok(false) => CheckOutcome::Failed,
            Err(e) => {
                tracing::warn!(bus_info = %addr, error = %e, "Cannot stat device directory");
                CheckOutcome::Failed
            }
        }
    }
}

#[async_trait]
impl DiagnosticProvider for SysfsProvider {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    async fn pcie_check(&self) -> Result<Vec<CheckResult>, ProviderError> {
        let mut results = Vec::with_capacity(self.expected.len());
        for device in &self.expected {
            let result = self.check_one(device).await;
            results.push(CheckResult {
                name: device.name.clone(),
                bus: device.bus.clone(),
                dev: device.dev.clone(),
                func: device.func.clone(),
                result,
            });
        }
        Ok(results)
    }

    async fn aer_stats(&self, addr: &PciAddress) -> Result<AerStats, ProviderError> {
        let dir = self.device_dir(addr);
        let mut stats = AerStats::new();

        for (group, file) in AER_FILES {
            let path = dir.join(file);
            let raw = match tokio::fs::read_to_string(&path).await {
                Ok(raw) => raw,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(source) => return Err(ProviderError::Io { path, source }),
            };

            let fields = parse_counters(&raw);
            if !fields.is_empty() {
                stats.insert((*group).to_string(), fields);
            }
        }

        Ok(stats)
    }
}

/// Parse `<name> <count>` lines; anything else is ignored.
fn parse_counters(raw: &str) -> BTreeMap<String, String> {
    raw.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(name), Some(count), None) => Some((name.to_string(), count.to_string())),
                _ => None,
            }
        })
        .collect()
}
