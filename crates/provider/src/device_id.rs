//! Hardware device ID lookup.

use std::io::ErrorKind;
use std::path::PathBuf;

use pcied_core::PciAddress;

use crate::error::ProviderError;

/// Reads the per-device `device` file under the PCI sysfs directory.
#[derive(Debug, Clone)]
pub struct DeviceIdReader {
    root: PathBuf,
}

impl DeviceIdReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Device ID of `addr`, e.g. `1533` for a file containing `0x1533\n`.
    ///
    /// Returns `Ok(None)` when the file does not exist, which is the normal
    /// state of a device that is not on the bus.
    pub async fn read_id(&self, addr: &PciAddress) -> Result<Option<String>, ProviderError> {
        let path = self.root.join(addr.bus_info()).join("device");
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ProviderError::Io { path, source }),
        };

        let trimmed = raw.trim();
        let id = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if id.is_empty() {
            return Ok(None);
        }
        Ok(Some(id.to_string()))
    }
}
