//! Expected-device list for the sysfs provider.
//!
//! The platform ships a YAML list of the PCIe devices that must be present:
//!
//! ```yaml
//! - bus: '00'
//!   dev: '1f'
//!   fn: '2'
//!   id: '8c02'
//!   name: 'SATA controller: Intel Corporation 8 Series/C220 Series'
//! ```
//!
//! Address fields are hex text. Unquoted values such as `bus: 17` load as
//! YAML integers; their decimal digits are taken back as hex text, which is
//! what the author wrote.
//!
//! Prefixed forms must be quoted. YAML resolves an unquoted `0x1a` to the
//! integer 26 before it reaches this module, and the original spelling
//! cannot be recovered, so it would name bus `0x26`. Write `bus: '0x1a'`
//! (or plain `'1a'`) instead; quoted text keeps the prefix and is parsed as
//! hex.

use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::error::ProviderError;

/// One device the platform expects to find on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExpectedDevice {
    #[serde(deserialize_with = "hex_text")]
    pub bus: String,
    #[serde(deserialize_with = "hex_text")]
    pub dev: String,
    #[serde(rename = "fn", deserialize_with = "hex_text")]
    pub func: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// Load and parse the expected-device list.
pub async fn load(path: &Path) -> Result<Vec<ExpectedDevice>, ProviderError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ProviderError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
    parse(path, &raw)
}

fn parse(path: &Path, raw: &str) -> Result<Vec<ExpectedDevice>, ProviderError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::from_str(raw).map_err(|source| ProviderError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

fn hex_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HexText {
        Text(String),
        Number(u64),
    }

    Ok(match HexText::deserialize(deserializer)? {
        HexText::Text(s) => s,
        HexText::Number(n) => n.to_string(),
    })
}
