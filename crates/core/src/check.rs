//! Provider check results, AER snapshots and the aggregate status.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::PciAddress;
use crate::error::CoreError;
use crate::tables::AER_FIELD_SEPARATOR;

/// AER counter snapshot for one device: group -> field -> value.
pub type AerStats = BTreeMap<String, BTreeMap<String, String>>;

/// Outcome of the presence check for one expected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckOutcome {
    Passed,
    Failed,
}

/// One entry of a full device check.
///
/// Address fields stay as the hex strings the provider reported; they are
/// only parsed when the cycle needs them, so one malformed entry cannot
/// poison the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub bus: String,
    pub dev: String,
    #[serde(rename = "fn")]
    pub func: String,
    pub result: CheckOutcome,
}

impl CheckResult {
    pub fn address(&self) -> Result<PciAddress, CoreError> {
        PciAddress::from_hex(&self.bus, &self.dev, &self.func)
    }

    pub fn passed(&self) -> bool {
        self.result == CheckOutcome::Passed
    }
}

/// Aggregate status written to the status row after each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Passed,
    Failed,
}

impl DeviceStatus {
    /// `Failed` iff at least one device counted as a failure.
    pub fn from_failure_count(failures: usize) -> Self {
        if failures > 0 {
            Self::Failed
        } else {
            Self::Passed
        }
    }

    /// Value stored in the status field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flatten a snapshot into `<group>|<field>` detail fields.
pub fn flatten_aer_stats(stats: &AerStats) -> Vec<(String, String)> {
    stats
        .iter()
        .flat_map(|(group, fields)| {
            fields.iter().map(move |(field, value)| {
                (
                    format!("{group}{AER_FIELD_SEPARATOR}{field}"),
                    value.clone(),
                )
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
