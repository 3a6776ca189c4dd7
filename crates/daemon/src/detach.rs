//! Detach-mode filtering.
//!
//! On deployments with hot-pluggable units an external lifecycle manager
//! publishes detach hints while a unit is being removed. A device that
//! disappears during that window is expected to be gone and must not be
//! reported as a fault.

use std::sync::Arc;

use pcied_core::tables::{DPU_STATE_DETACHING, FIELD_BUS_INFO, FIELD_DPU_STATE};
use pcied_store::{Row, Table};

/// Answers "is this device being detached right now?".
///
/// Hints are re-read on every query: a unit can enter or leave detaching
/// mode between two failures of the same cycle.
pub struct DetachFilter {
    enabled: bool,
    hints: Arc<dyn Table>,
}

impl DetachFilter {
    pub fn new(enabled: bool, hints: Arc<dyn Table>) -> Self {
        Self { enabled, hints }
    }

    /// `true` if a hint row marks `bus_info` as detaching.
    ///
    /// Store errors are logged and treated as "not detaching".
    pub async fn is_detaching(&self, bus_info: &str) -> bool {
        if !self.enabled {
            return false;
        }

        let keys = match self.hints.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(table = self.hints.name(), error = %e, "Cannot list detach hints");
                return false;
            }
        };

        for key in keys {
            match self.hints.get(&key).await {
                Ok(Some(row)) if marks_detaching(&row, bus_info) => return true,
                // Row vanished between list and get, or belongs to another device.
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Cannot read detach hint");
                }
            }
        }

        false
    }
}

fn marks_detaching(row: &Row, bus_info: &str) -> bool {
    row.get(FIELD_BUS_INFO).map(String::as_str) == Some(bus_info)
        && row.get(FIELD_DPU_STATE).map(String::as_str) == Some(DPU_STATE_DETACHING)
}
