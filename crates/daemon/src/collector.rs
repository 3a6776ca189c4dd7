//! Per-device AER stat collection.
//!
//! [`ErrorStatCollector`] looks up a passing device's hardware ID, fetches
//! its AER counter snapshot from the provider and rewrites the device's
//! detail row with exactly those fields. Counters missing from the latest
//! snapshot do not survive from earlier polls.
//!
//! A device with no ID file is skipped entirely for the cycle: no snapshot
//! is requested and its detail row is left as it was. The same holds when
//! the snapshot cannot be fetched.

use std::sync::Arc;

use pcied_core::tables::FIELD_ID;
use pcied_core::{flatten_aer_stats, PciAddress};
use pcied_provider::{DeviceIdReader, DiagnosticProvider};
use pcied_store::OwnedTable;

use crate::error::CollectError;

/// What happened to one device's detail row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectOutcome {
    /// ID written, plus `stat_fields` flattened AER counters.
    Stored { stat_fields: usize },
    /// No ID file; nothing fetched or written.
    NoId,
    /// Collection failed; the error has been logged.
    Failed,
}

/// Collects AER stats for one device at a time.
pub struct ErrorStatCollector {
    provider: Arc<dyn DiagnosticProvider>,
    ids: DeviceIdReader,
    details: Arc<OwnedTable>,
}

impl ErrorStatCollector {
    pub fn new(
        provider: Arc<dyn DiagnosticProvider>,
        ids: DeviceIdReader,
        details: Arc<OwnedTable>,
    ) -> Self {
        Self {
            provider,
            ids,
            details,
        }
    }

    /// Collect and store stats for `addr`.
    ///
    /// Errors are logged and reported as [`CollectOutcome::Failed`]; they
    /// never propagate to the caller.
    pub async fn collect_and_store(&self, addr: &PciAddress) -> CollectOutcome {
        match self.try_collect(addr).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    device = %addr.device_key(),
                    error = %e,
                    "Failed to collect AER stats",
                );
                CollectOutcome::Failed
            }
        }
    }

    async fn try_collect(&self, addr: &PciAddress) -> Result<CollectOutcome, CollectError> {
        let key = addr.device_key();

        let Some(id) = self.ids.read_id(addr).await? else {
            tracing::debug!(device = %key, "No device ID file, skipping stats");
            return Ok(CollectOutcome::NoId);
        };

        let stats = self.provider.aer_stats(addr).await?;
        let stat_fields = flatten_aer_stats(&stats);
        if stat_fields.is_empty() {
            tracing::debug!(device = %key, "No AER stats reported");
        }

        let mut fields = Vec::with_capacity(stat_fields.len() + 1);
        fields.push((FIELD_ID.to_string(), id));
        fields.extend(stat_fields);
        self.details.replace(&key, &fields).await?;
        tracing::debug!(device = %key, fields = fields.len(), "Device record written");

        Ok(CollectOutcome::Stored {
            stat_fields: fields.len() - 1,
        })
    }
}
