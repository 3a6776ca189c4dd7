//! One reconciliation cycle.
//!
//! [`Reconciler::run_cycle`] asks the provider for the full device check,
//! filters failures through the detach hints, collects AER stats for the
//! devices that passed, and writes the aggregate status row.
//!
//! Nothing scoped to a single device can abort the cycle; the only way a
//! cycle ends without a status write is a failed provider check.

use std::sync::Arc;

use pcied_core::tables::{FIELD_STATUS, STATUS_KEY};
use pcied_core::{CheckResult, DeviceStatus};
use pcied_provider::DiagnosticProvider;
use pcied_store::OwnedTable;

use crate::collector::{CollectOutcome, ErrorStatCollector};
use crate::detach::DetachFilter;

/// What one cycle observed and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Aggregate status; `None` when the provider check failed.
    pub status: Option<DeviceStatus>,
    /// Whether the status row was written successfully.
    pub status_written: bool,
    /// Number of check results received.
    pub checked: usize,
    /// Devices counted as failures (bus info, or name when unparseable).
    pub failed: Vec<String>,
    /// Failed devices skipped because they are being detached.
    pub detaching: Vec<String>,
    /// Passing devices whose detail row was written.
    pub collected: Vec<String>,
    /// Passing devices skipped for lack of an ID file.
    pub no_id: Vec<String>,
    /// Passing devices whose collection failed or whose address was bad.
    pub collect_errors: usize,
}

/// Drives a single poll of every expected device.
pub struct Reconciler {
    provider: Arc<dyn DiagnosticProvider>,
    detach: DetachFilter,
    collector: ErrorStatCollector,
    status: Arc<OwnedTable>,
}

impl Reconciler {
    pub fn new(
        provider: Arc<dyn DiagnosticProvider>,
        detach: DetachFilter,
        collector: ErrorStatCollector,
        status: Arc<OwnedTable>,
    ) -> Self {
        Self {
            provider,
            detach,
            collector,
            status,
        }
    }

    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let results = match self.provider.pcie_check().await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(
                    provider = self.provider.name(),
                    error = %e,
                    "PCIe check failed, skipping status update",
                );
                return report;
            }
        };
        report.checked = results.len();

        for result in &results {
            if result.passed() {
                self.collect(result, &mut report).await;
            } else {
                self.record_failure(result, &mut report).await;
            }
        }

        let status = DeviceStatus::from_failure_count(report.failed.len());
        report.status = Some(status);

        let fields = [(FIELD_STATUS.to_string(), status.as_str().to_string())];
        match self.status.set(STATUS_KEY, &fields).await {
            Ok(()) => report.status_written = true,
            Err(e) => {
                tracing::error!(error = %e, "Failed to write PCIe status row");
            }
        }

        match status {
            DeviceStatus::Failed => tracing::error!(
                failures = report.failed.len(),
                "PCIe device status check : FAILED",
            ),
            DeviceStatus::Passed => tracing::info!(
                devices = report.checked,
                "PCIe device status check : PASSED",
            ),
        }

        report
    }

    async fn record_failure(&self, result: &CheckResult, report: &mut CycleReport) {
        let addr = match result.address() {
            Ok(addr) => addr,
            Err(e) => {
                // Without an address there is no detach hint to match.
                tracing::warn!(
                    name = %result.name,
                    bus = %result.bus,
                    dev = %result.dev,
                    func = %result.func,
                    error = %e,
                    "PCIe device failed with unparseable address",
                );
                report.failed.push(result.name.clone());
                return;
            }
        };

        let bus_info = addr.bus_info();
        if self.detach.is_detaching(&bus_info).await {
            tracing::debug!(
                name = %result.name,
                bus_info = %bus_info,
                "PCIe device is detaching, not counted as failure",
            );
            report.detaching.push(bus_info);
            return;
        }

        tracing::warn!(
            name = %result.name,
            bus_info = %bus_info,
            "PCIe device missing or failed",
        );
        report.failed.push(bus_info);
    }

    async fn collect(&self, result: &CheckResult, report: &mut CycleReport) {
        let addr = match result.address() {
            Ok(addr) => addr,
            Err(e) => {
                tracing::error!(
                    name = %result.name,
                    error = %e,
                    "Cannot collect stats, unparseable device address",
                );
                report.collect_errors += 1;
                return;
            }
        };

        match self.collector.collect_and_store(&addr).await {
            CollectOutcome::Stored { .. } => report.collected.push(addr.device_key()),
            CollectOutcome::NoId => report.no_id.push(addr.device_key()),
            CollectOutcome::Failed => report.collect_errors += 1,
        }
    }
}
