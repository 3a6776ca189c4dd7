//! Well-known state-store table, key and field names.
//!
//! These are the names other processes use to read the monitor's output, so
//! they are part of the daemon's external contract.

/// Per-device detail rows, keyed by device key (`03:00.0`).
pub const TABLE_DEVICE_DETAIL: &str = "PCIE_DEVICE";

/// Aggregate pass/fail status table.
pub const TABLE_DEVICE_STATUS: &str = "PCIE_DEVICES";

/// Detach-lifecycle hints written by an external lifecycle manager.
pub const TABLE_DETACH_INFO: &str = "PCIE_DETACH_INFO";

/// The single row key in [`TABLE_DEVICE_STATUS`].
pub const STATUS_KEY: &str = "status";

/// Field holding `PASSED` / `FAILED` in the status row.
pub const FIELD_STATUS: &str = "status";

/// Hardware device ID field in a detail row.
pub const FIELD_ID: &str = "id";

/// Bus info field of a detach hint row.
pub const FIELD_BUS_INFO: &str = "bus_info";

/// Lifecycle state field of a detach hint row.
pub const FIELD_DPU_STATE: &str = "dpu_state";

/// The only `dpu_state` value the monitor acts on.
pub const DPU_STATE_DETACHING: &str = "detaching";

/// Separator between AER group and field in flattened detail fields.
pub const AER_FIELD_SEPARATOR: char = '|';
