//! Shared domain types for the PCIe monitor.
//!
//! Everything in this crate is pure: PCI address parsing and formatting,
//! check-result and AER snapshot types, and the well-known table and field
//! names shared by the daemon and any process reading its state.

pub mod address;
pub mod check;
pub mod error;
pub mod tables;

pub use address::PciAddress;
pub use check::{flatten_aer_stats, AerStats, CheckOutcome, CheckResult, DeviceStatus};
pub use error::CoreError;
