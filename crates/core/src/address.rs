//! PCI bus/device/function addressing.
//!
//! Check results carry the address as three hex strings (`"3"`, `"00"`,
//! `"0"`); everything downstream works with the canonical renderings:
//!
//! - bus info (`0000:03:00.0`), used for sysfs paths and detach hints;
//! - device key (`03:00.0`), used as the row key in the detail table.

use std::fmt;

use crate::error::CoreError;

/// PCI segment rendered in every bus-info string. Only segment 0 is monitored.
const SEGMENT: &str = "0000";

const MAX_BUS: u32 = 0xff;
const MAX_DEVICE: u32 = 0x1f;
const MAX_FUNCTION: u32 = 0x7;

/// A PCI bus/device/function triplet on segment 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PciAddress {
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl PciAddress {
    /// Build an address from numeric fields, validating the device and
    /// function ranges.
    pub fn new(bus: u8, device: u8, function: u8) -> Result<Self, CoreError> {
        check_range("device", u32::from(device), MAX_DEVICE)?;
        check_range("function", u32::from(function), MAX_FUNCTION)?;
        Ok(Self {
            bus,
            device,
            function,
        })
    }

    /// Parse the hex-string fields of a check result.
    ///
    /// Accepts an optional `0x` prefix and surrounding whitespace.
    pub fn from_hex(bus: &str, device: &str, function: &str) -> Result<Self, CoreError> {
        let bus = parse_hex_field("bus", bus, MAX_BUS)?;
        let device = parse_hex_field("device", device, MAX_DEVICE)?;
        let function = parse_hex_field("function", function, MAX_FUNCTION)?;
        Ok(Self {
            bus,
            device,
            function,
        })
    }

    /// Canonical bus info, e.g. `0000:03:00.0`.
    pub fn bus_info(&self) -> String {
        format!("{SEGMENT}:{}", self.device_key())
    }

    /// Detail-table row key, e.g. `03:00.0`.
    pub fn device_key(&self) -> String {
        format!("{:02x}:{:02x}.{:x}", self.bus, self.device, self.function)
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{SEGMENT}:{:02x}:{:02x}.{:x}",
            self.bus, self.device, self.function
        )
    }
}

fn parse_hex_field(field: &'static str, raw: &str, max: u32) -> Result<u8, CoreError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let value = u32::from_str_radix(digits, 16).map_err(|_| CoreError::InvalidHex {
        field,
        value: raw.to_string(),
    })?;
    check_range(field, value, max)?;

    // max is at most 0xff, so the narrowing cannot truncate.
    Ok(value as u8)
}

fn check_range(field: &'static str, value: u32, max: u32) -> Result<(), CoreError> {
    if value > max {
        return Err(CoreError::OutOfRange { field, value, max });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
