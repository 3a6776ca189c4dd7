#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid PCI {field} '{value}': not a hex number")]
    InvalidHex { field: &'static str, value: String },

    #[error("PCI {field} {value:#x} out of range (max {max:#x})")]
    OutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },

    #[error("Validation failed: {0}")]
    Validation(String),
}
