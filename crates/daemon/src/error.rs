//! Daemon error types and process exit codes.

use pcied_provider::ProviderError;
use pcied_store::StoreError;

use crate::config::ConfigError;

/// Invalid or missing configuration.
pub const EXIT_CONFIG: i32 = 1;

/// The diagnostic provider could not be loaded.
pub const EXIT_PROVIDER_LOAD: i32 = 2;

/// The state store could not be opened.
pub const EXIT_STORE_CONNECT: i32 = 3;

/// Signal handlers could not be installed.
pub const EXIT_SIGNAL_SETUP: i32 = 4;

/// Fatal errors before the monitor loop starts.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to load diagnostic provider: {0}")]
    ProviderLoad(#[source] ProviderError),

    #[error("Failed to connect to state store: {0}")]
    StoreConnect(#[source] StoreError),

    #[error("Failed to install signal handlers: {0}")]
    SignalSetup(#[source] std::io::Error),
}

impl StartupError {
    /// Process exit code for this failure class.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => EXIT_CONFIG,
            Self::ProviderLoad(_) => EXIT_PROVIDER_LOAD,
            Self::StoreConnect(_) => EXIT_STORE_CONNECT,
            Self::SignalSetup(_) => EXIT_SIGNAL_SETUP,
        }
    }
}

/// Failure while collecting stats for one device.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
