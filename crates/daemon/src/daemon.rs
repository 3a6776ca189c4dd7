//! Daemon assembly and lifetime.
//!
//! [`Daemon`] owns everything one monitor instance needs: the loaded
//! provider, the state store, the rows it owns and the shutdown handle.
//! Callers must run [`Daemon::release`] on every exit path once the daemon
//! exists; the rows are not cleaned up on drop.

use std::sync::Arc;

use pcied_provider::{
    CommandProvider, DeviceIdReader, DiagnosticProvider, ProviderError, ProviderKind,
    SysfsProvider,
};
use pcied_store::{OwnedTable, ReleaseSummary, StateStore};

use crate::collector::ErrorStatCollector;
use crate::config::DaemonConfig;
use crate::cycle::Reconciler;
use crate::detach::DetachFilter;
use crate::error::StartupError;
use crate::monitor::{self, LoopOutcome};
use crate::signals::Shutdown;

pub struct Daemon {
    config: DaemonConfig,
    store: StateStore,
    details: Arc<OwnedTable>,
    status: Arc<OwnedTable>,
    reconciler: Reconciler,
    shutdown: Shutdown,
}

impl Daemon {
    /// Wire a daemon from already-acquired collaborators.
    pub fn new(
        config: DaemonConfig,
        store: StateStore,
        provider: Arc<dyn DiagnosticProvider>,
        shutdown: Shutdown,
    ) -> Self {
        let details = Arc::new(OwnedTable::new(Arc::clone(&store.detail)));
        let status = Arc::new(OwnedTable::new(Arc::clone(&store.status)));

        let detach = DetachFilter::new(config.detach_tracking, Arc::clone(&store.detach));
        let collector = ErrorStatCollector::new(
            Arc::clone(&provider),
            DeviceIdReader::new(config.sysfs_root.clone()),
            Arc::clone(&details),
        );
        let reconciler = Reconciler::new(provider, detach, collector, Arc::clone(&status));

        Self {
            config,
            store,
            details,
            status,
            reconciler,
            shutdown,
        }
    }

    /// Open the state store and load the configured provider.
    pub async fn start(config: DaemonConfig, shutdown: Shutdown) -> Result<Self, StartupError> {
        let store = StateStore::open_dir(&config.state_dir)
            .await
            .map_err(StartupError::StoreConnect)?;
        tracing::info!(state_dir = %config.state_dir.display(), "State store opened");

        let provider = load_provider(&config)
            .await
            .map_err(StartupError::ProviderLoad)?;
        tracing::info!(provider = provider.name(), "Diagnostic provider loaded");

        Ok(Self::new(config, store, provider, shutdown))
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Run the monitor loop until shutdown is requested.
    pub async fn run(&self) -> LoopOutcome {
        monitor::run(&self.reconciler, self.config.interval, &self.shutdown).await
    }

    /// Delete every detail and status row this instance wrote.
    ///
    /// Best-effort: failures are logged and counted, never fatal. The
    /// detach table is not touched.
    pub async fn release(&self) -> ReleaseSummary {
        let details = self.details.release().await;
        let status = self.status.release().await;

        let summary = ReleaseSummary {
            deleted: details.deleted + status.deleted,
            failed: details.failed + status.failed,
        };

        if summary.failed > 0 {
            tracing::warn!(
                deleted = summary.deleted,
                failed = summary.failed,
                "Some owned rows could not be deleted",
            );
        } else {
            tracing::info!(deleted = summary.deleted, "Owned rows deleted");
        }

        summary
    }
}

/// Load the provider selected by `config.provider`.
pub async fn load_provider(
    config: &DaemonConfig,
) -> Result<Arc<dyn DiagnosticProvider>, ProviderError> {
    match config.provider {
        ProviderKind::Sysfs => {
            let provider =
                SysfsProvider::load(&config.platform_config, config.sysfs_root.clone()).await?;
            tracing::info!(
                config = %config.platform_config.display(),
                devices = provider.expected().len(),
                "Loaded expected PCIe devices",
            );
            Ok(Arc::new(provider))
        }
        ProviderKind::Command => {
            let program = config
                .provider_command
                .as_deref()
                .ok_or_else(|| ProviderError::Unavailable {
                    path: Default::default(),
                    reason: "no provider command configured".to_string(),
                })?;
            let provider = CommandProvider::load(program, config.provider_timeout).await?;
            Ok(Arc::new(provider))
        }
    }
}
