#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pcied::config::DaemonConfig;
use pcied::signals::Shutdown;
use pcied::Daemon;
use pcied_core::tables::{FIELD_BUS_INFO, FIELD_DPU_STATE};
use pcied_core::{AerStats, CheckOutcome, CheckResult, PciAddress};
use pcied_provider::{DiagnosticProvider, ProviderError};
use pcied_store::{Row, StateStore, StoreError, Table};
use tempfile::TempDir;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

// ---------------------------------------------------------------------------
// Check results
// ---------------------------------------------------------------------------

pub fn passed(name: &str, bus: &str, dev: &str, func: &str) -> CheckResult {
    check(name, bus, dev, func, CheckOutcome::Passed)
}

pub fn failed(name: &str, bus: &str, dev: &str, func: &str) -> CheckResult {
    check(name, bus, dev, func, CheckOutcome::Failed)
}

fn check(name: &str, bus: &str, dev: &str, func: &str, result: CheckOutcome) -> CheckResult {
    CheckResult {
        name: name.to_string(),
        bus: bus.to_string(),
        dev: dev.to_string(),
        func: func.to_string(),
        result,
    }
}

pub fn addr(bus: &str, dev: &str, func: &str) -> PciAddress {
    PciAddress::from_hex(bus, dev, func).expect("valid test address")
}

pub fn aer(group: &str, fields: &[(&str, &str)]) -> AerStats {
    let mut stats = AerStats::new();
    stats.insert(
        group.to_string(),
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    );
    stats
}

// ---------------------------------------------------------------------------
// ScriptedProvider
// ---------------------------------------------------------------------------

type Hook = Box<dyn Fn() + Send + Sync>;

/// Provider returning canned answers and recording every call.
#[derive(Default)]
pub struct ScriptedProvider {
    /// `None` makes `pcie_check` fail.
    results: Mutex<Option<Vec<CheckResult>>>,
    aer: Mutex<HashMap<PciAddress, AerStats>>,
    aer_calls: Mutex<Vec<PciAddress>>,
    check_calls: AtomicUsize,
    on_check: Mutex<Option<Hook>>,
}

impl ScriptedProvider {
    pub fn new(results: Vec<CheckResult>) -> Arc<Self> {
        let provider = Self::default();
        *provider.results.lock().unwrap() = Some(results);
        Arc::new(provider)
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_results(&self, results: Vec<CheckResult>) {
        *self.results.lock().unwrap() = Some(results);
    }

    /// Make every following `pcie_check` fail.
    pub fn fail_checks(&self) {
        *self.results.lock().unwrap() = None;
    }

    pub fn set_aer(&self, addr: PciAddress, stats: AerStats) {
        self.aer.lock().unwrap().insert(addr, stats);
    }

    /// Run `hook` inside every `pcie_check`, i.e. in the middle of a cycle.
    pub fn on_check(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_check.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn aer_calls(&self) -> Vec<PciAddress> {
        self.aer_calls.lock().unwrap().clone()
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiagnosticProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn pcie_check(&self) -> Result<Vec<CheckResult>, ProviderError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.on_check.lock().unwrap().as_ref() {
            hook();
        }
        self.results
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ProviderError::Command {
                command: "check".to_string(),
                details: "scripted failure".to_string(),
            })
    }

    async fn aer_stats(&self, addr: &PciAddress) -> Result<AerStats, ProviderError> {
        self.aer_calls.lock().unwrap().push(*addr);
        Ok(self.aer.lock().unwrap().get(addr).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// FailingTable
// ---------------------------------------------------------------------------

/// A table whose every operation fails.
pub struct FailingTable;

fn broken() -> StoreError {
    StoreError::Io {
        table: "BROKEN".to_string(),
        path: "/dev/null/BROKEN.json".into(),
        source: std::io::Error::new(std::io::ErrorKind::Other, "store offline"),
    }
}

#[async_trait]
impl Table for FailingTable {
    fn name(&self) -> &str {
        "BROKEN"
    }

    async fn set(&self, _key: &str, _fields: &[(String, String)]) -> Result<(), StoreError> {
        Err(broken())
    }

    async fn replace(&self, _key: &str, _fields: &[(String, String)]) -> Result<(), StoreError> {
        Err(broken())
    }

    async fn get(&self, _key: &str) -> Result<Option<Row>, StoreError> {
        Err(broken())
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(broken())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Err(broken())
    }
}

// ---------------------------------------------------------------------------
// LogCapture
// ---------------------------------------------------------------------------

/// Tracing layer that keeps the level and message of every event.
#[derive(Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl LogCapture {
    /// Make this the current thread's subscriber until the guard drops.
    ///
    /// `#[tokio::test]` runs on a single thread, so every event the test
    /// drives is seen.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    /// Messages recorded at exactly `level`.
    pub fn at(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = MessageVisitor(String::new());
        event.record(&mut message);
        self.events
            .lock()
            .unwrap()
            .push((*event.metadata().level(), message.0));
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A daemon wired to a scripted provider, in-memory tables and a fake
/// sysfs tree.
pub struct Harness {
    pub daemon: Arc<Daemon>,
    pub provider: Arc<ScriptedProvider>,
    pub store: StateStore,
    pub sysfs: TempDir,
}

impl Harness {
    pub fn new(provider: Arc<ScriptedProvider>, detach_tracking: bool) -> Self {
        Self::with_store(provider, detach_tracking, StateStore::in_memory())
    }

    pub fn with_store(
        provider: Arc<ScriptedProvider>,
        detach_tracking: bool,
        store: StateStore,
    ) -> Self {
        let sysfs = tempfile::tempdir().expect("temp sysfs root");
        let config = DaemonConfig {
            interval: Duration::from_secs(60),
            sysfs_root: sysfs.path().to_path_buf(),
            detach_tracking,
            ..DaemonConfig::default()
        };
        let daemon = Arc::new(Daemon::new(
            config,
            store.clone(),
            Arc::clone(&provider) as Arc<dyn DiagnosticProvider>,
            Shutdown::new(),
        ));
        Self {
            daemon,
            provider,
            store,
            sysfs,
        }
    }

    /// Create the device's sysfs directory with a `device` ID file.
    pub fn add_device(&self, addr: &PciAddress, id: &str) {
        let dir = self.sysfs.path().join(addr.bus_info());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("device"), format!("0x{id}\n")).unwrap();
    }

    pub fn remove_device(&self, addr: &PciAddress) {
        fs::remove_dir_all(self.sysfs.path().join(addr.bus_info())).unwrap();
    }

    pub async fn add_detach_hint(&self, key: &str, bus_info: &str, state: &str) {
        self.store
            .detach
            .set(
                key,
                &[
                    (FIELD_BUS_INFO.to_string(), bus_info.to_string()),
                    (FIELD_DPU_STATE.to_string(), state.to_string()),
                ],
            )
            .await
            .unwrap();
    }

    pub async fn status_row(&self) -> Option<String> {
        self.store
            .status
            .get("status")
            .await
            .unwrap()
            .and_then(|row| row.get("status").cloned())
    }

    pub async fn detail_row(&self, key: &str) -> Option<Row> {
        self.store.detail.get(key).await.unwrap()
    }
}
