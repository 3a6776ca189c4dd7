//! Integration tests for daemon startup and release of owned rows.

mod common;

use std::fs;
use std::sync::Arc;

use assert_matches::assert_matches;
use pcied::config::DaemonConfig;
use pcied::error::{StartupError, EXIT_PROVIDER_LOAD, EXIT_STORE_CONNECT};
use pcied::signals::Shutdown;
use pcied::Daemon;
use pcied_provider::{ProviderError, ProviderKind};
use pcied_store::{MemoryTable, StateStore, Table};

use common::{addr, aer, failed, passed, FailingTable, Harness, ScriptedProvider};

// ---------------------------------------------------------------------------
// Release
// ---------------------------------------------------------------------------

#[tokio::test]
async fn release_deletes_only_owned_rows() {
    let nic = addr("3", "0", "0");
    let provider = ScriptedProvider::new(vec![
        passed("NIC", "3", "0", "0"),
        failed("FPGA", "5", "0", "0"),
    ]);
    provider.set_aer(nic, aer("correctable", &[("RxErr", "2")]));
    let h = Harness::new(provider, true);
    h.add_device(&nic, "1533");
    h.add_detach_hint("DPU0", "0000:07:00.0", "detaching").await;
    h.store
        .detail
        .set("99:00.0", &[("id".to_string(), "beef".to_string())])
        .await
        .unwrap();

    h.daemon.reconciler().run_cycle().await;
    let summary = h.daemon.release().await;

    assert_eq!(summary.deleted, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(h.detail_row("03:00.0").await, None);
    assert_eq!(h.status_row().await, None);
    assert!(h.detail_row("99:00.0").await.is_some());
    assert_eq!(h.store.detach.keys().await.unwrap(), vec!["DPU0"]);
}

#[tokio::test]
async fn release_before_any_cycle_is_a_noop() {
    let h = Harness::new(ScriptedProvider::new(Vec::new()), false);

    let summary = h.daemon.release().await;

    assert_eq!(summary.deleted, 0);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn release_counts_rows_it_could_not_delete() {
    let store = StateStore {
        detail: Arc::new(FailingTable),
        status: Arc::new(MemoryTable::new("PCIE_DEVICES")),
        detach: Arc::new(MemoryTable::new("PCIE_DETACH_INFO")),
    };
    let nic = addr("3", "0", "0");
    let h = Harness::with_store(
        ScriptedProvider::new(vec![passed("NIC", "3", "0", "0")]),
        false,
        store,
    );
    h.add_device(&nic, "1533");

    h.daemon.reconciler().run_cycle().await;
    let summary = h.daemon.release().await;

    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(h.status_row().await, None);
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unusable_state_dir_is_a_store_connect_failure() {
    let dir = tempfile::tempdir().unwrap();
    let occupied = dir.path().join("state");
    fs::write(&occupied, "not a directory").unwrap();

    let config = DaemonConfig {
        state_dir: occupied,
        ..DaemonConfig::default()
    };
    let err = Daemon::start(config, Shutdown::new()).await.err().unwrap();

    assert_matches!(err, StartupError::StoreConnect(_));
    assert_eq!(err.exit_code(), EXIT_STORE_CONNECT);
}

#[tokio::test]
async fn missing_platform_config_is_a_provider_load_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = DaemonConfig {
        state_dir: dir.path().join("state"),
        platform_config: dir.path().join("absent.yaml"),
        sysfs_root: dir.path().to_path_buf(),
        ..DaemonConfig::default()
    };

    let err = Daemon::start(config, Shutdown::new()).await.err().unwrap();

    assert_matches!(err, StartupError::ProviderLoad(ProviderError::ConfigRead { .. }));
    assert_eq!(err.exit_code(), EXIT_PROVIDER_LOAD);
}

#[tokio::test]
async fn missing_helper_is_a_provider_load_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = DaemonConfig {
        provider: ProviderKind::Command,
        provider_command: Some(dir.path().join("no-such-helper")),
        state_dir: dir.path().join("state"),
        ..DaemonConfig::default()
    };

    let err = Daemon::start(config, Shutdown::new()).await.err().unwrap();

    assert_matches!(err, StartupError::ProviderLoad(ProviderError::Unavailable { .. }));
}

#[tokio::test]
async fn started_daemon_persists_status_to_the_state_dir() {
    let dir = tempfile::tempdir().unwrap();
    let sysfs = dir.path().join("sysfs");
    fs::create_dir_all(sysfs.join("0000:00:1f.2")).unwrap();
    fs::write(sysfs.join("0000:00:1f.2").join("device"), "0x8c02\n").unwrap();
    let platform = dir.path().join("pcie.yaml");
    fs::write(
        &platform,
        "- bus: '00'\n  dev: '1f'\n  fn: '2'\n  id: '8c02'\n  name: 'SATA controller'\n\
         - bus: '05'\n  dev: '00'\n  fn: '0'\n  name: 'FPGA'\n",
    )
    .unwrap();
    let state_dir = dir.path().join("state");
    let config = DaemonConfig {
        platform_config: platform,
        sysfs_root: sysfs,
        state_dir: state_dir.clone(),
        ..DaemonConfig::default()
    };

    let daemon = Daemon::start(config, Shutdown::new()).await.unwrap();
    let report = daemon.reconciler().run_cycle().await;

    assert_eq!(report.failed, vec!["0000:05:00.0"]);
    assert_eq!(report.collected, vec!["00:1f.2"]);

    let reopened = StateStore::open_dir(&state_dir).await.unwrap();
    let status = reopened.status.get("status").await.unwrap().unwrap();
    assert_eq!(status["status"], "FAILED");
    let detail = reopened.detail.get("00:1f.2").await.unwrap().unwrap();
    assert_eq!(detail["id"], "8c02");

    daemon.release().await;
    assert_eq!(reopened.status.get("status").await.unwrap(), None);
    assert_eq!(reopened.detail.get("00:1f.2").await.unwrap(), None);
}
