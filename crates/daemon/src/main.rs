//! `pcied` -- PCIe device health monitor.
//!
//! Periodically checks that every expected PCIe device is present, records
//! per-device AER counters and an aggregate PASSED/FAILED status in the
//! state store, and removes its rows again on shutdown.
//!
//! # Environment variables
//!
//! | Variable                      | Required | Default                      | Description                          |
//! |-------------------------------|----------|------------------------------|--------------------------------------|
//! | `PCIED_INTERVAL_SECS`         | no       | `60`                         | Seconds between checks               |
//! | `PCIED_PROVIDER`              | no       | `sysfs`                      | `sysfs` or `command`                 |
//! | `PCIED_PLATFORM_CONFIG`       | no       | `/usr/share/pcied/pcie.yaml` | Expected-device list                 |
//! | `PCIED_SYSFS_ROOT`            | no       | `/sys/bus/pci/devices`       | PCI device directory                 |
//! | `PCIED_PROVIDER_COMMAND`      | with `command` | --                     | Provider helper executable           |
//! | `PCIED_PROVIDER_TIMEOUT_SECS` | no       | `30`                         | Timeout per helper call              |
//! | `PCIED_STATE_DIR`             | no       | `/var/run/pcied`             | State store directory                |
//! | `PCIED_DETACH_TRACKING`       | no       | `false`                      | Honour detach hints                  |

use pcied::config::DaemonConfig;
use pcied::error::StartupError;
use pcied::signals::{Shutdown, SignalController};
use pcied::Daemon;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pcied=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let exit_code = run().await;
    std::process::exit(exit_code);
}

async fn run() -> i32 {
    let config = match DaemonConfig::from_env() {
        Ok(config) => config,
        Err(e) => return startup_failed(e.into()),
    };

    tracing::info!(
        provider = %config.provider,
        interval_secs = config.interval.as_secs(),
        detach_tracking = config.detach_tracking,
        "Starting pcied",
    );

    let shutdown = Shutdown::new();
    let _signal_tasks = match SignalController::new(shutdown.clone()).install() {
        Ok(tasks) => tasks,
        Err(e) => return startup_failed(StartupError::SignalSetup(e)),
    };

    let daemon = match Daemon::start(config, shutdown).await {
        Ok(daemon) => daemon,
        Err(e) => return startup_failed(e),
    };

    let outcome = daemon.run().await;
    daemon.release().await;

    tracing::info!(
        cycles = outcome.cycles,
        exit_code = outcome.exit_code,
        "Shutting down pcied",
    );
    outcome.exit_code
}

fn startup_failed(error: StartupError) -> i32 {
    let exit_code = error.exit_code();
    tracing::error!(error = %error, exit_code, "Startup failed");
    exit_code
}
