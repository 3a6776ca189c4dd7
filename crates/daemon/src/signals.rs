//! Signal handling and shutdown state.
//!
//! Signals never interrupt a running cycle. The controller only records the
//! exit code and cancels the shared [`Shutdown`] token; the monitor loop
//! observes the token at its wait boundary.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use nix::sys::signal::Signal;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Signals the daemon installs handlers for.
pub const HANDLED_SIGNALS: &[Signal] = &[
    Signal::SIGHUP,
    Signal::SIGINT,
    Signal::SIGTERM,
    Signal::SIGUSR1,
    Signal::SIGUSR2,
];

/// Exit codes for fatal signals are offset from the signal number.
const SIGNAL_EXIT_BASE: i32 = 128;

/// How the daemon reacts to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalClass {
    /// Stop the loop and exit with `128 + signo`.
    Terminate,
    /// Logged and ignored.
    HangUp,
    /// Logged and ignored.
    Other,
}

pub fn classify(signo: i32) -> SignalClass {
    match Signal::try_from(signo) {
        Ok(Signal::SIGINT | Signal::SIGTERM) => SignalClass::Terminate,
        Ok(Signal::SIGHUP) => SignalClass::HangUp,
        _ => SignalClass::Other,
    }
}

fn signal_name(signo: i32) -> &'static str {
    Signal::try_from(signo).map_or("UNKNOWN", Signal::as_str)
}

/// Shared shutdown request plus the exit code it carries.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    exit_code: Arc<AtomicI32>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `exit_code` and wake anything waiting on [`Self::cancelled`].
    pub fn request(&self, exit_code: i32) {
        self.exit_code.store(exit_code, Ordering::SeqCst);
        self.token.cancel();
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Exit code the process should terminate with; 0 unless a fatal
    /// signal arrived.
    pub fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::SeqCst)
    }
}

/// Maps OS signals onto [`Shutdown`].
#[derive(Debug, Clone)]
pub struct SignalController {
    shutdown: Shutdown,
}

impl SignalController {
    pub fn new(shutdown: Shutdown) -> Self {
        Self { shutdown }
    }

    /// React to one delivered signal.
    pub fn handle(&self, signo: i32) -> SignalClass {
        let name = signal_name(signo);
        let class = classify(signo);

        match class {
            SignalClass::Terminate => {
                tracing::info!(signal = name, "Caught termination signal, exiting");
                self.shutdown.request(SIGNAL_EXIT_BASE + signo);
            }
            SignalClass::HangUp => {
                tracing::info!(signal = name, "Caught hang-up signal, ignoring");
            }
            SignalClass::Other => {
                tracing::warn!(signal = name, signo, "Caught unhandled signal, ignoring");
            }
        }

        class
    }

    /// Install handlers for [`HANDLED_SIGNALS`], one listener task each.
    ///
    /// Must be called from within a Tokio runtime. All handlers are
    /// registered before any task is spawned, so an error leaves no
    /// listener running.
    pub fn install(&self) -> std::io::Result<Vec<JoinHandle<()>>> {
        let mut streams = Vec::with_capacity(HANDLED_SIGNALS.len());
        for sig in HANDLED_SIGNALS {
            let signo = *sig as i32;
            streams.push((signo, signal(SignalKind::from_raw(signo))?));
        }

        let handles = streams
            .into_iter()
            .map(|(signo, mut stream)| {
                let controller = self.clone();
                tokio::spawn(async move {
                    while stream.recv().await.is_some() {
                        controller.handle(signo);
                    }
                })
            })
            .collect();

        tracing::debug!(count = HANDLED_SIGNALS.len(), "Signal handlers installed");
        Ok(handles)
    }
}
