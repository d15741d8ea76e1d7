use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::RecordStore;
use crate::telemetry::SystemMonitor;

/// Background loop: capture a snapshot, append it to the metrics log, sleep.
///
/// The cancellation token is checked once per iteration and the sleep is not
/// interrupted, so `shutdown` returns within one interval. This loop is the
/// only writer of the metrics log.
pub struct MetricsPoller {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl MetricsPoller {
    pub fn spawn(
        monitor: Arc<SystemMonitor>,
        store: Arc<RecordStore>,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let token = CancellationToken::new();
        let loop_token = token.clone();
        let handle = thread::Builder::new()
            .name("metrics-poller".to_string())
            .spawn(move || run(monitor, store, interval, loop_token))?;
        info!("Metrics poller started (every {:?})", interval);
        Ok(Self { token, handle })
    }

    /// A token that stops the loop when cancelled.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Request a stop and wait for the loop to exit.
    pub fn shutdown(self) {
        self.token.cancel();
        if self.handle.join().is_err() {
            warn!("Metrics poller thread panicked");
        }
        info!("Metrics poller stopped");
    }
}

fn run(
    monitor: Arc<SystemMonitor>,
    store: Arc<RecordStore>,
    interval: Duration,
    token: CancellationToken,
) {
    let mut polls: u64 = 0;
    while !token.is_cancelled() {
        let snapshot = monitor.capture();
        match store.append_metrics(&snapshot, None) {
            Ok(()) => {
                polls += 1;
                debug!("Metrics logged (poll {})", polls);
            }
            // Background failures are reported and never stop the loop.
            Err(e) => warn!("Background logging error: {}", e),
        }
        thread::sleep(interval);
    }
}
