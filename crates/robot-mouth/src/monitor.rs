use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::RemoteSpeechDispatcher;

/// Interval used by the chat UI between health probes.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(15);

/// Background health polling. The task is aborted when this is dropped.
pub struct ConnectionMonitor {
    status: watch::Receiver<bool>,
    handle: JoinHandle<()>,
}

impl ConnectionMonitor {
    pub fn is_connected(&self) -> bool {
        *self.status.borrow()
    }

    /// Receiver that wakes on every connected/disconnected transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.status.clone()
    }
}

impl Drop for ConnectionMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Probe the device immediately and then every `interval`.
pub fn spawn_connection_monitor(
    dispatcher: Arc<RemoteSpeechDispatcher>,
    interval: Duration,
) -> ConnectionMonitor {
    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let connected = dispatcher.check_connection().await;
            let changed = tx.send_if_modified(|current| {
                if *current == connected {
                    false
                } else {
                    *current = connected;
                    true
                }
            });
            if changed {
                if connected {
                    info!("robot voice device reachable");
                } else {
                    warn!("robot voice device unreachable");
                }
            }
            if tx.is_closed() {
                break;
            }
        }
    });
    ConnectionMonitor { status: rx, handle }
}
