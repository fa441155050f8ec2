//! # Network Monitor
//!
//! Tracks whether the device has transport connectivity and tells
//! interested parties when that changes.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Platform callback ──report(bool)──┐                                    │
//! │                                    ▼                                    │
//! │  TcpProbe (interval) ──report──► NetworkMonitor ──watch──► Subscription │
//! │                                  (watch::Sender)          callbacks     │
//! │                                        │                                │
//! │                                        └──► is_online() / watch()       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only changes are published: reporting the current state again is a no-op.
//! "Online" means the transport is up, not that the remote store will accept
//! a push.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::NetworkSettings;

// =============================================================================
// Network Monitor
// =============================================================================

/// Shared connectivity state. Clones observe and feed the same state.
#[derive(Clone)]
pub struct NetworkMonitor {
    state_tx: Arc<watch::Sender<bool>>,
}

impl NetworkMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (state_tx, _) = watch::channel(initially_online);
        NetworkMonitor {
            state_tx: Arc::new(state_tx),
        }
    }

    /// Records the latest observation. Returns true if the state changed.
    pub fn report(&self, online: bool) -> bool {
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if changed {
            info!(online, "Connectivity changed");
        }
        changed
    }

    pub fn is_online(&self) -> bool {
        *self.state_tx.borrow()
    }

    /// Receiver that sees every published change.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.state_tx.subscribe()
    }

    /// Calls `callback` with the current state right away, then with every
    /// change until the returned [`Subscription`] is unsubscribed or dropped.
    ///
    /// Rapid flips may coalesce; the callback never sees the same value twice
    /// in a row and always ends on the latest state.
    pub fn subscribe<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(bool) + Send + 'static,
    {
        let mut rx = self.state_tx.subscribe();
        let mut last = *rx.borrow_and_update();
        callback(last);

        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                if online != last {
                    last = online;
                    callback(online);
                }
            }
            debug!("Network monitor dropped, subscription ended");
        });

        Subscription { task }
    }
}

impl Default for NetworkMonitor {
    /// Starts offline until something reports otherwise.
    fn default() -> Self {
        Self::new(false)
    }
}

impl std::fmt::Debug for NetworkMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkMonitor")
            .field("online", &self.is_online())
            .finish()
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Live connectivity subscription. Delivery stops on drop.
#[must_use = "dropping a Subscription stops delivery immediately"]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop aborts the task
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// TCP Probe
// =============================================================================

/// Shortest probe interval; shorter (including zero) intervals are raised to it.
pub const MIN_PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// Periodically opens a TCP connection to a well-known host and reports the
/// outcome to a [`NetworkMonitor`].
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    interval: Duration,
    timeout: Duration,
}

impl TcpProbe {
    /// `interval` is clamped to at least [`MIN_PROBE_INTERVAL`].
    pub fn new(address: impl Into<String>, interval: Duration, timeout: Duration) -> Self {
        let address = address.into();
        if interval < MIN_PROBE_INTERVAL {
            warn!(address = %address, interval = ?interval, "Probe interval too short, clamping");
        }
        TcpProbe {
            address,
            interval: interval.max(MIN_PROBE_INTERVAL),
            timeout,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn from_settings(settings: &NetworkSettings) -> Self {
        Self::new(
            settings.probe_address(),
            settings.probe_interval(),
            settings.probe_timeout(),
        )
    }

    /// One connect attempt, bounded by the probe timeout.
    pub async fn check(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(address = %self.address, error = %e, "Probe connect failed");
                false
            }
            Err(_) => {
                debug!(address = %self.address, "Probe timed out");
                false
            }
        }
    }

    /// Probes now and then every interval until the handle is stopped.
    pub fn spawn(self, monitor: NetworkMonitor) -> ProbeHandle {
        info!(address = %self.address, interval = ?self.interval, "Starting connectivity probe");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let online = self.check().await;
                monitor.report(online);
            }
        });

        ProbeHandle { task }
    }
}

/// Running probe task.
pub struct ProbeHandle {
    task: JoinHandle<()>,
}

impl ProbeHandle {
    pub fn stop(self) {}
}

impl Drop for ProbeHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    fn recorder() -> (impl FnMut(bool) + Send + 'static, mpsc::UnboundedReceiver<bool>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (move |online| {
            let _ = tx.send(online);
        }, rx)
    }

    #[tokio::test]
    async fn test_report_publishes_only_changes() {
        let monitor = NetworkMonitor::default();
        assert!(!monitor.is_online());

        assert!(monitor.report(true));
        assert!(!monitor.report(true));
        assert!(monitor.is_online());

        let mut rx = monitor.watch();
        assert!(!rx.has_changed().unwrap());
        monitor.report(false);
        assert!(rx.has_changed().unwrap());
        assert!(!*rx.borrow_and_update());
    }

    #[tokio::test]
    async fn test_subscribe_delivers_current_then_changes() {
        let monitor = NetworkMonitor::new(false);
        let (callback, mut seen) = recorder();
        let sub = monitor.subscribe(callback);

        assert_eq!(seen.recv().await, Some(false));

        monitor.report(true);
        assert_eq!(seen.recv().await, Some(true));

        monitor.report(true);
        monitor.report(false);
        assert_eq!(seen.recv().await, Some(false));
        assert!(sub.is_active());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let monitor = NetworkMonitor::new(true);
        let (callback, mut seen) = recorder();
        let sub = monitor.subscribe(callback);
        assert_eq!(seen.recv().await, Some(true));

        sub.unsubscribe();
        monitor.report(false);

        // The aborted task drops the callback and its sender
        assert_eq!(seen.recv().await, None);
    }

    #[tokio::test]
    async fn test_subscriptions_are_independent() {
        let monitor = NetworkMonitor::new(false);
        let (first_cb, mut first) = recorder();
        let (second_cb, mut second) = recorder();
        let keep = monitor.subscribe(first_cb);
        drop(monitor.subscribe(second_cb));

        assert_eq!(first.recv().await, Some(false));
        assert_eq!(second.recv().await, Some(false));

        monitor.report(true);
        assert_eq!(first.recv().await, Some(true));
        assert_eq!(second.recv().await, None);
        drop(keep);
    }

    #[tokio::test]
    async fn test_probe_reaches_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let probe = TcpProbe::new(address, Duration::from_secs(60), Duration::from_secs(2));
        assert!(probe.check().await);

        let monitor = NetworkMonitor::default();
        let mut rx = monitor.watch();
        let handle = probe.spawn(monitor.clone());

        // First tick fires immediately
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(monitor.is_online());
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_of_closed_port_reports_offline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let probe = TcpProbe::new(address, Duration::from_secs(15), Duration::from_secs(3));
        assert!(!probe.check().await);
    }

    #[tokio::test]
    async fn test_zero_interval_probe_keeps_running() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let probe = TcpProbe::new(address, Duration::ZERO, Duration::from_secs(2));
        assert_eq!(probe.interval(), MIN_PROBE_INTERVAL);

        let monitor = NetworkMonitor::default();
        let mut rx = monitor.watch();
        let handle = probe.spawn(monitor.clone());

        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(monitor.is_online());

        // A second tick still runs after the listener goes away.
        drop(listener);
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(!monitor.is_online());
        handle.stop();
    }
}
