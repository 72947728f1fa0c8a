//! TCP-dial reachability poller.

use crate::ReachabilityMonitor;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info};

/// Decides reachability by opening (and immediately dropping) a TCP
/// connection to a fixed `host:port`.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    connect_timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// One dial attempt. Any error or timeout counts as unreachable.
    pub async fn check(&self) -> bool {
        match timeout(self.connect_timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                debug!(addr = %self.addr, error = %e, "Reachability probe failed");
                false
            }
            Err(_) => {
                debug!(addr = %self.addr, "Reachability probe timed out");
                false
            }
        }
    }
}

/// Spawn a task that feeds `monitor` with `probe` results every `every`.
///
/// The first check runs immediately. Abort the returned handle to stop.
pub fn spawn_poller(
    monitor: Arc<ReachabilityMonitor>,
    probe: TcpProbe,
    every: Duration,
) -> JoinHandle<()> {
    info!(addr = %probe.addr(), interval_ms = every.as_millis() as u64, "Starting reachability poller");
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let reachable = probe.check().await;
            monitor.report(reachable);
        }
    })
}
