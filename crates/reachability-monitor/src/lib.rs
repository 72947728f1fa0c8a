//! Connectivity monitoring for the offline outbox.
//!
//! [`ReachabilityMonitor`] holds the host's binary online/offline state and
//! turns a stream of raw reports into transition events: `Reconnected` is
//! published exactly once per offline to online edge, no matter how often the
//! host repeats "still online".
//!
//! Hosts without a native network-state signal can feed the monitor with
//! [`spawn_poller`], which dials a TCP address on an interval.

mod monitor;
mod poller;

pub use monitor::{Reachability, ReachabilityEvent, ReachabilityMonitor};
pub use poller::{spawn_poller, TcpProbe};
