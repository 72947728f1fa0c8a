//! Reachability state and transition events.

use tokio::sync::{broadcast, watch};
use tracing::info;

/// Capacity of the transition event channel. Slow subscribers that fall
/// further behind see `RecvError::Lagged` and should re-read the state.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// A reachability transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReachabilityEvent {
    /// Unreachable to reachable.
    Reconnected,
    /// Reachable to unreachable.
    Disconnected,
}

/// Narrow view of connectivity consumed by the outbox.
pub trait Reachability: Send + Sync {
    /// Point-in-time answer from the host's network-state signal.
    fn is_reachable(&self) -> bool;

    /// Subscribe to transition events.
    fn subscribe(&self) -> broadcast::Receiver<ReachabilityEvent>;
}

/// Tracks binary reachability and publishes one event per transition.
pub struct ReachabilityMonitor {
    state: watch::Sender<bool>,
    events: broadcast::Sender<ReachabilityEvent>,
}

impl ReachabilityMonitor {
    /// Create a monitor with the given initial state.
    pub fn new(initially_reachable: bool) -> Self {
        let (state, _) = watch::channel(initially_reachable);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { state, events }
    }

    /// Feed the latest host signal.
    ///
    /// Returns the transition this report caused, or `None` when the state
    /// did not change. Concurrent reports of the same value yield a single
    /// transition.
    pub fn report(&self, reachable: bool) -> Option<ReachabilityEvent> {
        let mut transition = None;
        // The event is published under the state's write lock, so subscribers
        // see transitions in the order the state took them.
        self.state.send_if_modified(|current| {
            if *current == reachable {
                return false;
            }
            *current = reachable;

            let event = if reachable {
                ReachabilityEvent::Reconnected
            } else {
                ReachabilityEvent::Disconnected
            };
            // No subscribers is fine; the state is still recorded.
            let _ = self.events.send(event);
            transition = Some(event);
            true
        });

        match transition {
            Some(ReachabilityEvent::Reconnected) => info!("Network reachable again"),
            Some(ReachabilityEvent::Disconnected) => info!("Network unreachable"),
            None => {}
        }
        transition
    }
}

impl Reachability for ReachabilityMonitor {
    fn is_reachable(&self) -> bool {
        *self.state.borrow()
    }

    fn subscribe(&self) -> broadcast::Receiver<ReachabilityEvent> {
        self.events.subscribe()
    }
}
