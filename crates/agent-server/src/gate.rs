//! Connection Gate
//!
//! Admission check the server runs before letting a request reach the
//! agent (and therefore the model). The model adapter never sees it.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Caller identity as seen by the gate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionInfo {
    pub addr: IpAddr,
}

impl From<SocketAddr> for ConnectionInfo {
    fn from(addr: SocketAddr) -> Self {
        Self { addr: addr.ip() }
    }
}

/// Decides whether a model call may proceed
pub trait ConnectionGate: Send + Sync {
    fn attempt_grant(&self, info: &ConnectionInfo) -> bool;
}

/// Grants at most one call per address per `min_interval`
///
/// A call inside the window of the address's last granted call is rejected
/// and does not extend the window.
#[derive(Debug)]
pub struct IntervalGate {
    min_interval: Duration,
    last_grant: Mutex<HashMap<IpAddr, Instant>>,
}

impl IntervalGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_grant: Mutex::new(HashMap::new()),
        }
    }
}

impl ConnectionGate for IntervalGate {
    fn attempt_grant(&self, info: &ConnectionInfo) -> bool {
        let now = Instant::now();
        let mut last_grant = self.last_grant.lock().unwrap_or_else(PoisonError::into_inner);

        // Expired windows carry no state
        last_grant.retain(|_, last| now.duration_since(*last) < self.min_interval);

        if last_grant.contains_key(&info.addr) {
            tracing::debug!(addr = %info.addr, "Connection inside rate window, rejected");
            return false;
        }

        last_grant.insert(info.addr, now);
        true
    }
}
