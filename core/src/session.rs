//! Per-connection session state. Purely data — the socket, its writer
//! mutex and the deadline timer itself live in `zecpool-stratum`, which
//! wraps this in an I/O-capable session type.

use std::net::IpAddr;
use std::time::Instant;

/// A session is valid (may `submit`) iff it has completed subscribe, then
/// authorize, in that order.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub remote_ip: IpAddr,
    pub login: Option<String>,
    /// 8 hex chars, assigned once by `mining.subscribe`.
    pub extranonce1: Option<String>,
    pub authorized: bool,
    pub connected_at: Instant,
    pub last_activity: Instant,
    pub shares_accepted: u64,
    pub shares_rejected: u64,
}

impl SessionState {
    pub fn new(remote_ip: IpAddr) -> Self {
        let now = Instant::now();
        SessionState {
            remote_ip,
            login: None,
            extranonce1: None,
            authorized: false,
            connected_at: now,
            last_activity: now,
            shares_accepted: 0,
            shares_rejected: 0,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.extranonce1.is_some()
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}
