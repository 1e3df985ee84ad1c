//! A connected Stratum session: the per-connection state machine data
//! plus the I/O half and writer mutex that make pushes and RPC replies
//! safe to interleave (§3 "Session", §5 "Per-connection writer").

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

use zecpool_core::SessionState;

use crate::StratumError;

/// One connected miner. `state` is read on every dispatch to check
/// subscribe/authorize ordering; `writer` is held for the duration of a
/// single outbound line, whether that line is an RPC reply or a
/// `mining.notify` push. `deadline_millis` is the shared read/write
/// deadline (§4.4): set on accept, refreshed on every inbound message and
/// every successful outbound push, so a session fed only by broadcasts
/// stays alive.
pub struct Session {
    pub id: u64,
    pub addr: SocketAddr,
    pub state: Mutex<SessionState>,
    writer: Mutex<OwnedWriteHalf>,
    timeout: Duration,
    deadline_millis: AtomicU64,
}

impl Session {
    pub fn new(id: u64, addr: SocketAddr, writer: OwnedWriteHalf, timeout: Duration) -> Self {
        let session = Session {
            id,
            addr,
            state: Mutex::new(SessionState::new(addr.ip())),
            writer: Mutex::new(writer),
            timeout,
            deadline_millis: AtomicU64::new(0),
        };
        session.touch();
        session
    }

    /// Serializes `value` and writes it as one newline-terminated line,
    /// holding the writer mutex for the whole write. A successful send
    /// refreshes the deadline the same way an inbound message does (§4.4
    /// "a push that fails to write removes the session; a successful push
    /// refreshes the deadline") — the caller removes the session on `Err`.
    pub async fn send(&self, value: &Value) -> Result<(), StratumError> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        drop(writer);
        self.touch();
        Ok(())
    }

    pub async fn is_authorized(&self) -> bool {
        self.state.lock().await.is_authorized()
    }

    pub async fn is_subscribed(&self) -> bool {
        self.state.lock().await.is_subscribed()
    }

    /// Resets the deadline to `now + timeout` (§4.4 "on accept and on each
    /// inbound message", plus every successful push per `send` above).
    pub fn touch(&self) {
        let deadline = now_millis().saturating_add(self.timeout.as_millis() as u64);
        self.deadline_millis.store(deadline, Ordering::Relaxed);
    }

    /// Time remaining until the current deadline, for the read loop to
    /// sleep against. Zero if the deadline has already passed.
    pub fn remaining(&self) -> Duration {
        let deadline = self.deadline_millis.load(Ordering::Relaxed);
        let now = now_millis();
        if deadline <= now {
            Duration::ZERO
        } else {
            Duration::from_millis(deadline - now)
        }
    }

    /// Whether the deadline has actually elapsed as of now. Checked after
    /// a sleep wakes, since a concurrent successful push can have moved
    /// the deadline forward while the read loop slept.
    pub fn expired(&self) -> bool {
        self.deadline_millis.load(Ordering::Relaxed) <= now_millis()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};

    async fn session_pair(timeout: Duration) -> Session {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (socket, peer) = listener.accept().await.unwrap();
        let _client = connect.await.unwrap();
        let (_read, write) = socket.into_split();
        Session::new(1, peer, write, timeout)
    }

    #[tokio::test]
    async fn a_fresh_session_has_time_remaining() {
        let session = session_pair(Duration::from_secs(30)).await;
        assert!(!session.expired());
        assert!(session.remaining() > Duration::ZERO);
    }

    #[tokio::test]
    async fn touch_extends_an_expired_deadline() {
        let session = session_pair(Duration::from_millis(0)).await;
        assert!(session.expired());

        // Simulate a successful push extending the deadline well past now.
        session.deadline_millis.store(now_millis() + 60_000, Ordering::Relaxed);
        assert!(!session.expired());
    }
}
