//! Authorized-session registry (§3 "Session", §5 "Authorized-sessions
//! set"). Sessions are registered here only once `mining.authorize`
//! succeeds; the broadcaster reads a snapshot of this map under a read
//! lock, register/remove hold it only briefly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::session::Session;

pub struct SessionRegistry {
    sessions: RwLock<HashMap<u64, Arc<Session>>>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// A process-local connection id, assigned once per accepted socket at
    /// accept time (not the socket address, which NATed miners can share).
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn insert(&self, id: u64, session: Arc<Session>) {
        self.sessions.write().await.insert(id, session);
    }

    pub async fn remove(&self, id: u64) {
        self.sessions.write().await.remove(id);
    }

    pub async fn snapshot(&self) -> Vec<(u64, Arc<Session>)> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(id, session)| (*id, session.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};

    async fn session_pair(id: u64) -> Arc<Session> {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (socket, peer) = listener.accept().await.unwrap();
        let _client = connect.await.unwrap();
        let (_read, write) = socket.into_split();
        Arc::new(Session::new(id, peer, write, Duration::from_secs(30)))
    }

    #[tokio::test]
    async fn insert_and_remove_tracks_len() {
        let registry = SessionRegistry::new();
        let session = session_pair(1).await;
        registry.insert(1, session).await;
        assert_eq!(registry.len().await, 1);

        registry.remove(1).await;
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn next_id_is_monotonic() {
        let registry = SessionRegistry::new();
        let a = registry.next_id();
        let b = registry.next_id();
        assert!(b > a);
    }
}
