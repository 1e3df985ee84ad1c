//! Fan-out of `mining.notify` to every authorized session (§4.6).

use std::sync::Arc;
use std::time::Instant;

use log::info;
use serde_json::Value;
use tokio::sync::Semaphore;

use zecpool_core::Work;

use crate::dispatcher::push;
use crate::registry::SessionRegistry;

/// Caps how many pushes run concurrently during one broadcast (§4.6).
const MAX_CONCURRENT_PUSHES: usize = 1024;

/// Pushes `mining.notify` for `work` to every currently-authorized session.
/// A session whose push fails to write is removed from the registry (§4.6,
/// §7 "a push that fails to write removes the session").
pub async fn broadcast_work(registry: &Arc<SessionRegistry>, work: &Work) {
    let sessions = registry.snapshot().await;
    if sessions.is_empty() {
        return;
    }

    let notification = push("mining.notify", Value::Array(work.notify_params()));
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_PUSHES));
    let start = Instant::now();
    let total = sessions.len();

    let mut handles = Vec::with_capacity(total);
    for (id, session) in sessions {
        let semaphore = semaphore.clone();
        let notification = notification.clone();
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.expect("broadcast semaphore is never closed");
            if session.send(&notification).await.is_err() {
                registry.remove(id).await;
            }
        }));
    }
    for handle in handles {
        let _ = handle.await;
    }

    info!("broadcast mining.notify (job {}) to {total} sessions in {:?}", work.job_id, start.elapsed());
}
