//! Ties the work assembler, upstream supervisor, session registry and
//! store into a running pool: the TCP accept loop, the periodic work
//! refresh, and the node-state/health bookkeeping §5 describes.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future;
use futures::StreamExt;
use log::{info, warn};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::time;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use zecpool_core::{PoolConfig, ProxyConfig};
use zecpool_storage::{NodeState, Store};
use zecpool_upstream::UpstreamSupervisor;
use zecpool_util::{must_parse_duration, pow_limit_test, target_from_difficulty, target_to_hex};

use crate::assembler::WorkAssembler;
use crate::broadcaster::broadcast_work;
use crate::dispatcher::dispatch_line;
use crate::extranonce::ExtraNonceCounter;
use crate::registry::SessionRegistry;
use crate::session::Session;
use crate::StratumError;

/// A line longer than this is a protocol violation (§4.4 "socket flood").
const MAX_LINE_BYTES: usize = 10 * 1024;

/// Everything the Stratum listener, the work pipeline and the stats API
/// need to share. Cheap to clone-by-`Arc`: every field that changes after
/// construction is itself an atomic or lock-guarded container.
pub struct Pool {
    pub proxy: ProxyConfig,
    pub upstreams: Arc<UpstreamSupervisor>,
    pub assembler: Arc<WorkAssembler>,
    pub registry: Arc<SessionRegistry>,
    pub store: Arc<dyn Store>,
    pub extranonce_counter: ExtraNonceCounter,
    /// The pool's own per-miner target, hex-encoded, derived once at
    /// startup from `proxy.difficulty` (§4.4 "mining.set_target").
    pub target_hex: String,
    pub difficulty: i64,
    pub hashrate_expiration: Duration,
    fails: AtomicU64,
}

impl Pool {
    pub fn new(config: &PoolConfig, upstreams: Arc<UpstreamSupervisor>, store: Arc<dyn Store>) -> Self {
        let pow_limit = pow_limit_test();
        let target = target_from_difficulty(&pow_limit, config.proxy.difficulty.max(0) as u64);
        let assembler = Arc::new(WorkAssembler::new(upstreams.clone(), config.pool_address.clone()));

        Pool {
            proxy: config.proxy.clone(),
            upstreams,
            assembler,
            registry: Arc::new(SessionRegistry::new()),
            store,
            extranonce_counter: ExtraNonceCounter::new(config.instance_id),
            target_hex: target_to_hex(&target),
            difficulty: config.proxy.difficulty,
            hashrate_expiration: must_parse_duration(&config.proxy.hashrate_expiration),
            fails: AtomicU64::new(0),
        }
    }

    /// §5 "if health_check && fails_count >= max_fails, the pool is sick
    /// and broadcasts are suppressed" — here gating the initial `notify`
    /// an `authorize` success sends, not the periodic broadcast itself.
    pub fn is_sick(&self) -> bool {
        self.proxy.health_check && self.fails.load(Ordering::Relaxed) as i64 >= self.proxy.max_fails
    }

    fn mark_state_write_ok(&self) {
        self.fails.store(0, Ordering::Relaxed);
    }

    fn mark_state_write_failed(&self) {
        self.fails.fetch_add(1, Ordering::Relaxed);
    }
}

/// Runs the work-refresh timer, the node-state timer and (if enabled) the
/// Stratum TCP listener until the process exits or a fatal I/O error
/// occurs binding the listen socket (§7 "cannot bind listen socket").
pub async fn run(pool: Arc<Pool>) -> Result<(), StratumError> {
    pool.assembler.refresh().await;

    spawn_refresh_timer(&pool);
    spawn_state_timer(&pool);

    if !pool.proxy.stratum.enabled {
        info!("stratum disabled; running the work pipeline without a miner-facing listener");
        future::pending::<()>().await;
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(&pool.proxy.stratum.listen).await?;
    info!("stratum listening on {}", pool.proxy.stratum.listen);

    let timeout = must_parse_duration(&pool.proxy.stratum.timeout);
    let semaphore = Arc::new(Semaphore::new(pool.proxy.stratum.max_conn));

    loop {
        let (socket, addr) = listener.accept().await?;
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("connection semaphore is never closed");
        let pool = pool.clone();
        tokio::spawn(async move {
            handle_connection(pool, socket, addr, timeout).await;
            drop(permit);
        });
    }
}

fn spawn_refresh_timer(pool: &Arc<Pool>) {
    let pool = pool.clone();
    let interval = must_parse_duration(&pool.proxy.block_refresh_interval);
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        loop {
            ticker.tick().await;
            if let Some(work) = pool.assembler.refresh().await {
                if pool.proxy.stratum.enabled {
                    broadcast_work(&pool.registry, &work).await;
                }
            }
        }
    });
}

fn spawn_state_timer(pool: &Arc<Pool>) {
    let pool = pool.clone();
    let interval = must_parse_duration(&pool.proxy.state_update_interval);
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        loop {
            ticker.tick().await;
            let upstream = pool.upstreams.active();
            let Some(work) = pool.assembler.current() else {
                continue;
            };
            let state = NodeState {
                name: upstream.name.clone(),
                height: work.height,
                difficulty: work.difficulty.to_string(),
            };
            match pool.store.write_node_state(state).await {
                Ok(()) => pool.mark_state_write_ok(),
                Err(err) => {
                    warn!("writing node state: {err}");
                    pool.mark_state_write_failed();
                }
            }
        }
    });
}

async fn handle_connection(pool: Arc<Pool>, socket: TcpStream, addr: SocketAddr, timeout: Duration) {
    if let Err(err) = socket.set_nodelay(true) {
        warn!("{addr}: failed to set TCP_NODELAY: {err}");
    }

    let (read_half, write_half) = socket.into_split();
    let id = pool.registry.next_id();
    let session = Arc::new(Session::new(id, addr, write_half, timeout));

    let codec = LinesCodec::new_with_max_length(MAX_LINE_BYTES);
    let mut lines = FramedRead::new(read_half, codec);

    // The deadline is shared with `Session::send`, so a push (broadcast or
    // `mining.notify`/`set_target`) extends it the same way an inbound
    // message does (§4.4, §5) — a session fed only by broadcasts must not
    // be dropped just because it never sends anything back. `remaining()`
    // is re-read every iteration since a push received while we slept can
    // have moved the deadline forward.
    loop {
        tokio::select! {
            next = lines.next() => {
                let line = match next {
                    None => break,
                    Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                        warn!("{addr}: socket flood, closing connection");
                        break;
                    }
                    Some(Err(err)) => {
                        warn!("{addr}: line read error: {err}");
                        break;
                    }
                    Some(Ok(line)) => line,
                };
                session.touch();

                let trimmed = line.trim();
                if trimmed.len() <= 1 {
                    continue;
                }

                if let Err(err) = dispatch_line(&pool, &session, trimmed).await {
                    warn!("{addr}: closing connection: {err}");
                    break;
                }
            }
            _ = time::sleep(session.remaining()) => {
                if session.expired() {
                    info!("{addr}: deadline expired, closing connection");
                    break;
                }
                // A push extended the deadline while we slept; loop and
                // sleep against the new remaining time.
            }
        }
    }

    pool.registry.remove(id).await;
}
