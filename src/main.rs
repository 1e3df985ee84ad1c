//! zecpool - Zcash Stratum mining pool entry point.
//!
//! Loads the pool configuration, wires the upstream supervisor, the
//! durable store, the work pipeline and the optional stats API, then
//! runs them until the process is killed.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use zecpool_core::PoolConfig;
use zecpool_storage::JsonStore;
use zecpool_upstream::{UpstreamClient, UpstreamSupervisor};
use zecpool_util::must_parse_duration;

mod config;

/// Command line arguments for the zecpool node.
#[derive(Parser)]
#[clap(name = "zecpool")]
#[clap(about = "A Zcash Stratum mining pool")]
struct Cli {
    /// Path to the pool's JSON config file.
    #[clap(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,

    /// Directory the JSON store keeps shares/blocks/node-state under.
    #[clap(long, value_name = "DIR", default_value = "data")]
    datadir: PathBuf,

    /// Increase logging verbosity; repeat for more (-v, -vv, -vvv).
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Initializes the `log`/`env_logger` backend from a repeated `-v` flag,
/// mirroring the teacher's verbosity-to-level mapping.
fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    info!("starting zecpool");

    let pool_config: PoolConfig = match config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("cannot parse configuration at {}: {err}", cli.config.display());
            process::exit(1);
        }
    };

    if pool_config.upstream.is_empty() {
        error!("configuration names no upstreams");
        process::exit(1);
    }

    let upstream_clients: Vec<Arc<UpstreamClient>> = pool_config
        .upstream
        .iter()
        .map(|u| {
            let timeout = must_parse_duration(&u.timeout);
            Arc::new(UpstreamClient::new(u.name.clone(), u.url.clone(), timeout))
        })
        .collect();
    let upstreams = Arc::new(UpstreamSupervisor::new(upstream_clients));

    let store = match JsonStore::new(cli.datadir.clone()).await {
        Ok(store) => Arc::new(store),
        Err(err) => {
            error!("cannot open store at {}: {err}", cli.datadir.display());
            process::exit(1);
        }
    };

    let upstream_check_interval = must_parse_duration(&pool_config.upstream_check_interval);
    spawn_upstream_supervisor(upstreams.clone(), upstream_check_interval);

    let pool = Arc::new(zecpool_stratum::Pool::new(&pool_config, upstreams.clone(), store.clone()));

    if let Ok(api_addr) = pool_config.proxy.listen.parse() {
        let api_state = zecpool_api::ApiState {
            pool_name: pool_config.name.clone(),
            store: store.clone(),
            upstreams: upstreams.clone(),
        };
        tokio::spawn(async move {
            if let Err(err) = zecpool_api::serve(api_addr, api_state).await {
                error!("stats API stopped: {err}");
            }
        });
    } else {
        error!("invalid proxy.listen address {:?}; stats API disabled", pool_config.proxy.listen);
    }

    if let Err(err) = zecpool_stratum::run(pool).await {
        error!("pool stopped: {err}");
        process::exit(1);
    }
}

fn spawn_upstream_supervisor(upstreams: Arc<UpstreamSupervisor>, interval: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            upstreams.check().await;
        }
    });
}
