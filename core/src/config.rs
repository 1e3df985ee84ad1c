//! Pool configuration, matching the options enumerated in the external
//! interfaces section: everything an operator can set in the config file.
//! Loading this from disk is the root binary's job, not the core
//! pipeline's — see `zecpool::config` for the loader.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub name: String,
    pub url: String,
    /// Go-style duration string (`"10s"`), parsed by `zecpool_util::parse_duration`.
    pub timeout: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StratumConfig {
    pub enabled: bool,
    pub listen: String,
    pub timeout: String,
    pub max_conn: usize,
}

impl Default for StratumConfig {
    fn default() -> Self {
        StratumConfig {
            enabled: true,
            listen: "0.0.0.0:3032".to_string(),
            timeout: "15m".to_string(),
            max_conn: 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    pub listen: String,
    pub block_refresh_interval: String,
    /// Integer difficulty handed to every miner; the pool's own per-miner
    /// target is derived once from this at startup.
    pub difficulty: i64,
    pub state_update_interval: String,
    pub hashrate_expiration: String,
    pub health_check: bool,
    pub max_fails: i64,
    pub stratum: StratumConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            listen: "0.0.0.0:8080".to_string(),
            block_refresh_interval: "15s".to_string(),
            difficulty: 4000,
            state_update_interval: "3s".to_string(),
            hashrate_expiration: "3h".to_string(),
            health_check: true,
            max_fails: 100,
            stratum: StratumConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolConfig {
    pub name: String,
    pub pool_address: String,
    pub instance_id: u32,
    pub threads: usize,
    pub upstream: Vec<UpstreamConfig>,
    pub upstream_check_interval: String,
    pub proxy: ProxyConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            name: "zecpool".to_string(),
            pool_address: String::new(),
            instance_id: 1,
            threads: num_cpus_fallback(),
            upstream: vec![UpstreamConfig {
                name: "main".to_string(),
                url: "http://127.0.0.1:8232".to_string(),
                timeout: "10s".to_string(),
            }],
            upstream_check_interval: "5s".to_string(),
            proxy: ProxyConfig::default(),
        }
    }
}

fn num_cpus_fallback() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
