//! A single upstream Zcash node: a JSON-RPC 2.0 client plus the sick/alive
//! rolling counters §4.2 specifies.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use zecpool_core::{BlockTemplate, UpstreamStatus};

/// Reaching this many consecutive failures marks the client sick;
/// reaching it in successes clears sick and resets both counters.
const SICK_THRESHOLD: u64 = 5;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("http request to {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("decoding response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{method} on {name} returned an RPC error: {message}")]
    Rpc {
        name: String,
        method: &'static str,
        message: String,
    },

    #[error("{method} on {name} returned no result")]
    EmptyResult { name: String, method: &'static str },
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u32,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MiningInfo {
    pub blocks: i64,
    pub difficulty: f64,
    #[serde(default)]
    pub networksolps: i64,
    #[serde(default)]
    pub testnet: bool,
    #[serde(default)]
    pub chain: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockInfo {
    pub hash: String,
    pub confirmations: i64,
    pub height: i64,
}

/// One configured Zcash node. Cheap to clone (the HTTP client and counters
/// are reference-counted internally by `reqwest`/atomics).
pub struct UpstreamClient {
    pub name: String,
    pub url: String,
    http: reqwest::Client,
    sick: AtomicBool,
    sick_rate: AtomicU64,
    success_rate: AtomicU64,
}

impl UpstreamClient {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("building the upstream HTTP client with a fixed timeout cannot fail");
        UpstreamClient {
            name: name.into(),
            url: url.into(),
            http,
            sick: AtomicBool::new(false),
            sick_rate: AtomicU64::new(0),
            success_rate: AtomicU64::new(0),
        }
    }

    pub fn is_sick(&self) -> bool {
        self.sick.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> UpstreamStatus {
        UpstreamStatus {
            sick: self.is_sick(),
            sick_rate: self.sick_rate.load(Ordering::Relaxed),
            success_rate: self.success_rate.load(Ordering::Relaxed),
        }
    }

    fn mark_sick(&self) {
        self.success_rate.store(0, Ordering::Relaxed);
        let count = self.sick_rate.fetch_add(1, Ordering::Relaxed) + 1;
        if count >= SICK_THRESHOLD {
            self.sick.store(true, Ordering::Relaxed);
        }
    }

    fn mark_alive(&self) {
        let count = self.success_rate.fetch_add(1, Ordering::Relaxed) + 1;
        if count >= SICK_THRESHOLD {
            self.sick.store(false, Ordering::Relaxed);
            self.sick_rate.store(0, Ordering::Relaxed);
            self.success_rate.store(0, Ordering::Relaxed);
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<T, UpstreamError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 0,
        };

        let send = async {
            let resp = self
                .http
                .post(&self.url)
                .json(&request)
                .send()
                .await
                .map_err(|source| UpstreamError::Http {
                    url: self.url.clone(),
                    source,
                })?
                .error_for_status()
                .map_err(|source| UpstreamError::Http {
                    url: self.url.clone(),
                    source,
                })?;
            let body = resp.text().await.map_err(|source| UpstreamError::Http {
                url: self.url.clone(),
                source,
            })?;
            let decoded: RpcResponse =
                serde_json::from_str(&body).map_err(|source| UpstreamError::Decode {
                    url: self.url.clone(),
                    source,
                })?;

            if let Some(error) = decoded.error {
                return Err(UpstreamError::Rpc {
                    name: self.name.clone(),
                    method,
                    message: error.to_string(),
                });
            }
            let result = decoded.result.ok_or_else(|| UpstreamError::EmptyResult {
                name: self.name.clone(),
                method,
            })?;
            serde_json::from_value(result).map_err(|source| UpstreamError::Decode {
                url: self.url.clone(),
                source,
            })
        };

        match send.await {
            Ok(value) => {
                self.mark_alive();
                Ok(value)
            }
            Err(err) => {
                self.mark_sick();
                Err(err)
            }
        }
    }

    pub async fn get_block_template(&self) -> Result<BlockTemplate, UpstreamError> {
        self.call("getblocktemplate", Value::Array(vec![])).await
    }

    pub async fn submit_block(&self, block_hex: &str) -> Result<Value, UpstreamError> {
        self.call(
            "submitblock",
            Value::Array(vec![Value::String(block_hex.to_string())]),
        )
        .await
    }

    pub async fn get_mining_info(&self) -> Result<MiningInfo, UpstreamError> {
        self.call("getmininginfo", Value::Array(vec![])).await
    }

    pub async fn get_block(&self, height: u64) -> Result<BlockInfo, UpstreamError> {
        self.call(
            "getblock",
            Value::Array(vec![Value::String(height.to_string())]),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_healthy() {
        let client = UpstreamClient::new("main", "http://127.0.0.1:1", Duration::from_secs(1));
        assert!(!client.is_sick());
        assert_eq!(client.status().sick_rate, 0);
    }

    #[test]
    fn five_consecutive_failures_mark_sick() {
        let client = UpstreamClient::new("main", "http://127.0.0.1:1", Duration::from_secs(1));
        for _ in 0..SICK_THRESHOLD {
            client.mark_sick();
        }
        assert!(client.is_sick());
    }

    #[test]
    fn five_consecutive_successes_clear_sick() {
        let client = UpstreamClient::new("main", "http://127.0.0.1:1", Duration::from_secs(1));
        for _ in 0..SICK_THRESHOLD {
            client.mark_sick();
        }
        assert!(client.is_sick());
        for _ in 0..SICK_THRESHOLD {
            client.mark_alive();
        }
        assert!(!client.is_sick());
        let status = client.status();
        assert_eq!(status.sick_rate, 0);
        assert_eq!(status.success_rate, 0);
    }

    #[test]
    fn a_single_failure_resets_the_success_streak() {
        let client = UpstreamClient::new("main", "http://127.0.0.1:1", Duration::from_secs(1));
        client.mark_alive();
        client.mark_alive();
        client.mark_sick();
        assert_eq!(client.status().success_rate, 0);
    }
}
