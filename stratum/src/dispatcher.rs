//! Per-connection protocol dispatch (§4.4): request/reply/push framing and
//! the `subscribe`/`authorize`/`submit`/`extranonce.subscribe` handlers.
//!
//! The method table in §4.4 is not enforced as a rigid prior-state gate —
//! per the source's own behaviour (§9 design notes), `authorize` does not
//! actually check that `subscribe` ran first. `submit` is the one method
//! that demands both, and it checks so directly.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::pool::Pool;
use crate::session::Session;
use crate::validator::{validate_share, ShareContext};
use crate::StratumError;

static LOGIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9A-Za-z]{0,40}$").unwrap());
static WORKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-zA-Z_-]{1,8}$").unwrap());
static NTIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f]{8}$").unwrap());
static NONCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f]{64}$").unwrap());

/// The Equihash(200,9) solution hex length the spec fixes: 1344 solution
/// bytes plus the 3-byte `fd4005` compact-size prefix, in hex.
const SOLUTION_HEX_LEN: usize = 2694;

#[derive(Debug, Deserialize)]
struct Request {
    id: Value,
    #[serde(default)]
    method: String,
    #[serde(default)]
    params: Value,
}

pub fn success_reply(id: &Value, result: Value) -> Value {
    json!({"id": id, "jsonrpc": "2.0", "result": result, "error": Value::Null})
}

pub fn error_reply(id: &Value, code: i32, message: &str) -> Value {
    json!({"id": id, "jsonrpc": "2.0", "error": {"code": code, "message": message}})
}

pub fn push(method: &str, params: Value) -> Value {
    json!({"id": 0, "jsonrpc": "2.0", "method": method, "params": params})
}

/// Parses and dispatches one inbound line. An `Err` here means a protocol
/// violation (malformed JSON, or a push/reply that failed to write) and
/// the caller must close the connection; semantic and share rejects are
/// sent as an error reply and the read loop continues.
pub async fn dispatch_line(pool: &Pool, session: &std::sync::Arc<Session>, line: &str) -> Result<(), StratumError> {
    let request: Request = serde_json::from_str(line)?;
    match request.method.as_str() {
        "mining.subscribe" => handle_subscribe(pool, session, &request.id).await,
        "mining.authorize" => handle_authorize(pool, session, &request.id, &request.params).await,
        "mining.submit" => handle_submit(pool, session, &request.id, &request.params).await,
        "mining.extranonce.subscribe" => {
            session.send(&error_reply(&request.id, 20, "Not supported.")).await
        }
        _ => session.send(&error_reply(&request.id, -3, "Method not found")).await,
    }
}

async fn handle_subscribe(pool: &Pool, session: &Session, id: &Value) -> Result<(), StratumError> {
    let extranonce1 = pool.extranonce_counter.next_hex();
    session.state.lock().await.extranonce1 = Some(extranonce1.clone());
    session.send(&success_reply(id, json!(["0", extranonce1]))).await
}

async fn handle_authorize(
    pool: &Pool,
    session: &std::sync::Arc<Session>,
    id: &Value,
    params: &Value,
) -> Result<(), StratumError> {
    let login = params.get(0).and_then(Value::as_str).unwrap_or("");
    if !LOGIN_RE.is_match(login) {
        return session.send(&error_reply(id, -1, "Invalid login")).await;
    }
    let login = login.to_string();

    {
        let mut state = session.state.lock().await;
        state.login = Some(login);
        state.authorized = true;
    }
    pool.registry.insert(session.id, session.clone()).await;

    session.send(&success_reply(id, json!(true))).await?;
    session.send(&push("mining.set_target", json!([pool.target_hex.clone()]))).await?;

    if !pool.is_sick() {
        if let Some(work) = pool.assembler.current() {
            session
                .send(&push("mining.notify", Value::Array(work.notify_params())))
                .await?;
        }
    }
    Ok(())
}

async fn handle_submit(pool: &Pool, session: &Session, id: &Value, params_value: &Value) -> Result<(), StratumError> {
    let params: Vec<String> = match params_value.as_array() {
        Some(arr) if arr.len() == 5 => match arr.iter().map(|v| v.as_str().map(String::from)).collect() {
            Some(p) => p,
            None => return session.send(&error_reply(id, -1, "Invalid params")).await,
        },
        _ => return session.send(&error_reply(id, -1, "Invalid params")).await,
    };

    let raw_worker = &params[0];
    let worker_id = if WORKER_RE.is_match(raw_worker) {
        raw_worker.clone()
    } else {
        "0".to_string()
    };

    let ntime = &params[2];
    if !NTIME_RE.is_match(ntime) {
        return session.send(&error_reply(id, -1, "Malformed nTime result")).await;
    }

    let (login, extranonce1, authorized) = {
        let state = session.state.lock().await;
        (state.login.clone().unwrap_or_default(), state.extranonce1.clone(), state.authorized)
    };

    let extranonce2 = &params[3];
    let combined = format!("{}{extranonce2}", extranonce1.as_deref().unwrap_or(""));
    if !NONCE_RE.is_match(&combined) {
        return session.send(&error_reply(id, -1, "Malformed nonce result")).await;
    }

    let solution = &params[4];
    if solution.len() != SOLUTION_HEX_LEN {
        return session
            .send(&error_reply(id, -1, "Malformed solution result, != 2694 length"))
            .await;
    }

    if !authorized {
        return session.send(&error_reply(id, 24, "Not authorized")).await;
    }
    let extranonce1 = match extranonce1 {
        Some(e) => e,
        None => return session.send(&error_reply(id, 25, "Not subscribed")).await,
    };

    let work = match pool.assembler.current() {
        Some(work) => work,
        None => return session.send(&error_reply(id, 23, "Low difficulty share")).await,
    };

    let ctx = ShareContext {
        work,
        extranonce1,
        pool_difficulty: pool.difficulty,
        upstreams: pool.upstreams.clone(),
        store: pool.store.clone(),
        assembler: pool.assembler.clone(),
        registry: pool.registry.clone(),
        hashrate_expiration: pool.hashrate_expiration,
    };

    match validate_share(&ctx, &login, &worker_id, &params).await {
        Ok(()) => session.send(&success_reply(id, json!(true))).await,
        Err(reject) => session.send(&error_reply(id, reject.code, reject.message)).await,
    }
}
