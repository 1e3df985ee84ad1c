//! A minimal read-only HTTP surface over the durable store and the
//! upstream supervisor: a process-health check for whatever dashboard or
//! monitoring scrapes the pool, not a control plane.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use thiserror::Error;

use zecpool_storage::{BlockRecord, ShareRecord, Store};
use zecpool_upstream::UpstreamSupervisor;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("serving stats API: {0}")]
    Serve(#[from] hyper::Error),
}

#[derive(Clone)]
pub struct ApiState {
    pub pool_name: String,
    pub store: Arc<dyn Store>,
    pub upstreams: Arc<UpstreamSupervisor>,
}

#[derive(Debug, Serialize)]
pub struct UpstreamSummary {
    pub name: String,
    pub sick: bool,
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub pool_name: String,
    pub upstreams: Vec<UpstreamSummary>,
}

/// Serves `/stats`, `/shares` and `/blocks` on `addr` until the process
/// exits or the listener fails to bind.
pub async fn serve(addr: SocketAddr, state: ApiState) -> Result<(), ApiError> {
    let app = Router::new()
        .route("/stats", get(stats))
        .route("/shares", get(shares))
        .route("/blocks", get(blocks))
        .with_state(state);

    axum::Server::bind(&addr).serve(app.into_make_service()).await?;
    Ok(())
}

async fn stats(State(state): State<ApiState>) -> Json<StatsResponse> {
    let active_name = state.upstreams.active().name.clone();
    let upstreams = state
        .upstreams
        .all()
        .iter()
        .map(|u| UpstreamSummary {
            name: u.name.clone(),
            sick: u.is_sick(),
            active: u.name == active_name,
        })
        .collect();

    Json(StatsResponse {
        pool_name: state.pool_name,
        upstreams,
    })
}

async fn shares(State(state): State<ApiState>) -> Json<Vec<ShareRecord>> {
    Json(state.store.shares().await.unwrap_or_default())
}

async fn blocks(State(state): State<ApiState>) -> Json<Vec<BlockRecord>> {
    Json(state.store.blocks().await.unwrap_or_default())
}
