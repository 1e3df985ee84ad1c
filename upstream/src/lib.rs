//! JSON-RPC client to one or more Zcash full nodes, with per-node
//! sick/alive health tracking and atomic failover between them (§4.2).

pub mod client;
pub mod supervisor;

pub use client::{BlockInfo, MiningInfo, UpstreamClient, UpstreamError};
pub use supervisor::UpstreamSupervisor;
