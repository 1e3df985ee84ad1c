//! Shared domain types for the zecpool work pipeline: block templates,
//! derived work, per-connection session state, upstream descriptors and
//! pool configuration.

pub mod config;
pub mod session;
pub mod template;
pub mod upstream;
pub mod work;

pub use config::{PoolConfig, ProxyConfig, StratumConfig, UpstreamConfig};
pub use session::SessionState;
pub use template::{BlockTemplate, CoinbaseMeta, TemplateTransaction};
pub use upstream::UpstreamStatus;
pub use work::Work;

/// A 32-byte hash, stored in whatever byte order the producer hands it to
/// us; callers reverse explicitly at the points the spec calls for it.
pub type Hash256 = [u8; 32];
