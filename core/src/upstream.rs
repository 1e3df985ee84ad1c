//! A point-in-time snapshot of an upstream's health, for logging and the
//! stats surface. The live atomic counters driving these numbers belong to
//! `zecpool-upstream::UpstreamClient`, which depends on this crate, not
//! the other way around.

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct UpstreamStatus {
    pub sick: bool,
    pub sick_rate: u64,
    pub success_rate: u64,
}
