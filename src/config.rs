//! Pool config loading: reads `PoolConfig` (§6) from a JSON file, writing
//! a default one out if none exists yet, in the pattern `superuser122`'s
//! settings loader uses for its miner config.

use std::fs;
use std::io;
use std::path::Path;

use zecpool_core::PoolConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config file: {0}")]
    Io(#[from] io::Error),

    #[error("parsing config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Loads `PoolConfig` from `path`. If the file does not exist, writes out
/// `PoolConfig::default()` and returns it, so a fresh checkout has
/// something runnable to edit.
pub fn load(path: &Path) -> Result<PoolConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(data) => Ok(serde_json::from_str(&data)?),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let default = PoolConfig::default();
            let json = serde_json::to_string_pretty(&default)?;
            fs::write(path, json)?;
            Ok(default)
        }
        Err(err) => Err(err.into()),
    }
}
