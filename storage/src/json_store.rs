//! JSON-file-backed [`Store`](crate::Store) implementation. Appends shares
//! and blocks to flat JSON files under a base directory and keeps the
//! latest node-state snapshot per upstream name, loading whatever already
//! exists on startup.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use async_trait::async_trait;
use log::warn;
use tokio::sync::RwLock;

use crate::{BlockRecord, NodeState, ShareRecord, Store, StorageError};

pub struct JsonStore {
    base_dir: PathBuf,
    shares: RwLock<Vec<ShareRecord>>,
    blocks: RwLock<Vec<BlockRecord>>,
    node_states: RwLock<HashMap<String, NodeState>>,
}

impl JsonStore {
    pub async fn new(base_dir: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_dir)?;
        let store = JsonStore {
            base_dir,
            shares: RwLock::new(Vec::new()),
            blocks: RwLock::new(Vec::new()),
            node_states: RwLock::new(HashMap::new()),
        };
        store.load().await?;
        Ok(store)
    }

    fn shares_path(&self) -> PathBuf {
        self.base_dir.join("shares.json")
    }

    fn blocks_path(&self) -> PathBuf {
        self.base_dir.join("blocks.json")
    }

    fn node_states_path(&self) -> PathBuf {
        self.base_dir.join("node_states.json")
    }

    async fn load(&self) -> Result<(), StorageError> {
        if self.shares_path().exists() {
            let file = File::open(self.shares_path())?;
            *self.shares.write().await = serde_json::from_reader(BufReader::new(file))?;
        }
        if self.blocks_path().exists() {
            let file = File::open(self.blocks_path())?;
            *self.blocks.write().await = serde_json::from_reader(BufReader::new(file))?;
        }
        if self.node_states_path().exists() {
            let file = File::open(self.node_states_path())?;
            *self.node_states.write().await = serde_json::from_reader(BufReader::new(file))?;
        }
        Ok(())
    }

    fn persist<T: serde::Serialize>(path: PathBuf, value: &T) -> Result<(), StorageError> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), value)?;
        Ok(())
    }
}

#[async_trait]
impl Store for JsonStore {
    async fn write_share(&self, record: ShareRecord) -> Result<bool, StorageError> {
        let mut shares = self.shares.write().await;
        let exists = shares
            .iter()
            .any(|s| s.login == record.login && s.params == record.params);
        if !exists {
            shares.push(record);
            if let Err(err) = Self::persist(self.shares_path(), &*shares) {
                warn!("failed to persist share: {err}");
                return Err(err);
            }
        }
        Ok(exists)
    }

    async fn write_block(&self, record: BlockRecord) -> Result<bool, StorageError> {
        let mut blocks = self.blocks.write().await;
        let exists = blocks.iter().any(|b| b.block_hash_hex == record.block_hash_hex);
        if !exists {
            blocks.push(record);
            if let Err(err) = Self::persist(self.blocks_path(), &*blocks) {
                warn!("failed to persist block: {err}");
                return Err(err);
            }
        }
        Ok(exists)
    }

    async fn write_node_state(&self, state: NodeState) -> Result<(), StorageError> {
        let mut states = self.node_states.write().await;
        states.insert(state.name.clone(), state);
        Self::persist(self.node_states_path(), &*states)
    }

    async fn shares(&self) -> Result<Vec<ShareRecord>, StorageError> {
        Ok(self.shares.read().await.clone())
    }

    async fn blocks(&self) -> Result<Vec<BlockRecord>, StorageError> {
        Ok(self.blocks.read().await.clone())
    }

    async fn node_states(&self) -> Result<Vec<NodeState>, StorageError> {
        Ok(self.node_states.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn share(login: &str, params: Vec<&str>) -> ShareRecord {
        ShareRecord {
            login: login.to_string(),
            worker_id: "0".to_string(),
            params: params.into_iter().map(String::from).collect(),
            difficulty: 4000,
            height: 100,
            expiration: 0,
        }
    }

    #[tokio::test]
    async fn writing_the_same_share_twice_reports_existence() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().to_path_buf()).await.unwrap();

        let first = store.write_share(share("alice", vec!["a", "b"])).await.unwrap();
        let second = store.write_share(share("alice", vec!["a", "b"])).await.unwrap();

        assert!(!first);
        assert!(second);
        assert_eq!(store.shares().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reloading_from_disk_recovers_prior_writes() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonStore::new(dir.path().to_path_buf()).await.unwrap();
            store.write_share(share("alice", vec!["a"])).await.unwrap();
        }
        let reloaded = JsonStore::new(dir.path().to_path_buf()).await.unwrap();
        assert_eq!(reloaded.shares().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn node_state_writes_are_keyed_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().to_path_buf()).await.unwrap();
        store
            .write_node_state(NodeState {
                name: "main".into(),
                height: 10,
                difficulty: "1000".into(),
            })
            .await
            .unwrap();
        store
            .write_node_state(NodeState {
                name: "main".into(),
                height: 11,
                difficulty: "1000".into(),
            })
            .await
            .unwrap();
        let states = store.node_states().await.unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].height, 11);
    }
}
