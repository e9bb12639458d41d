// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::error::{Error, Result};
use bytes::Bytes;
use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};
use swarm_protocol::{storage::Chunk, ChunkAddress};

/// Max number of chunks a node chunk store holds before pruning.
const MAX_RECORDS_COUNT: usize = 2048;

/// Local content-addressed chunk cache.
///
/// Implementations are only called under the coalescer's lock and must be
/// idempotent on duplicate puts. Placeholders for outstanding retrievals are
/// not its concern; the store only ever holds populated chunks.
pub trait ChunkStore: Send + Sync {
    fn get(&self, address: &ChunkAddress) -> Result<Option<Chunk>>;
    fn put(&self, chunk: Chunk) -> Result<()>;
    fn contains(&self, address: &ChunkAddress) -> bool;
}

/// Memory-tier chunk store.
#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    chunks: RwLock<HashMap<ChunkAddress, Chunk>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chunks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChunkStore for MemoryChunkStore {
    fn get(&self, address: &ChunkAddress) -> Result<Option<Chunk>> {
        let chunks = self.chunks.read().unwrap_or_else(PoisonError::into_inner);
        Ok(chunks.get(address).cloned())
    }

    fn put(&self, chunk: Chunk) -> Result<()> {
        let mut chunks = self.chunks.write().unwrap_or_else(PoisonError::into_inner);
        let _ = chunks.entry(*chunk.address()).or_insert(chunk);
        Ok(())
    }

    fn contains(&self, address: &ChunkAddress) -> bool {
        let chunks = self.chunks.read().unwrap_or_else(PoisonError::into_inner);
        chunks.contains_key(address)
    }
}

/// Configuration for a [`NodeChunkStore`].
#[derive(Debug, Clone)]
pub struct NodeChunkStoreConfig {
    /// The directory where the chunks are stored.
    pub storage_dir: PathBuf,
    /// The maximum number of chunks.
    pub max_records: usize,
}

impl Default for NodeChunkStoreConfig {
    fn default() -> Self {
        Self {
            storage_dir: std::env::temp_dir(),
            max_records: MAX_RECORDS_COUNT,
        }
    }
}

/// A chunk store that keeps payloads on disk, one file per chunk named by
/// its hex address, with an in-memory key index.
///
/// When full it prunes the key furthest from the owning node, and refuses
/// the put when the incoming key is even further out.
pub struct NodeChunkStore {
    /// Overlay address of the node owning the store.
    local: ChunkAddress,
    config: NodeChunkStoreConfig,
    records: RwLock<HashSet<ChunkAddress>>,
}

impl NodeChunkStore {
    /// Creates the store, making sure the storage directory exists.
    pub fn with_config(local: ChunkAddress, config: NodeChunkStoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.storage_dir)?;
        Ok(Self {
            local,
            config,
            records: RwLock::new(HashSet::new()),
        })
    }

    fn chunk_path(&self, address: &ChunkAddress) -> PathBuf {
        self.config.storage_dir.join(address.to_hex())
    }

    // XOR distance order of two keys as seen from `local`.
    fn distance_cmp(local: &ChunkAddress, lhs: &ChunkAddress, rhs: &ChunkAddress) -> Ordering {
        for ((origin, one), other) in local
            .as_bytes()
            .iter()
            .zip(lhs.as_bytes())
            .zip(rhs.as_bytes())
        {
            let lhs_distance = origin ^ one;
            let rhs_distance = origin ^ other;
            if lhs_distance != rhs_distance {
                return lhs_distance.cmp(&rhs_distance);
            }
        }
        Ordering::Equal
    }

    /// Prunes the furthest record to free space for `incoming`.
    ///
    /// An error is returned if we are full and the incoming chunk is not
    /// closer than the furthest record we hold.
    fn prune_storage_if_needed_for_record(
        &self,
        records: &mut HashSet<ChunkAddress>,
        incoming: &ChunkAddress,
    ) -> Result<()> {
        if records.len() < self.config.max_records {
            return Ok(());
        }

        let furthest = records
            .iter()
            .max_by(|one, other| Self::distance_cmp(&self.local, one, other))
            .copied();

        if let Some(furthest) = furthest {
            if Self::distance_cmp(&self.local, incoming, &furthest) == Ordering::Less {
                trace!("{furthest:?} will be pruned to make space for new chunk {incoming:?}");
                let _ = records.remove(&furthest);
                if let Err(err) = fs::remove_file(self.chunk_path(&furthest)) {
                    warn!("Failed to remove pruned chunk {furthest:?} from disk: {err:?}");
                }
            } else {
                warn!(
                    "Chunk {incoming:?} not stored. Maximum number of records reached: {}",
                    records.len()
                );
                return Err(Error::MaxRecords);
            }
        }

        Ok(())
    }
}

impl ChunkStore for NodeChunkStore {
    fn get(&self, address: &ChunkAddress) -> Result<Option<Chunk>> {
        {
            let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
            if !records.contains(address) {
                return Ok(None);
            }
        }
        // The index said the chunk is on disk; a read failure here is
        // corruption and bubbles up unchanged.
        let value = fs::read(self.chunk_path(address))?;
        Ok(Some(Chunk::from_parts(*address, Bytes::from(value))))
    }

    fn put(&self, chunk: Chunk) -> Result<()> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if records.contains(chunk.address()) {
            return Ok(());
        }
        self.prune_storage_if_needed_for_record(&mut records, chunk.address())?;

        fs::write(self.chunk_path(chunk.address()), chunk.value())?;
        trace!("Wrote chunk {:?} to disk", chunk.address());
        let _ = records.insert(*chunk.address());
        Ok(())
    }

    fn contains(&self, address: &ChunkAddress) -> bool {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.contains(address)
    }
}
