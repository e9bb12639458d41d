// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

#[macro_use]
extern crate tracing;

/// Local chunk storage tiers.
pub mod chunk_store;
/// Outbound connection scheduling.
pub mod dialer;
/// Errors.
pub mod error;
/// Chunk retrieval, request coalescing and response propagation.
pub mod netstore;
/// Seams towards peers, the routing table and discovery.
pub mod peer;
/// Durable log of served request ids.
pub mod request_db;

pub use self::{
    chunk_store::{ChunkStore, MemoryChunkStore, NodeChunkStore, NodeChunkStoreConfig},
    dialer::{ConnFlag, DialScheduler, DialerConfig, DiscoveryTable, Task},
    error::Error,
    netstore::{NetStore, NetStoreConfig},
    peer::{CreditError, Hive, PeerLink},
    request_db::{MemoryRequestDb, RequestDb},
};
