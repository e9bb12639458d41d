// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use swarm_protocol::{
    messages::{PeersResponse, RetrieveRequest, StoreRequest},
    node::NodeRecord,
    ChunkAddress,
};
use thiserror::Error;

/// A peer's credit ledger refused a charge.
#[derive(Debug, Error)]
#[error("Insufficient credit")]
pub struct CreditError;

/// Handle to a connected remote peer.
///
/// Sends may block on the transport and are therefore dispatched off the
/// coalescer's lock; a failed send is logged and otherwise treated as a
/// no-op, deadlines do the rest.
#[async_trait]
pub trait PeerLink: Send + Sync + 'static {
    /// The overlay address of the remote node.
    fn overlay_address(&self) -> ChunkAddress;

    /// The node descriptor handed out in peer hints.
    fn node_record(&self) -> NodeRecord;

    /// Adjusts the SWAP balance held against this peer. Positive when the
    /// peer owes us work, negative when we owe it. The ledger is the
    /// admission gate: a refused charge drops the request being admitted.
    fn credit(&self, delta: i64) -> std::result::Result<(), CreditError>;

    /// Hands the peer a chunk.
    async fn store(&self, request: StoreRequest) -> Result<()>;

    /// Asks the peer for a chunk.
    async fn retrieve(&self, request: RetrieveRequest) -> Result<()>;

    /// Sends the peer hints about nodes near an address.
    async fn peers(&self, response: PeersResponse) -> Result<()>;
}

/// The routing table: peers by proximity to an address.
pub trait Hive<P>: Send + Sync {
    /// The `n` connected peers closest to `target`, closest first.
    /// `n == 0` asks for the whole routing neighbourhood of the address.
    fn peers_near(&self, target: &ChunkAddress, n: usize) -> Vec<Arc<P>>;
}
