// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::{messages::next_request_id, ChunkAddress};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ask a peer for the chunk at `address`, or for peers near it.
///
/// A request with the all-zero address is a self-lookup: the sender wants
/// peers near its own overlay address and no chunk at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieveRequest {
    /// Address of the chunk to be fetched.
    pub address: ChunkAddress,
    /// Session request id; concurrent requests with the same id share a
    /// delivery group.
    pub id: u64,
    /// How long the sender is willing to wait for a delivery. `None` leaves
    /// the receiving node's own search deadline in charge.
    pub timeout: Option<Duration>,
    /// Largest chunk the sender will accept; `0` accepts any size.
    pub max_size: i64,
    /// How many peer addresses to return when the request cannot be served
    /// from the local store.
    pub max_peers: usize,
}

impl RetrieveRequest {
    /// A plain data request for `address` with a fresh id.
    pub fn new(address: ChunkAddress) -> Self {
        Self {
            address,
            id: next_request_id(),
            timeout: None,
            max_size: 0,
            max_peers: 0,
        }
    }

    /// Whether the request asks for peer hints rather than (only) data.
    pub fn is_lookup(&self) -> bool {
        self.max_peers > 0 || self.address.is_zero()
    }
}
