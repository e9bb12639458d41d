// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::{node::NodeRecord, ChunkAddress};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Peer hints for a retrieve request that could not be served from the local
/// store: nodes closer to the requested address than the responder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeersResponse {
    /// Nodes near the requested address, closest first.
    pub peers: Vec<NodeRecord>,
    /// The address of the originating retrieve request.
    pub address: ChunkAddress,
    /// The id of the originating retrieve request.
    pub id: u64,
    /// The timeout of the originating retrieve request, propagated.
    pub timeout: Option<Duration>,
}
