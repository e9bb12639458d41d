// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use libp2p::{Multiaddr, PeerId};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A dialable node: transport identity plus the address it listens on.
///
/// This is what discovery hands to the dial scheduler and what peer hints
/// carry back to requesters. The overlay address of the node, if any, is
/// derived elsewhere; the descriptor itself is opaque to routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// The transport identity of the node.
    pub peer_id: PeerId,
    /// The address the node listens on.
    pub addr: Multiaddr,
}

impl NodeRecord {
    /// Creates a new NodeRecord.
    pub fn new(peer_id: PeerId, addr: Multiaddr) -> Self {
        Self { peer_id, addr }
    }
}

impl Display for NodeRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.peer_id, self.addr)
    }
}
