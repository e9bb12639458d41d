// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

//! Routing messages and their possible responses.

mod peers;
mod retrieve;
mod store;

pub use self::{peers::PeersResponse, retrieve::RetrieveRequest, store::StoreRequest};

use crate::ChunkAddress;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

lazy_static! {
    // Randomly seeded so ids do not collide across process restarts; a
    // collision merely shares a delivery fan-out group.
    static ref NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(rand::random());
}

/// Returns a fresh session-unique request id.
pub fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

/// A request to peers in the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Ask a peer for a chunk, or for peers near an address.
    Retrieve(RetrieveRequest),
    /// Hand a peer a chunk for storage.
    Store(StoreRequest),
}

/// A response to peers in the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Peer hints for a retrieve request that could not be served directly.
    Peers(PeersResponse),
}

impl Request {
    /// The address the request routes towards.
    pub fn dst(&self) -> ChunkAddress {
        match self {
            Request::Retrieve(request) => request.address,
            Request::Store(request) => request.address,
        }
    }

    /// The session request id.
    pub fn id(&self) -> u64 {
        match self {
            Request::Retrieve(request) => request.id,
            Request::Store(request) => request.id,
        }
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Request::Retrieve(request) => {
                write!(f, "Request::Retrieve({:?} id: {})", request.address, request.id)
            }
            Request::Store(request) => {
                write!(f, "Request::Store({:?} id: {})", request.address, request.id)
            }
        }
    }
}
