// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

/// Errors.
pub mod error;
/// Routing messages and their request-id namespace.
pub mod messages;
/// Node descriptors handed between the overlay and the transport layer.
pub mod node;
/// Storage types for chunks.
pub mod storage;

pub use error::Error;

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};
use xor_name::XorName;

/// Proximity order cap. Two addresses sharing more leading bits than this are
/// treated as equally close; routing never needs to distinguish beyond it.
pub const MAX_PO: u8 = 7;

/// The address in the network by which proximity/distance to other items
/// (whether nodes or data chunks) is calculated.
///
/// A chunk lives at the hash of its payload; a node lives at its overlay
/// address. Both are plain 32-byte `XorName`s underneath.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ChunkAddress(XorName);

impl ChunkAddress {
    /// Creates a new ChunkAddress.
    pub fn new(name: XorName) -> Self {
        Self(name)
    }

    /// The address a payload lives at: the SHA3-256 of its content.
    pub fn from_content(content: &[u8]) -> Self {
        Self(XorName::from_content(content))
    }

    /// The all-zero address, used as a self-lookup sentinel in retrieve
    /// requests.
    pub fn zero() -> Self {
        Self(XorName([0u8; xor_name::XOR_NAME_LEN]))
    }

    /// Returns true if this is the self-lookup sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 .0.iter().all(|byte| *byte == 0)
    }

    /// Returns the `XorName`.
    pub fn xorname(&self) -> &XorName {
        &self.0
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; xor_name::XOR_NAME_LEN] {
        &self.0 .0
    }

    /// Returns the hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0 .0)
    }
}

impl From<XorName> for ChunkAddress {
    fn from(name: XorName) -> Self {
        Self(name)
    }
}

impl Debug for ChunkAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // only the first 6 chars are logged
        write!(f, "ChunkAddress({})", &self.to_hex()[0..6])
    }
}

impl Display for ChunkAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Proximity order of two addresses: the number of leading bits they share,
/// capped at [`MAX_PO`]. Higher means closer.
pub fn proximity(one: &ChunkAddress, other: &ChunkAddress) -> u8 {
    // Only the bytes that can contribute to the capped order are scanned.
    let relevant_bytes = (MAX_PO as usize) / 8 + 1;
    for (byte_index, (lhs, rhs)) in one
        .as_bytes()
        .iter()
        .zip(other.as_bytes().iter())
        .take(relevant_bytes)
        .enumerate()
    {
        let differing = lhs ^ rhs;
        if differing != 0 {
            let po = (byte_index as u8) * 8 + differing.leading_zeros() as u8;
            return po.min(MAX_PO);
        }
    }
    MAX_PO
}
