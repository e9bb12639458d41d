// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::{error::Error, ChunkAddress};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Formatter};

/// The unit of content addressing: a payload living at the hash of itself.
///
/// The first 8 bytes of the payload replicate, little-endian, the span of
/// the subtree the chunk encodes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    address: ChunkAddress,
    value: Bytes,
}

impl Chunk {
    /// Creates a chunk at the address its payload hashes to.
    pub fn new(value: Bytes) -> Self {
        Self {
            address: ChunkAddress::from_content(&value),
            value,
        }
    }

    /// Reassembles a chunk from a claimed address and a payload, without
    /// checking that they belong together. Call [`Chunk::verify`] before
    /// trusting the result.
    pub fn from_parts(address: ChunkAddress, value: Bytes) -> Self {
        Self { address, value }
    }

    /// The address the chunk lives at.
    pub fn address(&self) -> &ChunkAddress {
        &self.address
    }

    /// The chunk payload.
    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// The span of the subtree this chunk encodes, replicated in the first
    /// 8 bytes of the payload. Payloads too short to carry it span nothing.
    pub fn size(&self) -> i64 {
        if self.value.len() < 8 {
            return 0;
        }
        let mut span = [0u8; 8];
        span.copy_from_slice(&self.value[..8]);
        i64::from_le_bytes(span)
    }

    /// Checks that the payload hashes to the claimed address.
    pub fn verify(&self) -> Result<(), Error> {
        let got = ChunkAddress::from_content(&self.value);
        if got == self.address {
            Ok(())
        } else {
            Err(Error::InvalidChunkPayload {
                expected: self.address,
                got,
            })
        }
    }
}

impl Debug for Chunk {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chunk({:?} - {} bytes, span {})",
            self.address,
            self.value.len(),
            self.size()
        )
    }
}
