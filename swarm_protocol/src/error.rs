// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::ChunkAddress;
use thiserror::Error;

/// Result type for protocol operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors in the protocol types.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Chunk payload hashes to {got:?}, expected {expected:?}")]
    InvalidChunkPayload {
        expected: ChunkAddress,
        got: ChunkAddress,
    },
}
