// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use std::io;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Internal error.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum Error {
    #[error("Chunk was not found before the search deadline")]
    NotFound,

    #[error("Peer credit ledger refused the charge")]
    InsufficientCredit,

    #[error("Chunk payload does not hash to its claimed address")]
    InvalidChunk,

    #[error("Outbound send failed: {0}")]
    Transport(String),

    #[error("Chunk store is at capacity and the incoming chunk is no closer than what it holds")]
    MaxRecords,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
