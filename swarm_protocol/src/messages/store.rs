// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::ChunkAddress;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hand a peer the chunk at `address`, either as a delivery for an earlier
/// retrieve request (carrying that request's id) or unsolicited, as part of
/// neighbourhood storage.
#[derive(custom_debug::Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRequest {
    /// Address the payload claims to live at.
    pub address: ChunkAddress,
    /// Session request id.
    pub id: u64,
    /// The chunk payload.
    #[debug(skip)]
    pub value: Bytes,
    /// Remaining patience of the original requester, when this is a delivery.
    pub timeout: Option<Duration>,
}
