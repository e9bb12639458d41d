// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

/// Durable key-value log the coalescer uses to remember request ids it has
/// admitted. Keys and values are opaque bytes; no format survives versions.
pub trait RequestDb: Send + Sync {
    fn put(&self, key: &[u8], value: &[u8]);
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn has(&self, key: &[u8]) -> bool;
}

/// In-process request log; durable only for the lifetime of the node.
#[derive(Debug, Default)]
pub struct MemoryRequestDb {
    entries: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryRequestDb {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RequestDb for MemoryRequestDb {
    fn put(&self, key: &[u8], value: &[u8]) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let _ = entries.insert(key.to_vec(), value.to_vec());
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn has(&self, key: &[u8]) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(key)
    }
}
