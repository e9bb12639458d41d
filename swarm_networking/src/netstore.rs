// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::{
    chunk_store::ChunkStore,
    error::{Error, Result},
    peer::{Hive, PeerLink},
    request_db::RequestDb,
};
use itertools::Itertools;
use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use swarm_protocol::{
    messages::{next_request_id, PeersResponse, RetrieveRequest, StoreRequest},
    storage::Chunk,
    ChunkAddress,
};
use tokio::{sync::watch, time::Instant};

/// How many requesters per request-id group receive the chunk once a search
/// resolves. The rest piggybacked too late and are intentionally not served.
pub const REQUESTER_COUNT: usize = 3;

/// How long a waiter may block on an outstanding search before giving up.
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration for a [`NetStore`].
#[derive(Debug, Clone)]
pub struct NetStoreConfig {
    /// Deadline for local `get` callers and the default patience granted to
    /// inbound requesters that do not bring a tighter one.
    pub search_timeout: Duration,
    /// Delivery fan-out cap per request-id group.
    pub requester_count: usize,
}

impl Default for NetStoreConfig {
    fn default() -> Self {
        Self {
            search_timeout: SEARCH_TIMEOUT,
            requester_count: REQUESTER_COUNT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchStatus {
    Searching,
    Found,
}

// An inbound retrieve that piggybacked on an outstanding search.
struct Requester<P> {
    peer: Arc<P>,
    deadline: Instant,
    max_size: i64,
    timeout: Option<Duration>,
}

// Coordination record for one outstanding search. Created exactly once per
// address while unresolved; its creator is the sole starter of the search.
struct PendingRequest<P> {
    status_tx: watch::Sender<SearchStatus>,
    requesters: HashMap<u64, Vec<Requester<P>>>,
}

impl<P> PendingRequest<P> {
    fn new() -> Self {
        let (status_tx, _) = watch::channel(SearchStatus::Searching);
        Self {
            status_tx,
            requesters: HashMap::new(),
        }
    }

    fn has_requester(&self, address: &ChunkAddress) -> bool
    where
        P: PeerLink,
    {
        self.requesters
            .values()
            .any(|group| group.iter().any(|r| r.peer.overlay_address() == *address))
    }
}

/// Chunk retrieval and storage coordinator.
///
/// Serves local `get`/`put` calls and inbound retrieve/store requests
/// against one policy: at most one active search per address, bounded
/// delivery fan-out, credit-accounted admission. A single mutex serialises
/// every transition; peer sends are dispatched off it and waiters block on
/// a watch channel, never on the lock.
pub struct NetStore<P: PeerLink> {
    store: Arc<dyn ChunkStore>,
    request_db: Arc<dyn RequestDb>,
    hive: Arc<dyn Hive<P>>,
    config: NetStoreConfig,
    pending: Mutex<HashMap<ChunkAddress, PendingRequest<P>>>,
}

impl<P: PeerLink> NetStore<P> {
    /// Creates a new NetStore over the given collaborators.
    pub fn new(
        store: Arc<dyn ChunkStore>,
        request_db: Arc<dyn RequestDb>,
        hive: Arc<dyn Hive<P>>,
        config: NetStoreConfig,
    ) -> Self {
        Self {
            store,
            request_db,
            hive,
            config,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Stores a locally produced chunk and syncs it to the neighbourhood,
    /// or resolves an outstanding search for its address.
    pub fn put_chunk(&self, chunk: Chunk) -> Result<()> {
        trace!("Put chunk {:?} from local caller", chunk.address());
        self.put(chunk, None)
    }

    /// Fetches the chunk at `address`, searching the network when the local
    /// store misses. Blocks until the chunk is delivered or the search
    /// deadline passes, whichever comes first.
    pub async fn get_chunk(&self, address: &ChunkAddress) -> Result<Chunk> {
        let mut status_rx = {
            let mut pending = self.lock_pending();
            if let Some(chunk) = self.store.get(address)? {
                return Ok(chunk);
            }
            match pending.entry(*address) {
                Entry::Occupied(entry) => entry.get().status_tx.subscribe(),
                Entry::Vacant(slot) => {
                    let request = PendingRequest::new();
                    let status_rx = request.status_tx.subscribe();
                    let mut forward = RetrieveRequest::new(*address);
                    forward.timeout = Some(self.config.search_timeout);
                    self.start_search(&request, forward);
                    let _ = slot.insert(request);
                    status_rx
                }
            }
        };

        let found = tokio::time::timeout(
            self.config.search_timeout,
            status_rx.wait_for(|status| *status == SearchStatus::Found),
        )
        .await;
        match found {
            Ok(Ok(_)) => self.store.get(address)?.ok_or(Error::NotFound),
            Ok(Err(_)) | Err(_) => {
                debug!("Search for {address:?} timed out for a local caller");
                Err(Error::NotFound)
            }
        }
    }

    /// Handles an inbound store request: validate, store, resolve waiters or
    /// sync onwards.
    pub fn handle_store_request(&self, request: StoreRequest, from: Arc<P>) -> Result<()> {
        if self.store.contains(&request.address) {
            trace!("Dropping store request for already held chunk {:?}", request.address);
            return Ok(());
        }
        let chunk = Chunk::from_parts(request.address, request.value);
        if let Err(err) = chunk.verify() {
            warn!(
                "Dropping store request from {:?}: {err}",
                from.overlay_address()
            );
            return Err(Error::InvalidChunk);
        }
        self.put(chunk, Some(&from))
    }

    /// Handles an inbound retrieve request: charge, serve from the store,
    /// or coalesce onto the search for its address.
    pub fn handle_retrieve_request(&self, request: RetrieveRequest, from: Arc<P>) -> Result<()> {
        if request.address.is_zero() {
            // Self-lookup: the sender only wants peers near its own address.
            self.reply_with_peers(&request, &from);
            return Ok(());
        }

        if from.credit(1).is_err() {
            debug!(
                "Dropping retrieve request {} from {:?}: credit refused",
                request.id,
                from.overlay_address()
            );
            return Err(Error::InsufficientCredit);
        }

        let deadline = self.request_deadline(&request);
        let served = {
            let mut pending = self.lock_pending();
            self.record_request_id(&request);

            if let Some(chunk) = self.store.get(&request.address)? {
                let requester = Requester {
                    peer: Arc::clone(&from),
                    deadline,
                    max_size: request.max_size,
                    timeout: request.timeout,
                };
                Self::deliver(&requester, request.id, &chunk);
                true
            } else {
                let requester = Requester {
                    peer: Arc::clone(&from),
                    deadline,
                    max_size: request.max_size,
                    timeout: request.timeout,
                };
                match pending.entry(request.address) {
                    Entry::Occupied(mut entry) => {
                        entry
                            .get_mut()
                            .requesters
                            .entry(request.id)
                            .or_default()
                            .push(requester);
                    }
                    Entry::Vacant(slot) => {
                        let mut pending_request = PendingRequest::new();
                        pending_request
                            .requesters
                            .entry(request.id)
                            .or_default()
                            .push(requester);
                        self.start_search(&pending_request, request.clone());
                        let _ = slot.insert(pending_request);
                    }
                }
                false
            }
        };

        if !served && request.max_peers > 0 {
            self.reply_with_peers(&request, &from);
        }
        Ok(())
    }

    // Write-through put shared by local puts and validated inbound stores.
    fn put(&self, chunk: Chunk, source: Option<&Arc<P>>) -> Result<()> {
        let resolved = {
            let mut pending = self.lock_pending();
            self.store.put(chunk.clone())?;
            pending.remove(chunk.address())
        };
        match resolved {
            Some(request) => {
                debug!("Search for {:?} resolved, notifying waiters", chunk.address());
                let _ = request.status_tx.send(SearchStatus::Found);
                self.propagate_response(&chunk, request.requesters);
            }
            None => self.store_to_neighbourhood(chunk, source),
        }
        Ok(())
    }

    // Forwards exactly one retrieve request towards the address, to the
    // closest peer that is not itself a requester and accepts the charge.
    fn start_search(&self, request: &PendingRequest<P>, forward: RetrieveRequest) {
        let candidates = self.hive.peers_near(&forward.address, 0);
        for peer in candidates {
            if request.has_requester(&peer.overlay_address()) {
                continue;
            }
            if let Err(err) = peer.credit(-1) {
                trace!(
                    "Skipping peer {:?} for search of {:?}: {err}",
                    peer.overlay_address(),
                    forward.address
                );
                continue;
            }
            trace!(
                "Forwarding retrieve request for {:?} to {:?}",
                forward.address,
                peer.overlay_address()
            );
            Self::dispatch_retrieve(peer, forward);
            return;
        }
        debug!("No peer available to search for {:?}", forward.address);
    }

    // Syncs a chunk to every peer in its neighbourhood except where it came
    // from.
    fn store_to_neighbourhood(&self, chunk: Chunk, source: Option<&Arc<P>>) {
        for peer in self.hive.peers_near(chunk.address(), 0) {
            if let Some(source) = source {
                if peer.overlay_address() == source.overlay_address() {
                    continue;
                }
            }
            let request = StoreRequest {
                address: *chunk.address(),
                id: next_request_id(),
                value: chunk.value().clone(),
                timeout: None,
            };
            Self::dispatch_store(peer, request);
        }
    }

    // Serves a resolved search to the requesters that piggybacked on it, at
    // most `requester_count` per request-id group, skipping the ones whose
    // patience already ran out. Order between groups carries no meaning.
    fn propagate_response(&self, chunk: &Chunk, requesters: HashMap<u64, Vec<Requester<P>>>) {
        let now = Instant::now();
        for (id, group) in requesters.into_iter().sorted_by_key(|(id, _)| *id) {
            let mut delivered = 0;
            for requester in &group {
                if delivered >= self.config.requester_count {
                    trace!(
                        "Skipping remaining requesters of group {id} for {:?}",
                        chunk.address()
                    );
                    break;
                }
                if requester.deadline <= now {
                    trace!(
                        "Skipping expired requester {:?} for {:?}",
                        requester.peer.overlay_address(),
                        chunk.address()
                    );
                    continue;
                }
                Self::deliver(requester, id, chunk);
                delivered += 1;
            }
        }
    }

    // Sends the chunk to a requester unless it exceeds what they accept.
    fn deliver(requester: &Requester<P>, id: u64, chunk: &Chunk) {
        if requester.max_size > 0 && requester.max_size < chunk.size() {
            trace!(
                "Withholding chunk {:?} from {:?}: span {} over their limit {}",
                chunk.address(),
                requester.peer.overlay_address(),
                chunk.size(),
                requester.max_size
            );
            return;
        }
        let request = StoreRequest {
            address: *chunk.address(),
            id,
            value: chunk.value().clone(),
            timeout: requester.timeout,
        };
        Self::dispatch_store(Arc::clone(&requester.peer), request);
    }

    fn reply_with_peers(&self, request: &RetrieveRequest, from: &Arc<P>) {
        let target = if request.address.is_zero() {
            from.overlay_address()
        } else {
            request.address
        };
        let peers = self
            .hive
            .peers_near(&target, request.max_peers)
            .iter()
            .map(|peer| peer.node_record())
            .collect::<Vec<_>>();
        let response = PeersResponse {
            peers,
            address: request.address,
            id: request.id,
            timeout: request.timeout,
        };
        Self::dispatch_peers(Arc::clone(from), response);
    }

    // An inbound deadline tighter than ours is preserved; otherwise the
    // configured search timeout wins.
    fn request_deadline(&self, request: &RetrieveRequest) -> Instant {
        let patience = match request.timeout {
            Some(timeout) if timeout < self.config.search_timeout => timeout,
            _ => self.config.search_timeout,
        };
        Instant::now() + patience
    }

    // Remembers an admitted request id; called under the coalescer lock.
    fn record_request_id(&self, request: &RetrieveRequest) {
        let key = request.id.to_be_bytes();
        if self.request_db.has(&key) {
            return;
        }
        match rmp_serde::to_vec(&request.address) {
            Ok(value) => self.request_db.put(&key, &value),
            Err(err) => warn!("Failed to encode request record for id {}: {err}", request.id),
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<ChunkAddress, PendingRequest<P>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch_store(peer: Arc<P>, request: StoreRequest) {
        let _handle = tokio::spawn(async move {
            if let Err(err) = peer.store(request).await {
                warn!(
                    "Failed to send store request to {:?}: {err}",
                    peer.overlay_address()
                );
            }
        });
    }

    fn dispatch_retrieve(peer: Arc<P>, request: RetrieveRequest) {
        let _handle = tokio::spawn(async move {
            if let Err(err) = peer.retrieve(request).await {
                warn!(
                    "Failed to send retrieve request to {:?}: {err}",
                    peer.overlay_address()
                );
            }
        });
    }

    fn dispatch_peers(peer: Arc<P>, response: PeersResponse) {
        let _handle = tokio::spawn(async move {
            if let Err(err) = peer.peers(response).await {
                warn!(
                    "Failed to send peer hints to {:?}: {err}",
                    peer.overlay_address()
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chunk_store::MemoryChunkStore, peer::CreditError, request_db::MemoryRequestDb};
    use bytes::Bytes;
    use libp2p::{Multiaddr, PeerId};
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use swarm_protocol::node::NodeRecord;
    use xor_name::XorName;

    #[derive(Clone)]
    enum Sent {
        Store(StoreRequest),
        Retrieve(RetrieveRequest),
        Peers(PeersResponse),
    }

    struct RecordingPeer {
        address: ChunkAddress,
        record: NodeRecord,
        balance: AtomicI64,
        refuse_credit: AtomicBool,
        sent: Mutex<Vec<Sent>>,
    }

    impl RecordingPeer {
        fn new() -> Arc<Self> {
            let mut rng = rand::thread_rng();
            Arc::new(Self {
                address: ChunkAddress::new(XorName::random(&mut rng)),
                record: NodeRecord::new(
                    PeerId::random(),
                    "/ip4/127.0.0.1/tcp/30303"
                        .parse::<Multiaddr>()
                        .expect("valid multiaddr"),
                ),
                balance: AtomicI64::new(0),
                refuse_credit: AtomicBool::new(false),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn refusing_credit() -> Arc<Self> {
            let peer = Self::new();
            peer.refuse_credit.store(true, Ordering::SeqCst);
            peer
        }

        fn balance(&self) -> i64 {
            self.balance.load(Ordering::SeqCst)
        }

        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().expect("mock lock").clone()
        }

        fn stores(&self) -> Vec<StoreRequest> {
            self.sent()
                .into_iter()
                .filter_map(|msg| match msg {
                    Sent::Store(request) => Some(request),
                    _ => None,
                })
                .collect()
        }

        fn retrieves(&self) -> Vec<RetrieveRequest> {
            self.sent()
                .into_iter()
                .filter_map(|msg| match msg {
                    Sent::Retrieve(request) => Some(request),
                    _ => None,
                })
                .collect()
        }

        fn peer_hints(&self) -> Vec<PeersResponse> {
            self.sent()
                .into_iter()
                .filter_map(|msg| match msg {
                    Sent::Peers(response) => Some(response),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl PeerLink for RecordingPeer {
        fn overlay_address(&self) -> ChunkAddress {
            self.address
        }

        fn node_record(&self) -> NodeRecord {
            self.record.clone()
        }

        fn credit(&self, delta: i64) -> std::result::Result<(), CreditError> {
            if self.refuse_credit.load(Ordering::SeqCst) {
                return Err(CreditError);
            }
            let _ = self.balance.fetch_add(delta, Ordering::SeqCst);
            Ok(())
        }

        async fn store(&self, request: StoreRequest) -> Result<(), Error> {
            self.sent.lock().expect("mock lock").push(Sent::Store(request));
            Ok(())
        }

        async fn retrieve(&self, request: RetrieveRequest) -> Result<(), Error> {
            self.sent
                .lock()
                .expect("mock lock")
                .push(Sent::Retrieve(request));
            Ok(())
        }

        async fn peers(&self, response: PeersResponse) -> Result<(), Error> {
            self.sent.lock().expect("mock lock").push(Sent::Peers(response));
            Ok(())
        }
    }

    struct StaticHive {
        peers: Vec<Arc<RecordingPeer>>,
    }

    impl Hive<RecordingPeer> for StaticHive {
        fn peers_near(&self, _target: &ChunkAddress, n: usize) -> Vec<Arc<RecordingPeer>> {
            let mut peers: Vec<_> = self.peers.iter().map(Arc::clone).collect();
            if n > 0 {
                peers.truncate(n);
            }
            peers
        }
    }

    fn net_store(hive_peers: Vec<Arc<RecordingPeer>>) -> Arc<NetStore<RecordingPeer>> {
        Arc::new(NetStore::new(
            Arc::new(MemoryChunkStore::new()),
            Arc::new(MemoryRequestDb::new()),
            Arc::new(StaticHive { peers: hive_peers }),
            NetStoreConfig::default(),
        ))
    }

    fn test_chunk() -> Chunk {
        let mut value = 4096i64.to_le_bytes().to_vec();
        value.extend_from_slice(b"the subtree this chunk encodes");
        Chunk::new(Bytes::from(value))
    }

    fn delivery_for(chunk: &Chunk, id: u64) -> StoreRequest {
        StoreRequest {
            address: *chunk.address(),
            id,
            value: chunk.value().clone(),
            timeout: None,
        }
    }

    fn retrieve_for(chunk: &Chunk, id: u64) -> RetrieveRequest {
        let mut request = RetrieveRequest::new(*chunk.address());
        request.id = id;
        request
    }

    // Lets spawned sends run without advancing the paused clock.
    async fn settle() {
        for _ in 0..64 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_local_gets_coalesce_into_one_search() -> eyre::Result<()> {
        let remote = RecordingPeer::new();
        let store = net_store(vec![Arc::clone(&remote)]);
        let chunk = test_chunk();
        let address = *chunk.address();

        let first = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.get_chunk(&address).await }
        });
        let second = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.get_chunk(&address).await }
        });
        settle().await;

        // Both callers share a single outbound retrieve.
        assert_eq!(remote.retrieves().len(), 1);

        let source = RecordingPeer::new();
        store.handle_store_request(delivery_for(&chunk, 1), source)?;
        let first = first.await??;
        let second = second.await??;
        assert_eq!(first.value(), chunk.value());
        assert_eq!(second.value(), chunk.value());

        // A later get is served from the local store with no peer traffic.
        let sent_before = remote.sent().len();
        let third = store.get_chunk(&address).await?;
        assert_eq!(third.value(), chunk.value());
        settle().await;
        assert_eq!(remote.sent().len(), sent_before);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn a_missed_search_surfaces_not_found() {
        let store = net_store(vec![]);
        let address = *test_chunk().address();
        let outcome = store.get_chunk(&address).await;
        assert!(matches!(outcome, Err(Error::NotFound)));
    }

    #[tokio::test(start_paused = true)]
    async fn a_resolved_search_serves_at_most_three_requesters_per_group() -> eyre::Result<()> {
        let forward_target = RecordingPeer::new();
        let store = net_store(vec![Arc::clone(&forward_target)]);
        let chunk = test_chunk();

        let requesters: Vec<_> = (0..5).map(|_| RecordingPeer::new()).collect();
        for requester in &requesters {
            store.handle_retrieve_request(retrieve_for(&chunk, 7), Arc::clone(requester))?;
        }
        settle().await;
        assert_eq!(forward_target.retrieves().len(), 1);

        store.handle_store_request(delivery_for(&chunk, 7), RecordingPeer::new())?;
        settle().await;

        let served: Vec<_> = requesters
            .iter()
            .map(|requester| requester.stores().len())
            .collect();
        assert_eq!(served.iter().sum::<usize>(), 3);
        // Insertion order wins; the two late requesters are skipped.
        assert_eq!(served, vec![1, 1, 1, 0, 0]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn an_invalid_chunk_never_reaches_the_store() -> eyre::Result<()> {
        let store = net_store(vec![RecordingPeer::new()]);
        let chunk = test_chunk();
        let address = *chunk.address();

        for _ in 0..2 {
            store.handle_retrieve_request(retrieve_for(&chunk, 9), RecordingPeer::new())?;
        }

        let forged = StoreRequest {
            address,
            id: 9,
            value: Bytes::from_static(b"something else entirely"),
            timeout: None,
        };
        let outcome = store.handle_store_request(forged, RecordingPeer::new());
        assert!(matches!(outcome, Err(Error::InvalidChunk)));

        // The store stays empty and waiters run into the deadline.
        let outcome = store.get_chunk(&address).await;
        assert!(matches!(outcome, Err(Error::NotFound)));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn admission_and_forwarding_move_credit() -> eyre::Result<()> {
        let forward_target = RecordingPeer::new();
        let store = net_store(vec![Arc::clone(&forward_target)]);
        let requester = RecordingPeer::new();

        store.handle_retrieve_request(retrieve_for(&test_chunk(), 11), Arc::clone(&requester))?;
        assert_eq!(requester.balance(), 1);
        assert_eq!(forward_target.balance(), -1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn a_refused_charge_drops_the_request() -> eyre::Result<()> {
        let forward_target = RecordingPeer::new();
        let store = net_store(vec![Arc::clone(&forward_target)]);
        let broke = RecordingPeer::refusing_credit();

        let outcome = store.handle_retrieve_request(retrieve_for(&test_chunk(), 13), broke);
        assert!(matches!(outcome, Err(Error::InsufficientCredit)));
        settle().await;
        assert!(forward_target.retrieves().is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn a_search_is_never_reflected_back_to_a_requester() -> eyre::Result<()> {
        let requester = RecordingPeer::new();
        let other = RecordingPeer::new();
        // The requester is the closest candidate for its own request.
        let store = net_store(vec![Arc::clone(&requester), Arc::clone(&other)]);

        store.handle_retrieve_request(retrieve_for(&test_chunk(), 17), Arc::clone(&requester))?;
        settle().await;
        assert!(requester.retrieves().is_empty());
        assert_eq!(other.retrieves().len(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn a_locally_held_chunk_is_delivered_straight_away() -> eyre::Result<()> {
        let store = net_store(vec![]);
        let chunk = test_chunk();
        store.put_chunk(chunk.clone())?;

        let requester = RecordingPeer::new();
        store.handle_retrieve_request(retrieve_for(&chunk, 19), Arc::clone(&requester))?;
        settle().await;

        let deliveries = requester.stores();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].id, 19);
        assert_eq!(&deliveries[0].value, chunk.value());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn a_delivery_is_withheld_over_the_requesters_size_limit() -> eyre::Result<()> {
        let store = net_store(vec![RecordingPeer::new()]);
        let chunk = test_chunk();

        let small_appetite = RecordingPeer::new();
        let mut request = retrieve_for(&chunk, 23);
        request.max_size = chunk.size() - 1;
        store.handle_retrieve_request(request, Arc::clone(&small_appetite))?;

        let unbounded = RecordingPeer::new();
        store.handle_retrieve_request(retrieve_for(&chunk, 23), Arc::clone(&unbounded))?;

        store.handle_store_request(delivery_for(&chunk, 23), RecordingPeer::new())?;
        settle().await;

        assert!(small_appetite.stores().is_empty());
        assert_eq!(unbounded.stores().len(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn an_expired_requester_is_skipped_on_delivery() -> eyre::Result<()> {
        let store = net_store(vec![RecordingPeer::new()]);
        let chunk = test_chunk();

        let impatient = RecordingPeer::new();
        let mut request = retrieve_for(&chunk, 29);
        request.timeout = Some(Duration::from_secs(1));
        store.handle_retrieve_request(request, Arc::clone(&impatient))?;

        let patient = RecordingPeer::new();
        store.handle_retrieve_request(retrieve_for(&chunk, 29), Arc::clone(&patient))?;

        tokio::time::advance(Duration::from_secs(2)).await;
        store.handle_store_request(delivery_for(&chunk, 29), RecordingPeer::new())?;
        settle().await;

        assert!(impatient.stores().is_empty());
        assert_eq!(patient.stores().len(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn an_unserved_lookup_earns_peer_hints() -> eyre::Result<()> {
        let near = RecordingPeer::new();
        let far = RecordingPeer::new();
        let store = net_store(vec![Arc::clone(&near), Arc::clone(&far)]);

        let requester = RecordingPeer::new();
        let mut request = retrieve_for(&test_chunk(), 31);
        request.max_peers = 1;
        store.handle_retrieve_request(request, Arc::clone(&requester))?;
        settle().await;

        let hints = requester.peer_hints();
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].peers, vec![near.node_record()]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn a_self_lookup_is_answered_without_a_charge() -> eyre::Result<()> {
        let neighbour = RecordingPeer::new();
        let store = net_store(vec![Arc::clone(&neighbour)]);

        let requester = RecordingPeer::new();
        let request = RetrieveRequest::new(ChunkAddress::zero());
        store.handle_retrieve_request(request, Arc::clone(&requester))?;
        settle().await;

        assert_eq!(requester.balance(), 0);
        assert_eq!(requester.peer_hints().len(), 1);
        assert!(neighbour.retrieves().is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn a_local_put_is_synced_to_the_neighbourhood() -> eyre::Result<()> {
        let first = RecordingPeer::new();
        let second = RecordingPeer::new();
        let store = net_store(vec![Arc::clone(&first), Arc::clone(&second)]);

        store.put_chunk(test_chunk())?;
        settle().await;

        assert_eq!(first.stores().len(), 1);
        assert_eq!(second.stores().len(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn an_inbound_store_is_synced_onwards_except_to_its_source() -> eyre::Result<()> {
        let source = RecordingPeer::new();
        let onward = RecordingPeer::new();
        let store = net_store(vec![Arc::clone(&source), Arc::clone(&onward)]);
        let chunk = test_chunk();

        store.handle_store_request(delivery_for(&chunk, 37), Arc::clone(&source))?;
        settle().await;

        assert!(source.stores().is_empty());
        assert_eq!(onward.stores().len(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn admitted_request_ids_are_logged() -> eyre::Result<()> {
        let request_db = Arc::new(MemoryRequestDb::new());
        let store = Arc::new(NetStore::new(
            Arc::new(MemoryChunkStore::new()),
            Arc::clone(&request_db) as Arc<dyn RequestDb>,
            Arc::new(StaticHive {
                peers: vec![RecordingPeer::new()],
            }),
            NetStoreConfig::default(),
        ));

        store.handle_retrieve_request(retrieve_for(&test_chunk(), 41), RecordingPeer::new())?;
        assert!(request_db.has(&41u64.to_be_bytes()));
        Ok(())
    }
}
