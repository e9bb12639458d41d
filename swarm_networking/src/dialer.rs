// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use libp2p::PeerId;
use std::{
    collections::{HashMap, VecDeque},
    time::{Duration, Instant},
};
use swarm_protocol::node::NodeRecord;

/// How long a dialled node stays in the history cache before it may be
/// dialled again, successful or not.
pub const DIAL_HISTORY_EXPIRATION: Duration = Duration::from_secs(30);

/// Upper bound on the idle slot handed out when nothing is runnable but
/// history entries are still pending expiry.
pub const WAIT_EXPIRE_CAP: Duration = Duration::from_secs(14);

/// How a connection came to be, from our side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnFlag {
    /// An operator-configured target, redialled indefinitely.
    Static,
    /// A discovery-sourced peer, capped by the dynamic-dial budget.
    Dyn,
}

/// A unit of work the scheduler hands to the driver.
///
/// The driver executes it (dials, runs a discovery lookup, or just sleeps)
/// and reports it back through `new_tasks` once finished. A `Discover` task
/// comes back with its `results` filled in; everything else is returned
/// as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    /// Open an outbound connection to `node`.
    Dial { flag: ConnFlag, node: NodeRecord },
    /// Ask discovery for more candidates; `bootstrap` exactly once at
    /// startup.
    Discover {
        bootstrap: bool,
        results: Vec<NodeRecord>,
    },
    /// Idle until some history entry expires, keeping the running-task
    /// count positive so the outer loop wakes again.
    WaitExpire { duration: Duration },
}

/// The discovery table the scheduler pulls candidates from. Lookup and
/// bootstrap execution belong to the driver running [`Task::Discover`];
/// the scheduler itself only reads.
pub trait DiscoveryTable: Send {
    /// Our own node descriptor; never dialled.
    fn self_node(&self) -> NodeRecord;
    /// Up to `max` random table entries.
    fn read_random_nodes(&self, max: usize) -> Vec<NodeRecord>;
    /// Iterative lookup for nodes near `target`.
    fn lookup(&self, target: &PeerId) -> Vec<NodeRecord>;
    /// Seed the table.
    fn bootstrap(&self, seeds: &[NodeRecord]);
}

/// Configuration for a [`DialScheduler`].
#[derive(Debug, Clone)]
pub struct DialerConfig {
    /// Ceiling on dynamically dialled peers, in-flight dials included.
    pub max_dyn_dials: usize,
    /// Retention of the dial history cache.
    pub hist_retention: Duration,
    /// Cap on the idle slot duration.
    pub wait_expire_cap: Duration,
    /// Operator-configured always-redial targets.
    pub static_nodes: Vec<NodeRecord>,
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self {
            max_dyn_dials: 16,
            hist_retention: DIAL_HISTORY_EXPIRATION,
            wait_expire_cap: WAIT_EXPIRE_CAP,
            static_nodes: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct HistEntry {
    id: PeerId,
    expiry: Instant,
}

// Recently dialled nodes, eldest first. Insertions carry a constant
// retention, so the front entry is always the next to lapse.
#[derive(Debug, Default)]
struct DialHistory {
    entries: VecDeque<HistEntry>,
}

impl DialHistory {
    fn add(&mut self, id: PeerId, expiry: Instant) {
        self.entries.push_back(HistEntry { id, expiry });
    }

    fn contains(&self, id: &PeerId) -> bool {
        self.entries.iter().any(|entry| entry.id == *id)
    }

    fn expire(&mut self, now: Instant) {
        while self
            .entries
            .front()
            .map_or(false, |entry| entry.expiry <= now)
        {
            if let Some(entry) = self.entries.pop_front() {
                trace!("Dial history entry for {} expired", entry.id);
            }
        }
    }

    fn min_expiry(&self) -> Option<Instant> {
        self.entries.front().map(|entry| entry.expiry)
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decides, once per tick, which connection tasks to launch.
///
/// Pure with respect to its inputs plus its own state: given the completed
/// tasks, the connected-peer snapshot and the current instant, it emits new
/// tasks and never touches the transport itself. The peer snapshot is the
/// sole source of truth for connectedness; a failed dial only leaves its
/// history entry behind.
pub struct DialScheduler<T: DiscoveryTable> {
    table: T,
    max_dyn_dials: usize,
    hist_retention: Duration,
    wait_expire_cap: Duration,
    static_nodes: Vec<NodeRecord>,
    dialing: HashMap<PeerId, ConnFlag>,
    lookup_buf: VecDeque<NodeRecord>,
    lookup_running: bool,
    bootstrapped: bool,
    hist: DialHistory,
    running: usize,
}

impl<T: DiscoveryTable> DialScheduler<T> {
    /// Creates a new DialScheduler over the given discovery table.
    pub fn new(table: T, config: DialerConfig) -> Self {
        let mut scheduler = Self {
            table,
            max_dyn_dials: config.max_dyn_dials,
            hist_retention: config.hist_retention,
            wait_expire_cap: config.wait_expire_cap,
            static_nodes: Vec::new(),
            dialing: HashMap::new(),
            lookup_buf: VecDeque::new(),
            lookup_running: false,
            bootstrapped: false,
            hist: DialHistory::default(),
            running: 0,
        };
        for node in config.static_nodes {
            scheduler.add_static(node);
        }
        scheduler
    }

    /// Registers a static dial target. Duplicates are ignored.
    pub fn add_static(&mut self, node: NodeRecord) {
        if self
            .static_nodes
            .iter()
            .any(|existing| existing.peer_id == node.peer_id)
        {
            return;
        }
        debug!("Adding static dial target {node}");
        self.static_nodes.push(node);
    }

    /// Forgets a static dial target.
    pub fn remove_static(&mut self, id: &PeerId) {
        self.static_nodes.retain(|node| node.peer_id != *id);
    }

    /// One scheduler tick: absorb completed tasks, then emit new ones.
    ///
    /// Emission order is static dials (in configuration order), dynamic
    /// dials (in buffer order), discovery, idle slot. Two calls with
    /// identical state and inputs produce identical output sequences.
    pub fn new_tasks(
        &mut self,
        completed: Vec<Task>,
        peers: &HashMap<PeerId, ConnFlag>,
        now: Instant,
    ) -> Vec<Task> {
        for task in completed {
            self.task_done(task, now);
        }
        self.hist.expire(now);

        let self_id = self.table.self_node().peer_id;
        let mut new_tasks = Vec::new();

        // Static dials, in configuration order.
        for index in 0..self.static_nodes.len() {
            let node = self.static_nodes[index].clone();
            if !self.check_dial(&node, peers, &self_id) {
                continue;
            }
            let _ = self.dialing.insert(node.peer_id, ConnFlag::Static);
            new_tasks.push(Task::Dial {
                flag: ConnFlag::Static,
                node,
            });
        }

        // Dynamic dials from buffered discovery results. Tried candidates
        // are consumed whether or not they were dialable.
        let dyn_connected = peers
            .values()
            .filter(|flag| **flag == ConnFlag::Dyn)
            .count();
        let dyn_dialing = self
            .dialing
            .values()
            .filter(|flag| **flag == ConnFlag::Dyn)
            .count();
        let mut need = self
            .max_dyn_dials
            .saturating_sub(dyn_connected + dyn_dialing);
        while need > 0 {
            let Some(node) = self.lookup_buf.pop_front() else {
                break;
            };
            if !self.check_dial(&node, peers, &self_id) {
                continue;
            }
            let _ = self.dialing.insert(node.peer_id, ConnFlag::Dyn);
            new_tasks.push(Task::Dial {
                flag: ConnFlag::Dyn,
                node,
            });
            need -= 1;
        }

        // Discovery pressure. Random table entries stand in for a fresh
        // lookup whenever any of them are dialable.
        if need > 0 && !self.lookup_running {
            if !self.bootstrapped {
                self.lookup_running = true;
                new_tasks.push(Task::Discover {
                    bootstrap: true,
                    results: Vec::new(),
                });
            } else {
                let mut dialable_randoms = 0;
                for node in self.table.read_random_nodes(self.max_dyn_dials / 2) {
                    if need == 0 {
                        break;
                    }
                    if !self.check_dial(&node, peers, &self_id) {
                        continue;
                    }
                    let _ = self.dialing.insert(node.peer_id, ConnFlag::Dyn);
                    new_tasks.push(Task::Dial {
                        flag: ConnFlag::Dyn,
                        node,
                    });
                    need -= 1;
                    dialable_randoms += 1;
                }
                if dialable_randoms == 0 && need > 0 {
                    self.lookup_running = true;
                    new_tasks.push(Task::Discover {
                        bootstrap: false,
                        results: Vec::new(),
                    });
                }
            }
        }

        // Idle slot: nothing to do and nothing running, but history entries
        // are still holding candidates back. Wake when the eldest lapses.
        if new_tasks.is_empty() && self.running == 0 && !self.hist.is_empty() {
            if let Some(expiry) = self.hist.min_expiry() {
                let duration = expiry
                    .saturating_duration_since(now)
                    .min(self.wait_expire_cap);
                new_tasks.push(Task::WaitExpire { duration });
            }
        }

        self.running += new_tasks.len();
        new_tasks
    }

    // State transition for one completed task. A dial lands in the history
    // cache regardless of how it went; the peer snapshot tells success.
    fn task_done(&mut self, task: Task, now: Instant) {
        self.running = self.running.saturating_sub(1);
        match task {
            Task::Dial { node, .. } => {
                let _ = self.dialing.remove(&node.peer_id);
                self.hist.add(node.peer_id, now + self.hist_retention);
            }
            Task::Discover { bootstrap, results } => {
                self.lookup_running = false;
                if bootstrap {
                    self.bootstrapped = true;
                }
                trace!("Discovery returned {} candidates", results.len());
                self.lookup_buf.extend(results);
            }
            Task::WaitExpire { .. } => {}
        }
    }

    fn check_dial(
        &self,
        node: &NodeRecord,
        peers: &HashMap<PeerId, ConnFlag>,
        self_id: &PeerId,
    ) -> bool {
        if node.peer_id == *self_id {
            return false;
        }
        if peers.contains_key(&node.peer_id) || self.dialing.contains_key(&node.peer_id) {
            return false;
        }
        if self.hist.contains(&node.peer_id) {
            trace!("Skipping {node}, dialled too recently");
            return false;
        }
        true
    }
}
