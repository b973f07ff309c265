/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use anyhow::bail;
use lazy_static::lazy_static;

/// A named rank on a node's lifecycle ladder.
///
/// States are plain values ordered by rank; the name is a label, not an
/// identity. Frameworks can mint their own states between the base ones
/// with [`NodeState::custom`].
#[derive(Debug, Clone, Copy)]
pub struct NodeState {
    name: &'static str,
    rank: u32,
}

impl NodeState {
    /// Not yet part of any hub.
    pub const UNATTACHED: NodeState = NodeState::custom("unattached", 0);
    /// Attachment handshake in progress.
    pub const ATTACHING: NodeState = NodeState::custom("attaching", 100);
    /// A member of a hub, not yet initialized.
    pub const ATTACHED: NodeState = NodeState::custom("attached", 200);
    /// Initialization in progress.
    pub const INITIALIZING: NodeState = NodeState::custom("initializing", 300);
    /// Fully operational.
    pub const INITIALIZED: NodeState = NodeState::custom("initialized", 400);
    /// Orderly teardown in progress.
    pub const TERMINATING: NodeState = NodeState::custom("terminating", 9_700);
    /// Work stopped, still a member.
    pub const TERMINATED: NodeState = NodeState::custom("terminated", 9_800);
    /// Leaving its hub.
    pub const DETACHING: NodeState = NodeState::custom("detaching", 9_900);
    /// Fully detached; end of the road.
    pub const DETACHED: NodeState = NodeState::custom("detached", 10_000);

    /// Defines a state at an arbitrary rank. Ranks between the base states
    /// are free for framework extensions.
    pub const fn custom(name: &'static str, rank: u32) -> NodeState {
        NodeState { name, rank }
    }

    /// The state's label.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The state's position on the ladder.
    pub const fn rank(&self) -> u32 {
        self.rank
    }

    /// Whether `self` sits strictly below `other` on the ladder.
    pub const fn precedes(&self, other: &NodeState) -> bool {
        self.rank < other.rank
    }
}

/// Identity is rank alone; two states with equal ranks are the same state
/// whatever they are called.
impl PartialEq for NodeState {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank
    }
}

impl Eq for NodeState {}

impl Hash for NodeState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank.hash(state);
    }
}

impl PartialOrd for NodeState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeState {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank.cmp(&other.rank)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name)
    }
}

const BASE_STATES: [NodeState; 9] = [
    NodeState::UNATTACHED,
    NodeState::ATTACHING,
    NodeState::ATTACHED,
    NodeState::INITIALIZING,
    NodeState::INITIALIZED,
    NodeState::TERMINATING,
    NodeState::TERMINATED,
    NodeState::DETACHING,
    NodeState::DETACHED,
];

lazy_static! {
    static ref STANDARD_TABLE: StateTable = {
        let mut table = StateTable::empty();
        for state in BASE_STATES {
            table
                .insert(state)
                .expect("base state ranks are distinct by construction");
        }
        table
    };
}

impl NodeState {
    /// Looks a base state up by name.
    pub fn named(name: &str) -> Option<NodeState> {
        StateTable::standard().for_name(name)
    }
}

/// The set of states a lifecycle recognizes, ordered by rank.
#[derive(Debug, Clone)]
pub struct StateTable {
    states: Vec<NodeState>,
}

impl StateTable {
    /// A table with no states.
    pub fn empty() -> Self {
        StateTable { states: Vec::new() }
    }

    /// The shared table holding exactly the base states.
    pub fn standard() -> &'static StateTable {
        &STANDARD_TABLE
    }

    /// Adds a state, keeping the table rank-sorted. A rank collision is an
    /// error: two states may not share a position on the ladder.
    pub fn insert(&mut self, state: NodeState) -> anyhow::Result<()> {
        match self.states.binary_search_by_key(&state.rank, |s| s.rank) {
            Ok(at) => bail!(
                "rank {} already taken by state {:?}",
                state.rank,
                self.states[at].name
            ),
            Err(at) => {
                self.states.insert(at, state);
                Ok(())
            }
        }
    }

    /// Finds a state by label.
    pub fn for_name(&self, name: &str) -> Option<NodeState> {
        self.states.iter().find(|s| s.name == name).copied()
    }

    /// Finds a state by rank.
    pub fn for_rank(&self, rank: u32) -> Option<NodeState> {
        self.states
            .binary_search_by_key(&rank, |s| s.rank)
            .ok()
            .map(|at| self.states[at])
    }

    /// The states in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeState> {
        self.states.iter()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Coarse existence marker orthogonal to [`NodeState`]: where the node is
/// in its overall life rather than on the attachment ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MetaState {
    /// Constructed, never fully initialized.
    #[default]
    Fresh,
    /// Initialization completed at least once.
    Operative,
    /// Detached for good.
    Defunct,
}
