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
use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::trace;

use crate::message::Request;
use crate::node::{lifecycle, BusNode};

/// Membership bookkeeping errors.
#[derive(Debug)]
pub enum MembershipError {
    /// Another member already holds this name in the hub.
    NameTaken(String),
    /// No member holds this name.
    NameAbsent(String),
    /// The operation needs a member record the node does not have yet.
    NodeNotAttached,
}

impl fmt::Display for MembershipError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MembershipError::NameTaken(name) => {
                write!(f, "member name {name:?} is already taken")
            }
            MembershipError::NameAbsent(name) => {
                write!(f, "no member named {name:?}")
            }
            MembershipError::NodeNotAttached => {
                write!(f, "node is not attached to any hub")
            }
        }
    }
}

impl std::error::Error for MembershipError {}

/// One hub's membership roster. Names are unique within a context and are
/// released when the member leaves.
#[derive(Debug, Clone, Default)]
pub struct BusContext {
    members: Arc<DashMap<String, Member>>,
}

impl BusContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `member` under its name. The entry API makes the
    /// check-and-claim atomic, so two contenders for one name cannot both
    /// win.
    pub(crate) fn joined(&self, member: Member) -> Result<(), MembershipError> {
        match self.members.entry(member.name.clone()) {
            Entry::Occupied(_) => Err(MembershipError::NameTaken(member.name.clone())),
            Entry::Vacant(slot) => {
                trace!(name = %member.name, "member joined");
                slot.insert(member);
                Ok(())
            }
        }
    }

    /// Releases `name`, returning the departed member's record.
    pub(crate) fn left(&self, name: &str) -> Result<Member, MembershipError> {
        match self.members.remove(name) {
            Some((_, member)) => {
                trace!(name = %name, "member left");
                Ok(member)
            }
            None => Err(MembershipError::NameAbsent(name.to_string())),
        }
    }

    /// Whether `node` is currently a member of this context.
    pub fn contains(&self, node: &BusNode) -> bool {
        let id = node.id();
        self.members.iter().any(|m| m.value().node.id() == id)
    }

    /// Looks a member up by name.
    pub fn member(&self, name: &str) -> Option<Member> {
        self.members.get(name).map(|m| m.value().clone())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A node's standing in a hub: the claimed name plus handles back to the
/// node and the roster it belongs to.
#[derive(Debug, Clone)]
pub struct Member {
    name: String,
    node: BusNode,
    context: BusContext,
}

impl Member {
    pub(crate) fn new(name: String, node: BusNode, context: BusContext) -> Self {
        Member {
            name,
            node,
            context,
        }
    }

    /// The name this member holds in its hub.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node behind the membership.
    pub fn node(&self) -> &BusNode {
        &self.node
    }

    pub(crate) fn context(&self) -> &BusContext {
        &self.context
    }

    /// Detaches the node from its hub, releasing the member name. The
    /// returned request completes when the node is fully detached.
    pub fn dismiss(&self) -> Request {
        lifecycle::detach(self.clone())
    }
}

/// A hub's offer of membership to a node, issued during attachment.
///
/// The invitation is single-use: accepting it creates the [`Member`] record
/// and claims the name; a second accept fails with
/// [`MembershipError::NameTaken`].
#[derive(Debug, Clone)]
pub struct Invitation {
    name: String,
    context: BusContext,
    member: Arc<OnceLock<Member>>,
}

impl Invitation {
    pub(crate) fn new(name: String, context: BusContext) -> Self {
        Invitation {
            name,
            context,
            member: Arc::new(OnceLock::new()),
        }
    }

    /// The name the member would hold.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The roster the member would join.
    pub fn context(&self) -> &BusContext {
        &self.context
    }

    /// Claims the name for `node` and records the membership on both the
    /// context and the node.
    pub fn accept(&self, node: &BusNode) -> Result<Member, MembershipError> {
        let member = Member::new(self.name.clone(), node.clone(), self.context.clone());
        self.context.joined(member.clone())?;
        let _ = self.member.set(member.clone());
        node.record_membership(member.clone());
        Ok(member)
    }

    /// The membership created by [`accept`](Invitation::accept).
    pub fn member(&self) -> Result<Member, MembershipError> {
        self.member
            .get()
            .cloned()
            .ok_or(MembershipError::NodeNotAttached)
    }
}
