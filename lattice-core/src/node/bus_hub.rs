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
use std::ops::Deref;
use std::sync::Arc;

use dashmap::DashSet;
use tracing::instrument;

use crate::common::ServiceRegistry;
use crate::message::{MessageQueue, Request};
use crate::node::{lifecycle, BusContext, BusNode, Member, NodeState};

/// Errors raised while attaching a node to a hub.
#[derive(Debug)]
pub enum AttachError {
    /// The hub never declared a mount point with this name.
    MountPointUndefined {
        /// The hub's path.
        hub: String,
        /// The undeclared mount name.
        name: String,
    },
    /// The node is not in a state from which it can attach.
    InvalidMember {
        /// The rejected node's path.
        node: String,
        /// The state it was found in.
        state: String,
    },
}

impl fmt::Display for AttachError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AttachError::MountPointUndefined { hub, name } => {
                write!(f, "hub {hub} has no mount point named {name:?}")
            }
            AttachError::InvalidMember { node, state } => {
                write!(f, "node {node} cannot attach from state {state}")
            }
        }
    }
}

impl std::error::Error for AttachError {}

/// A node that hosts other nodes.
///
/// A hub is itself a [`BusNode`] (it derefs to one), plus a membership
/// roster and a set of declared mount points. Only declared names can be
/// claimed, and attachment is refused before any state changes when the
/// name is undeclared or the candidate is not fresh.
#[derive(Debug, Clone)]
pub struct BusHub {
    node: BusNode,
    context: BusContext,
    mounts: Arc<DashSet<String>>,
}

impl BusHub {
    /// Creates a standalone hub named `name` on `queue`.
    pub fn new(queue: MessageQueue, name: &str) -> anyhow::Result<Self> {
        Self::with_registry(queue, name, ServiceRegistry::new())
    }

    /// Creates a hub whose service lookups chain through `services`.
    pub fn with_registry(
        queue: MessageQueue,
        name: &str,
        services: ServiceRegistry,
    ) -> anyhow::Result<Self> {
        Ok(BusHub {
            node: BusNode::with_registry(queue, name, services)?,
            context: BusContext::new(),
            mounts: Arc::new(DashSet::new()),
        })
    }

    /// Declares a mount point, allowing a future member to claim `name`.
    pub fn declare_mount(&self, name: impl Into<String>) -> &Self {
        self.mounts.insert(name.into());
        self
    }

    /// The declared mount names.
    pub fn mounts(&self) -> Vec<String> {
        self.mounts.iter().map(|m| m.clone()).collect()
    }

    /// The hub's membership roster.
    pub fn context(&self) -> &BusContext {
        &self.context
    }

    /// Looks a member up by mount name.
    pub fn member(&self, name: &str) -> Option<Member> {
        self.context.member(name)
    }

    /// Attaches `node` under the declared mount `name`.
    ///
    /// Precondition failures (undeclared mount, node not fresh) are
    /// reported here without touching the node. The returned request
    /// tracks the asynchronous attachment; name contention surfaces as
    /// that request failing.
    #[instrument(skip(self, node), fields(hub = %self.node.path(), name = %name))]
    pub fn add(&self, name: &str, node: &BusNode) -> Result<Request, AttachError> {
        if !self.mounts.contains(name) {
            return Err(AttachError::MountPointUndefined {
                hub: self.node.path(),
                name: name.to_string(),
            });
        }
        let state = crate::traits::Stateful::state(node);
        if state != NodeState::UNATTACHED {
            return Err(AttachError::InvalidMember {
                node: node.path(),
                state: state.to_string(),
            });
        }
        Ok(lifecycle::attach(self, name.to_string(), node.clone()))
    }
}

impl Deref for BusHub {
    type Target = BusNode;

    fn deref(&self) -> &BusNode {
        &self.node
    }
}
