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
use std::sync::{Arc, Mutex};

use acton_ern::Ern;
use async_trait::async_trait;
use static_assertions::assert_impl_all;
use tracing::warn;

use crate::common::{SenderRef, ServiceRegistry};
use crate::message::{Message, MessageQueue, Request};
use crate::node::{AttachError, BusHub, Member, MetaState, NodeState};
use crate::traits::{Sender, ServiceProvider, Stateful};

/// A participant on the bus: an addressable party with a lifecycle state,
/// a service registry, and (once attached) a membership in some hub.
///
/// Cheap to clone; clones share the node.
#[derive(Debug, Clone)]
pub struct BusNode {
    inner: Arc<NodeInner>,
}

#[derive(Debug)]
struct NodeInner {
    id: Ern,
    path: Mutex<String>,
    queue: MessageQueue,
    state: Mutex<NodeState>,
    meta: Mutex<MetaState>,
    services: ServiceRegistry,
    membership: Mutex<Option<Member>>,
}

impl BusNode {
    /// Creates a detached node named `name` on `queue`.
    pub fn new(queue: MessageQueue, name: &str) -> anyhow::Result<Self> {
        Self::with_registry(queue, name, ServiceRegistry::new())
    }

    /// Creates a detached node with an explicit service registry, letting
    /// lookups chain to a parent provider.
    pub fn with_registry(
        queue: MessageQueue,
        name: &str,
        services: ServiceRegistry,
    ) -> anyhow::Result<Self> {
        let id = Ern::with_root(name.to_string())
            .map_err(|e| anyhow::anyhow!("invalid node name {name:?}: {e}"))?;
        Ok(BusNode {
            inner: Arc::new(NodeInner {
                path: Mutex::new(format!("/{name}")),
                id,
                queue,
                state: Mutex::new(NodeState::UNATTACHED),
                meta: Mutex::new(MetaState::Fresh),
                services,
                membership: Mutex::new(None),
            }),
        })
    }

    /// The node's identifier.
    pub fn id(&self) -> Ern {
        self.inner.id.clone()
    }

    /// The node's current bus path. Detached nodes sit at the root; the
    /// path is rewritten when the node attaches under a hub.
    pub fn path(&self) -> String {
        self.inner
            .path
            .lock()
            .expect("node path lock poisoned")
            .clone()
    }

    pub(crate) fn set_path(&self, path: String) {
        *self.inner.path.lock().expect("node path lock poisoned") = path;
    }

    /// The queue this node dispatches through.
    pub fn queue(&self) -> MessageQueue {
        self.inner.queue.clone()
    }

    /// Coarse existence marker, orthogonal to the lifecycle state.
    pub fn meta_state(&self) -> MetaState {
        *self.inner.meta.lock().expect("node meta lock poisoned")
    }

    pub(crate) fn set_meta(&self, meta: MetaState) {
        *self.inner.meta.lock().expect("node meta lock poisoned") = meta;
    }

    /// The node's membership record, when attached.
    pub fn membership(&self) -> Option<Member> {
        self.inner
            .membership
            .lock()
            .expect("node membership lock poisoned")
            .clone()
    }

    pub(crate) fn record_membership(&self, member: Member) {
        *self
            .inner
            .membership
            .lock()
            .expect("node membership lock poisoned") = Some(member);
    }

    pub(crate) fn clear_membership(&self) {
        self.inner
            .membership
            .lock()
            .expect("node membership lock poisoned")
            .take();
    }

    /// This node as a message sender.
    pub fn sender_ref(&self) -> SenderRef {
        Arc::new(self.clone())
    }

    /// Attaches this node to `hub` under `name`. Shorthand for
    /// [`BusHub::add`].
    pub fn join(&self, hub: &BusHub, name: &str) -> Result<Request, AttachError> {
        hub.add(name, self)
    }
}

impl Stateful for BusNode {
    fn state(&self) -> NodeState {
        *self.inner.state.lock().expect("node state lock poisoned")
    }

    fn set_state(&self, state: NodeState) {
        *self.inner.state.lock().expect("node state lock poisoned") = state;
    }
}

impl ServiceProvider for BusNode {
    fn service_registry(&self) -> &ServiceRegistry {
        &self.inner.services
    }
}

#[async_trait]
impl Sender for BusNode {
    fn id(&self) -> Ern {
        BusNode::id(self)
    }

    async fn bounce(&self, message: &Message) {
        warn!(
            node = %self.inner.id,
            delivery = ?message.delivery_state(),
            "message bounced back to its sender"
        );
    }
}

assert_impl_all!(BusNode: Send, Sync);
