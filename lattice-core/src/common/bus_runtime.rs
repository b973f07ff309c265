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
use std::sync::Arc;

use tracing::{instrument, trace};

use crate::common::{BusConfig, ResolverContext, ServiceRegistry};
use crate::message::MessageQueue;
use crate::node::{BusHub, BusNode};
use crate::remote::{JsonBusProtocol, ProtocolRegistry};
use crate::traits::ServiceProvider;

/// A running bus: one dispatch queue, a root hub, remote-address resolution,
/// and the runtime-wide service registry.
///
/// Cheap to clone; all clones drive the same runtime.
#[derive(Debug, Clone)]
pub struct BusRuntime {
    config: Arc<BusConfig>,
    queue: MessageQueue,
    root: BusHub,
    resolvers: ResolverContext,
    protocols: ProtocolRegistry,
    services: ServiceRegistry,
}

impl BusRuntime {
    /// Wires up a runtime from `config`: the queue, the root hub, the
    /// resolver context, and a protocol registry seeded with the JSON
    /// codec.
    #[instrument(skip(config))]
    pub(crate) fn launch(config: BusConfig) -> anyhow::Result<Self> {
        let queue = MessageQueue::start(&config)?;
        let services = ServiceRegistry::new();
        let root = BusHub::with_registry(
            queue.clone(),
            &config.defaults.root_hub_name,
            ServiceRegistry::chained(&services),
        )?;
        let protocols = ProtocolRegistry::new();
        protocols.register(Arc::new(JsonBusProtocol::new(
            config.limits.max_wire_frame_bytes,
        )));
        trace!(queue = %queue.id(), hub = %root.id(), "bus runtime launched");
        Ok(BusRuntime {
            config: Arc::new(config),
            queue,
            root,
            resolvers: ResolverContext::new(),
            protocols,
            services,
        })
    }

    /// The runtime's dispatch queue.
    pub fn queue(&self) -> MessageQueue {
        self.queue.clone()
    }

    /// The root hub every top-level node attaches to.
    pub fn root(&self) -> BusHub {
        self.root.clone()
    }

    /// Remote-address resolution for this runtime.
    pub fn resolvers(&self) -> ResolverContext {
        self.resolvers.clone()
    }

    /// Wire codecs available to this runtime.
    pub fn protocols(&self) -> ProtocolRegistry {
        self.protocols.clone()
    }

    /// The configuration the runtime was launched with.
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Creates a detached node on this runtime's queue whose service
    /// lookups fall through to the runtime registry.
    pub fn new_node(&self, name: &str) -> anyhow::Result<BusNode> {
        BusNode::with_registry(
            self.queue.clone(),
            name,
            ServiceRegistry::chained(&self.services),
        )
    }

    /// Creates a standalone hub on this runtime's queue.
    pub fn new_hub(&self, name: &str) -> anyhow::Result<BusHub> {
        BusHub::with_registry(
            self.queue.clone(),
            name,
            ServiceRegistry::chained(&self.services),
        )
    }

    /// Drains and stops the dispatch queue. Held shutdown locks are
    /// honored before the dispatcher exits.
    pub async fn shutdown_all(&self) {
        self.queue.shutdown().await;
    }
}

impl ServiceProvider for BusRuntime {
    fn service_registry(&self) -> &ServiceRegistry {
        &self.services
    }
}
