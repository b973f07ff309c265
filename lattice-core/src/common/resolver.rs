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

use dashmap::DashMap;
use tracing::{instrument, trace};

use crate::common::{RecipientRef, SenderRef};
use crate::message::{MessageQueue, Request};
use crate::remote::WireFrame;

/// Maps wire-level addresses back to live parties.
///
/// Each runtime owns its own resolver context; nothing here is global, so
/// two runtimes in one process never see each other's registrations.
#[derive(Debug, Clone, Default)]
pub struct ResolverContext {
    recipients: Arc<DashMap<String, RecipientRef>>,
    origins: Arc<DashMap<String, SenderRef>>,
}

impl ResolverContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `recipient` reachable from remote frames under `address`.
    pub fn register_recipient(&self, address: impl Into<String>, recipient: RecipientRef) {
        self.recipients.insert(address.into(), recipient);
    }

    /// Makes `sender` attributable as the origin of remote frames under
    /// `address`.
    pub fn register_origin(&self, address: impl Into<String>, sender: SenderRef) {
        self.origins.insert(address.into(), sender);
    }

    /// Removes a recipient registration.
    pub fn unregister_recipient(&self, address: &str) {
        self.recipients.remove(address);
    }

    /// Removes an origin registration.
    pub fn unregister_origin(&self, address: &str) {
        self.origins.remove(address);
    }

    /// Looks up the recipient registered under `address`.
    pub fn resolve_recipient(&self, address: &str) -> Option<RecipientRef> {
        self.recipients.get(address).map(|r| r.value().clone())
    }

    /// Looks up the origin registered under `address`.
    pub fn resolve_origin(&self, address: &str) -> Option<SenderRef> {
        self.origins.get(address).map(|s| s.value().clone())
    }

    /// Reconstructs a live [`Request`] from a decoded frame, resolving its
    /// origin and target against this context. Unknown addresses are
    /// errors; the frame cannot be delivered on this runtime.
    #[instrument(skip(self, frame, queue), fields(recipient = %frame.recipient))]
    pub fn rebuild_request(
        &self,
        frame: &WireFrame,
        queue: &MessageQueue,
    ) -> anyhow::Result<Request> {
        let origin = self.resolve_origin(&frame.info.sender).ok_or_else(|| {
            anyhow::anyhow!("no origin registered for address {:?}", frame.info.sender)
        })?;
        let recipient = self.resolve_recipient(&frame.recipient).ok_or_else(|| {
            anyhow::anyhow!("no recipient registered for address {:?}", frame.recipient)
        })?;
        let request = Request::pending(queue.clone(), origin);
        request.set_urgent(frame.info.urgent);
        request.restore_state(&frame.info.state)?;
        request.address_to(recipient);
        trace!(request = %request.id(), "request rebuilt from wire frame");
        Ok(request)
    }
}
