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
use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use static_assertions::assert_impl_all;

use crate::common::{RecipientRef, SenderRef};
use crate::message::{DeliveryState, QueueError};
use crate::traits::Payload;

/// An addressed, type-erased payload travelling the bus.
///
/// `Message` is a cheap handle; clones share the same underlying envelope.
/// Recipients are fixed once the message is injected; only the queue advances
/// the delivery state, and a state may never be re-entered once passed.
#[derive(Debug, Clone)]
pub struct Message {
    inner: Arc<MessageInner>,
}

#[derive(Debug)]
struct MessageInner {
    sender: Option<SenderRef>,
    recipients: Mutex<Vec<RecipientRef>>,
    payload: Arc<dyn Payload>,
    delivery: Mutex<DeliveryState>,
    /// The time when the message was created.
    timestamp: SystemTime,
}

impl Message {
    /// Creates a message originating from `sender`.
    pub fn new(sender: SenderRef, payload: impl Payload) -> Self {
        Self::build(Some(sender), Arc::new(payload))
    }

    /// A message with no declared sender. The queue refuses these at
    /// `inject`; the constructor exists so addressing failures stay
    /// representable (e.g. half-decoded wire input).
    pub fn unaddressed(payload: impl Payload) -> Self {
        Self::build(None, Arc::new(payload))
    }

    fn build(sender: Option<SenderRef>, payload: Arc<dyn Payload>) -> Self {
        Message {
            inner: Arc::new(MessageInner {
                sender,
                recipients: Mutex::new(Vec::new()),
                payload,
                delivery: Mutex::new(DeliveryState::New),
                timestamp: SystemTime::now(),
            }),
        }
    }

    /// Adds a recipient. Insertion order is preserved for dispatch but
    /// carries no semantic weight.
    pub fn to(self, recipient: RecipientRef) -> Self {
        self.inner
            .recipients
            .lock()
            .expect("message recipient lock poisoned")
            .push(recipient);
        self
    }

    /// The declared sender, if any.
    pub fn sender(&self) -> Option<SenderRef> {
        self.inner.sender.clone()
    }

    /// A snapshot of the recipient set.
    pub fn recipients(&self) -> Vec<RecipientRef> {
        self.inner
            .recipients
            .lock()
            .expect("message recipient lock poisoned")
            .clone()
    }

    /// The type-erased payload.
    pub fn payload(&self) -> Arc<dyn Payload> {
        self.inner.payload.clone()
    }

    /// Downcasts the payload to a concrete type.
    pub fn payload_as<T: Any>(&self) -> Option<&T> {
        // Deref past the Arc first: Arc<dyn Payload> is itself a Payload, so
        // method lookup would otherwise downcast the wrapper, never the value.
        self.inner.payload.as_ref().as_any().downcast_ref::<T>()
    }

    /// When the message was created.
    pub fn timestamp(&self) -> SystemTime {
        self.inner.timestamp
    }

    /// The current delivery state.
    pub fn delivery_state(&self) -> DeliveryState {
        *self
            .inner
            .delivery
            .lock()
            .expect("message delivery lock poisoned")
    }

    /// Moves the delivery state forward. Skipping or re-entering a state is
    /// an invariant breach surfaced as [`QueueError::ProtocolViolation`].
    pub(crate) fn advance_delivery(&self, next: DeliveryState) -> Result<(), QueueError> {
        let mut delivery = self
            .inner
            .delivery
            .lock()
            .expect("message delivery lock poisoned");
        if !delivery.may_become(next) {
            return Err(QueueError::ProtocolViolation {
                from: *delivery,
                to: next,
            });
        }
        *delivery = next;
        Ok(())
    }
}

// Ensures that Message can cross task boundaries.
assert_impl_all!(Message: Send, Sync);
