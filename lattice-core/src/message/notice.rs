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
use std::sync::Arc;

use acton_ern::Ern;

use crate::message::{Request, RequestState};
use crate::traits::Payload;

/// An asynchronous notification routed through the
/// [`MessageQueue`](crate::message::MessageQueue).
///
/// Notices ride the same dispatch loop as ordinary messages, which is what
/// keeps observer callbacks non-reentrant with respect to deliveries.
#[derive(Debug, Clone)]
pub struct Notice {
    /// Identifier of whatever the notice is about.
    pub origin: Ern,
    /// The type-erased notice payload.
    pub payload: Arc<dyn Payload>,
}

impl Notice {
    /// Creates a notice about `origin`.
    pub fn new(origin: Ern, payload: impl Payload) -> Self {
        Notice {
            origin,
            payload: Arc::new(payload),
        }
    }

    /// Downcasts the notice payload to a concrete type.
    pub fn payload_as<T: Any>(&self) -> Option<&T> {
        // Deref past the Arc first: Arc<dyn Payload> is itself a Payload, so
        // method lookup would otherwise downcast the wrapper, never the value.
        self.payload.as_ref().as_any().downcast_ref::<T>()
    }
}

/// Completion event broadcast when a [`Request`] reaches a terminal state.
#[derive(Debug, Clone)]
pub struct Completion {
    /// The request that finished.
    pub request: Request,
    /// Its terminal outcome.
    pub outcome: RequestState,
}
