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

/// Delivery progress of a [`Message`](crate::message::Message).
///
/// The state only moves forward: `New` → `Enqueued` when the queue accepts
/// the message, `Enqueued` → `Delivered` once every recipient has been
/// offered it. Re-entering a state that has already been passed is a
/// protocol violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryState {
    /// Created but not yet handed to a queue.
    New,
    /// Accepted by a queue, waiting for the dispatcher.
    Enqueued,
    /// Offered to every recipient.
    Delivered,
}

impl DeliveryState {
    /// Whether `next` is the legal successor of `self`.
    pub(crate) fn may_become(self, next: DeliveryState) -> bool {
        matches!(
            (self, next),
            (DeliveryState::New, DeliveryState::Enqueued)
                | (DeliveryState::Enqueued, DeliveryState::Delivered)
        )
    }
}
