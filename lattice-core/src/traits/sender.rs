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
use std::fmt::Debug;

use acton_ern::Ern;
use async_trait::async_trait;

use crate::common::RecipientRef;
use crate::message::Message;

/// Origin of a [`Message`].
///
/// A sender is told, via [`bounce`](Sender::bounce), when a message it
/// created could not be delivered to any recipient.
#[async_trait]
pub trait Sender: Send + Sync + Debug {
    /// Returns the sender's identifier.
    fn id(&self) -> Ern;

    /// Called by the queue when `message` had no deliverable recipient.
    async fn bounce(&self, message: &Message);

    /// A sender that is also a [`Recipient`](crate::traits::Recipient)
    /// returns itself here so the dispatcher can fall back to self-delivery
    /// for messages with an empty recipient set.
    fn as_recipient(&self) -> Option<RecipientRef> {
        None
    }
}
