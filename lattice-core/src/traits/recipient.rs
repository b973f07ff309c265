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

use crate::message::Message;

/// Addressable target of a [`Message`].
///
/// `on_message` runs on the dispatcher task, one delivery at a time per
/// queue. An error (or panic) here is caught and logged by the dispatcher;
/// it never aborts delivery to the remaining recipients.
#[async_trait]
pub trait Recipient: Send + Sync + Debug {
    /// Returns the recipient's identifier.
    fn id(&self) -> Ern;

    /// Handles a delivered message.
    async fn on_message(&self, message: &Message) -> anyhow::Result<()>;
}
