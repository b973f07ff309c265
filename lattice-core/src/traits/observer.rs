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

use crate::message::Notice;

/// An object that wants to be told about state changes.
///
/// Notices are routed through the [`MessageQueue`](crate::message::MessageQueue),
/// never delivered by a direct synchronous call from inside another delivery,
/// so an observer is never re-entered while a message is mid-dispatch.
#[async_trait]
pub trait Observer: Send + Sync + Debug {
    /// Returns the observer's identifier.
    fn id(&self) -> Ern;

    /// Handles a queue-routed notice.
    async fn on_notice(&self, notice: Notice);
}
