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

//! Mailable primitives and the dispatch engine: messages, the queue, notices,
//! and trackable requests with their AND/THEN combinators.

pub use delivery_state::DeliveryState;
pub use message::Message;
pub use multi_request::{ParallelMultiRequest, SerialMultiRequest};
pub use notice::{Completion, Notice};
pub use queue::{MessageQueue, ShutdownLock};
pub use queue_error::QueueError;
pub use request::{Request, RequestPayload, RequestState};

mod delivery_state;
mod message;
mod multi_request;
mod notice;
mod queue;
mod queue_error;
mod request;
