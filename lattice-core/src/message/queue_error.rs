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
use crate::message::DeliveryState;

/// Represents errors that can occur when enqueuing or dispatching messages.
#[derive(Debug)]
pub enum QueueError {
    /// The message declared no sender; the queue refuses it at `inject`.
    MissingSender,
    /// A delivery state was skipped or re-entered. Programming error.
    ProtocolViolation {
        /// The state the message was in.
        from: DeliveryState,
        /// The state the caller tried to move it to.
        to: DeliveryState,
    },
    /// Indicates that handing the message to the dispatcher failed.
    SendFailed(String),
}

impl std::fmt::Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            QueueError::MissingSender => write!(f, "message has no sender"),
            QueueError::ProtocolViolation { from, to } => {
                write!(f, "illegal delivery transition {from:?} -> {to:?}")
            }
            QueueError::SendFailed(msg) => write!(f, "failed to enqueue message: {}", msg),
        }
    }
}

impl std::error::Error for QueueError {}

/// Converts a `SendError` from Tokio's MPSC channel to a `QueueError`.
impl<T> From<tokio::sync::mpsc::error::SendError<T>> for QueueError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        QueueError::SendFailed("channel closed".into())
    }
}
