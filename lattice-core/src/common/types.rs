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
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::traits::{Observer, Recipient, Sender};

/// A shared handle to a message originator.
pub type SenderRef = Arc<dyn Sender>;

/// A shared handle to a message target.
pub type RecipientRef = Arc<dyn Recipient>;

/// A shared handle to a notice listener.
pub type ObserverRef = Arc<dyn Observer>;

/// A shareable failure cause. Cloned freely between a failed request and
/// every aggregate it propagates through.
pub type Problem = Arc<anyhow::Error>;

/// The boxed work a leaf request runs when processed.
pub(crate) type RequestWork = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;
