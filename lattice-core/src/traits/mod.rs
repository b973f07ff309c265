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

//! Trait seams of the Lattice framework: addressing and delivery, queue-routed
//! observation, payload type erasure, lifecycle state, and capability vending.

pub use observer::Observer;
pub use payload::Payload;
pub use recipient::Recipient;
pub use sender::Sender;
pub use service_provider::ServiceProvider;
pub use stateful::Stateful;

mod observer;
mod payload;
mod recipient;
mod sender;
mod service_provider;
mod stateful;
