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

//! Nodes, hubs, membership, and the state machine that moves nodes through
//! their lifecycle.

pub use bus_hub::{AttachError, BusHub};
pub use bus_node::BusNode;
pub use context::{BusContext, Invitation, Member, MembershipError};
pub use node_state::{MetaState, NodeState, StateTable};
pub use transition::{EffectFuture, StallError, StateTransition, TransitionEngine};

mod bus_hub;
mod bus_node;
mod context;
mod lifecycle;
mod node_state;
mod transition;
