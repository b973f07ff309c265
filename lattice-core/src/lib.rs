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

#![forbid(unsafe_code)]
//! Lattice Core Library
//!
//! This library provides the core functionality for the Lattice message bus:
//! ordered, non-reentrant message dispatch, composable asynchronous requests,
//! and the lifecycle machinery that assembles nodes into a hierarchical tree
//! of attachable components.

/// Common utilities and structures used throughout the Lattice framework.
pub(crate) mod common;

pub(crate) mod message;
pub(crate) mod node;
pub(crate) mod remote;
/// Trait definitions used in the Lattice framework.
pub(crate) mod traits;

/// Prelude module for convenient imports.
///
/// This module re-exports commonly used items from the `common`, `message`,
/// `node`, `remote`, and `traits` modules, as well as the `async_trait` crate.
pub mod prelude {
    pub use acton_ern::*;
    pub use async_trait::async_trait;

    pub use crate::common::{
        Bus, BusConfig, BusRuntime, ObserverRef, Problem, RecipientRef, ResolverContext,
        SenderRef, ServiceError, ServiceRegistry,
    };
    pub use crate::message::{
        Completion, DeliveryState, Message, MessageQueue, Notice, ParallelMultiRequest,
        QueueError, Request, RequestPayload, RequestState, SerialMultiRequest, ShutdownLock,
    };
    pub use crate::node::{
        AttachError, BusContext, BusHub, BusNode, EffectFuture, Invitation, Member,
        MembershipError, MetaState, NodeState, StallError, StateTable, StateTransition,
        TransitionEngine,
    };
    pub use crate::remote::{
        JsonBusProtocol, NetworkProtocol, ProtocolRegistry, WireError, WireFrame, WireInfo,
        WireType, WireValue,
    };
    pub use crate::traits::{Observer, Payload, Recipient, Sender, ServiceProvider, Stateful};
}
