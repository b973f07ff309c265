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

//! The built-in attach and detach ladders, expressed as transition engines
//! and driven by requests so callers can track or combine them.

use tracing::instrument;

use crate::common::CONFIG;
use crate::message::Request;
use crate::node::{
    BusHub, BusNode, Invitation, Member, MetaState, NodeState, StateTransition, TransitionEngine,
};

/// Attaches `node` to `hub` under the already-validated mount `name`.
///
/// Walks the node UNATTACHED → ATTACHING → ATTACHED → INITIALIZING →
/// INITIALIZED. The membership name is claimed while entering ATTACHED;
/// losing the name race fails the returned request with the node parked
/// in ATTACHING.
#[instrument(skip(hub, node), fields(hub = %hub.path(), name = %name))]
pub(crate) fn attach(hub: &BusHub, name: String, node: BusNode) -> Request {
    let invitation = Invitation::new(name.clone(), hub.context().clone());
    let hub_path = hub.path();

    let mut engine = TransitionEngine::new();
    engine.register(StateTransition::direct(
        NodeState::UNATTACHED,
        NodeState::ATTACHING,
    ));
    engine.register(StateTransition::new(
        NodeState::ATTACHING,
        NodeState::ATTACHED,
        move |node: BusNode| {
            let invitation = invitation.clone();
            let path = format!("{hub_path}/{name}");
            Box::pin(async move {
                invitation
                    .accept(&node)
                    .map_err(|e| anyhow::anyhow!("attachment refused: {e}"))?;
                node.set_path(path);
                Ok(None)
            })
        },
    ));
    engine.register(StateTransition::direct(
        NodeState::ATTACHED,
        NodeState::INITIALIZING,
    ));
    engine.register(StateTransition::new(
        NodeState::INITIALIZING,
        NodeState::INITIALIZED,
        |node: BusNode| {
            Box::pin(async move {
                node.set_meta(MetaState::Operative);
                Ok(None)
            })
        },
    ));

    let deadline = CONFIG.attach_timeout();
    let queue = node.queue();
    let subject = node.clone();
    let request = Request::new(queue, hub.sender_ref(), async move {
        match tokio::time::timeout(deadline, engine.advance(&subject, NodeState::INITIALIZED)).await
        {
            Ok(result) => result,
            Err(_) => anyhow::bail!(
                "attachment of {} timed out after {deadline:?}",
                subject.path()
            ),
        }
    });
    request.process();
    request
}

/// Detaches a member's node from its hub.
///
/// Walks the node down through TERMINATING and TERMINATED, releases the
/// member name while DETACHING, and marks the node defunct on DETACHED.
/// Both operative (INITIALIZED) and never-initialized (ATTACHED) members
/// take the same ladder.
#[instrument(skip(member), fields(name = %member.name()))]
pub(crate) fn detach(member: Member) -> Request {
    let node = member.node().clone();
    let context = member.context().clone();
    let name = member.name().to_string();

    let mut engine = TransitionEngine::new();
    engine.register(StateTransition::direct(
        NodeState::INITIALIZED,
        NodeState::TERMINATING,
    ));
    engine.register(StateTransition::direct(
        NodeState::ATTACHED,
        NodeState::TERMINATING,
    ));
    engine.register(StateTransition::direct(
        NodeState::TERMINATING,
        NodeState::TERMINATED,
    ));
    engine.register(StateTransition::new(
        NodeState::TERMINATED,
        NodeState::DETACHING,
        move |node: BusNode| {
            let context = context.clone();
            let name = name.clone();
            Box::pin(async move {
                context
                    .left(&name)
                    .map_err(|e| anyhow::anyhow!("detachment bookkeeping failed: {e}"))?;
                node.clear_membership();
                Ok(None)
            })
        },
    ));
    engine.register(StateTransition::new(
        NodeState::DETACHING,
        NodeState::DETACHED,
        |node: BusNode| {
            Box::pin(async move {
                node.set_meta(MetaState::Defunct);
                Ok(None)
            })
        },
    ));

    let queue = node.queue();
    let sender = node.sender_ref();
    let subject = node;
    let request = Request::new(queue, sender, async move {
        engine.advance(&subject, NodeState::DETACHED).await
    });
    request.process();
    request
}
