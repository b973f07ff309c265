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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lattice::prelude::*;

use crate::setup::initialize_tracing;
use crate::setup::doubles::DeadEndSender;

mod setup;

/// Minimal stateful entity for exercising the engine.
#[derive(Debug, Clone)]
struct Gadget {
    state: Arc<Mutex<NodeState>>,
    primed: Arc<AtomicBool>,
}

impl Gadget {
    fn new() -> Self {
        Gadget {
            state: Arc::new(Mutex::new(NodeState::UNATTACHED)),
            primed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Stateful for Gadget {
    fn state(&self) -> NodeState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, state: NodeState) {
        *self.state.lock().unwrap() = state;
    }
}

#[tokio::test]
async fn engine_walks_a_direct_path() -> anyhow::Result<()> {
    initialize_tracing();
    let gadget = Gadget::new();
    let mut engine = TransitionEngine::new();
    engine.register(StateTransition::direct(
        NodeState::UNATTACHED,
        NodeState::ATTACHING,
    ));
    engine.register(StateTransition::direct(
        NodeState::ATTACHING,
        NodeState::ATTACHED,
    ));

    engine.advance(&gadget, NodeState::ATTACHED).await?;
    assert_eq!(gadget.state(), NodeState::ATTACHED);

    // Already at the target: nothing to do, nothing to fail.
    engine.advance(&gadget, NodeState::ATTACHED).await?;
    Ok(())
}

#[tokio::test]
async fn lowest_order_among_viable_edges_wins() -> anyhow::Result<()> {
    initialize_tracing();
    let gadget = Gadget::new();
    let mut engine = TransitionEngine::new();
    engine.register(
        StateTransition::direct(NodeState::UNATTACHED, NodeState::TERMINATED).with_order(5),
    );
    engine.register(
        StateTransition::direct(NodeState::UNATTACHED, NodeState::ATTACHING).with_order(1),
    );
    engine.register(StateTransition::direct(
        NodeState::ATTACHING,
        NodeState::ATTACHED,
    ));

    engine.advance(&gadget, NodeState::ATTACHED).await?;
    assert_eq!(gadget.state(), NodeState::ATTACHED);
    Ok(())
}

#[tokio::test]
async fn guarded_edges_are_skipped_until_viable() -> anyhow::Result<()> {
    initialize_tracing();
    let gadget = Gadget::new();
    let mut engine = TransitionEngine::new();
    // The tempting low-order edge is gated off; the fallback must be taken.
    engine.register(
        StateTransition::direct(NodeState::UNATTACHED, NodeState::TERMINATED)
            .with_order(1)
            .when(|g: &Gadget| g.primed.load(Ordering::SeqCst)),
    );
    engine.register(
        StateTransition::direct(NodeState::UNATTACHED, NodeState::ATTACHING).with_order(10),
    );

    engine.advance(&gadget, NodeState::ATTACHING).await?;
    assert_eq!(gadget.state(), NodeState::ATTACHING);

    // With the guard satisfied the low-order edge takes precedence.
    let fresh = Gadget::new();
    fresh.primed.store(true, Ordering::SeqCst);
    engine.advance(&fresh, NodeState::TERMINATED).await?;
    assert_eq!(fresh.state(), NodeState::TERMINATED);
    Ok(())
}

#[tokio::test]
async fn stalling_reports_where_and_whither() {
    initialize_tracing();
    let gadget = Gadget::new();
    let mut engine = TransitionEngine::new();
    engine.register(StateTransition::direct(
        NodeState::UNATTACHED,
        NodeState::ATTACHING,
    ));

    let err = engine
        .advance(&gadget, NodeState::INITIALIZED)
        .await
        .unwrap_err();
    let stall = err
        .downcast_ref::<StallError>()
        .expect("stall surfaces as a StallError");
    assert_eq!(stall.current, NodeState::ATTACHING);
    assert_eq!(stall.desired, NodeState::INITIALIZED);
    // The entity keeps whatever progress it made.
    assert_eq!(gadget.state(), NodeState::ATTACHING);
}

#[tokio::test]
async fn effects_run_and_their_requests_gate_progress() -> anyhow::Result<()> {
    initialize_tracing();
    let queue = MessageQueue::new("transitions", Duration::from_millis(100))?;
    let sender: SenderRef = DeadEndSender::arc();

    let gadget = Gadget::new();
    let mut engine = TransitionEngine::new();
    let effect_queue = queue.clone();
    let effect_sender = sender.clone();
    engine.register(StateTransition::new(
        NodeState::UNATTACHED,
        NodeState::ATTACHING,
        move |gadget: Gadget| {
            let queue = effect_queue.clone();
            let sender = effect_sender.clone();
            Box::pin(async move {
                let request = Request::new(queue, sender, async move {
                    gadget.primed.store(true, Ordering::SeqCst);
                    Ok(())
                });
                request.process();
                Ok(Some(request))
            })
        },
    ));

    engine.advance(&gadget, NodeState::ATTACHING).await?;
    // The gating request finished before the state moved.
    assert!(gadget.primed.load(Ordering::SeqCst));
    assert_eq!(gadget.state(), NodeState::ATTACHING);

    queue.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn failed_gating_request_aborts_the_advance() -> anyhow::Result<()> {
    initialize_tracing();
    let queue = MessageQueue::new("aborted", Duration::from_millis(100))?;
    let sender: SenderRef = DeadEndSender::arc();

    let gadget = Gadget::new();
    let mut engine = TransitionEngine::new();
    let effect_queue = queue.clone();
    engine.register(StateTransition::new(
        NodeState::UNATTACHED,
        NodeState::ATTACHING,
        move |_gadget: Gadget| {
            let queue = effect_queue.clone();
            let sender = sender.clone();
            Box::pin(async move {
                let request = Request::new(queue, sender, async {
                    anyhow::bail!("precondition broke")
                });
                request.process();
                Ok(Some(request))
            })
        },
    ));

    let err = engine
        .advance(&gadget, NodeState::ATTACHING)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("aborted"));
    // The failed effect left the entity where it was.
    assert_eq!(gadget.state(), NodeState::UNATTACHED);

    queue.shutdown().await;
    Ok(())
}
