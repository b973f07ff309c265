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
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{instrument, trace};

use crate::message::Request;
use crate::node::NodeState;
use crate::traits::Stateful;

/// Order assigned to transitions that do not ask for one. Lower runs first.
pub const DEFAULT_ORDER: i32 = 1_000;

type Guard<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
type Effect<E> = Arc<dyn Fn(E) -> EffectFuture + Send + Sync>;

/// The asynchronous side effect of a transition. It may hand back a
/// [`Request`] whose outcome gates whether the transition counts as done.
pub type EffectFuture = Pin<Box<dyn Future<Output = anyhow::Result<Option<Request>>> + Send>>;

/// One edge in a lifecycle state machine: from one [`NodeState`] to another,
/// optionally guarded, optionally carrying an async effect.
#[derive(Clone)]
pub struct StateTransition<E> {
    order: i32,
    from: NodeState,
    to: NodeState,
    guard: Option<Guard<E>>,
    effect: Option<Effect<E>>,
}

impl<E> StateTransition<E> {
    /// An edge whose effect runs when the engine takes it.
    pub fn new(
        from: NodeState,
        to: NodeState,
        effect: impl Fn(E) -> EffectFuture + Send + Sync + 'static,
    ) -> Self {
        StateTransition {
            order: DEFAULT_ORDER,
            from,
            to,
            guard: None,
            effect: Some(Arc::new(effect)),
        }
    }

    /// An edge with no effect: taking it just moves the entity.
    pub fn direct(from: NodeState, to: NodeState) -> Self {
        StateTransition {
            order: DEFAULT_ORDER,
            from,
            to,
            guard: None,
            effect: None,
        }
    }

    /// Overrides the selection order. Among viable edges out of a state,
    /// the lowest order wins; equal orders resolve to whichever was
    /// registered first.
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Restricts the edge to entities satisfying `guard`.
    pub fn when(mut self, guard: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    pub fn from(&self) -> NodeState {
        self.from
    }

    pub fn to(&self) -> NodeState {
        self.to
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    fn viable(&self, entity: &E) -> bool {
        match &self.guard {
            Some(guard) => guard(entity),
            None => true,
        }
    }
}

impl<E> fmt::Debug for StateTransition<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("StateTransition")
            .field("order", &self.order)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("guarded", &self.guard.is_some())
            .field("effectful", &self.effect.is_some())
            .finish()
    }
}

/// The engine got stuck: no viable transition leads out of the entity's
/// current state toward the desired one.
#[derive(Debug)]
pub struct StallError {
    /// Where the entity stopped.
    pub current: NodeState,
    /// Where the caller wanted it.
    pub desired: NodeState,
}

impl fmt::Display for StallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "no viable transition from {} toward {}",
            self.current, self.desired
        )
    }
}

impl std::error::Error for StallError {}

/// Drives a [`Stateful`] entity along registered transitions until it
/// reaches a target state.
pub struct TransitionEngine<E: Stateful> {
    transitions: Vec<StateTransition<E>>,
}

impl<E: Stateful> Default for TransitionEngine<E> {
    fn default() -> Self {
        TransitionEngine {
            transitions: Vec::new(),
        }
    }
}

impl<E: Stateful> TransitionEngine<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an edge. Registration order breaks ties between equal
    /// transition orders.
    pub fn register(&mut self, transition: StateTransition<E>) -> &mut Self {
        self.transitions.push(transition);
        self
    }

    /// Steps `entity` one transition at a time until it reaches `target`.
    ///
    /// At each state, the lowest-ordered viable edge out of it is taken.
    /// An effectful edge runs its effect first; if the effect yields a
    /// request, that request must finish successfully before the entity
    /// moves. Stalling before `target` is an error carrying a
    /// [`StallError`].
    #[instrument(skip(self, entity), fields(target = %target))]
    pub async fn advance(&self, entity: &E, target: NodeState) -> anyhow::Result<()> {
        loop {
            let current = entity.state();
            if current == target {
                return Ok(());
            }
            let edge = self
                .transitions
                .iter()
                .filter(|t| t.from == current && t.viable(entity))
                .min_by_key(|t| t.order);
            let Some(edge) = edge else {
                return Err(StallError {
                    current,
                    desired: target,
                }
                .into());
            };
            if let Some(effect) = &edge.effect {
                if let Some(request) = effect(entity.clone()).await? {
                    let outcome = request.outcome().await;
                    if !outcome.is_successful() {
                        anyhow::bail!(
                            "transition {} -> {} aborted: gating request ended {}",
                            edge.from,
                            edge.to,
                            outcome
                        );
                    }
                }
            }
            entity.set_state(edge.to);
            trace!(from = %edge.from, to = %edge.to, "transition taken");
        }
    }
}

impl<E: Stateful> fmt::Debug for TransitionEngine<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TransitionEngine")
            .field("transitions", &self.transitions)
            .finish()
    }
}
