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
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use acton_ern::Ern;
use async_trait::async_trait;
use static_assertions::assert_impl_all;
use tokio::sync::watch;
use tracing::{instrument, trace, warn};

use crate::common::{ObserverRef, Problem, RecipientRef, RequestWork, SenderRef};
use crate::message::multi_request::{ParallelCore, SerialCore};
use crate::message::{Completion, Message, MessageQueue, Notice};
use crate::traits::Observer;

/// Lifecycle of a [`Request`].
///
/// A request starts `New`, moves to `Submitted` when processing begins, and
/// ends in exactly one of the terminal outcomes. Terminal states never
/// change again.
#[derive(Debug, Clone, Default)]
pub enum RequestState {
    /// Created, not yet processed.
    #[default]
    New,
    /// Processing has started.
    Submitted,
    /// The work finished successfully.
    Successful,
    /// The work failed; the cause travels with the state.
    Failed(Problem),
    /// The request was abandoned before it could finish.
    Cancelled,
}

impl RequestState {
    /// Whether the request has reached an outcome that will never change.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Successful | RequestState::Failed(_) | RequestState::Cancelled
        )
    }

    /// Whether the request ended successfully.
    pub fn is_successful(&self) -> bool {
        matches!(self, RequestState::Successful)
    }

    /// Whether the request ended in failure.
    pub fn is_failed(&self) -> bool {
        matches!(self, RequestState::Failed(_))
    }

    /// Whether the request was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RequestState::Cancelled)
    }

    /// The failure cause, when failed.
    pub fn problem(&self) -> Option<Problem> {
        match self {
            RequestState::Failed(problem) => Some(problem.clone()),
            _ => None,
        }
    }

    /// Stable name used on the wire.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            RequestState::New => "new",
            RequestState::Submitted => "submitted",
            RequestState::Successful => "successful",
            RequestState::Failed(_) => "failed",
            RequestState::Cancelled => "cancelled",
        }
    }

    /// Reconstructs a state from its wire name. Failure causes do not
    /// survive serialization; a remote failure carries a generic problem.
    pub(crate) fn from_name(name: &str) -> Option<RequestState> {
        match name {
            "new" => Some(RequestState::New),
            "submitted" => Some(RequestState::Submitted),
            "successful" => Some(RequestState::Successful),
            "failed" => Some(RequestState::Failed(Arc::new(anyhow::anyhow!(
                "request failed remotely"
            )))),
            "cancelled" => Some(RequestState::Cancelled),
            _ => None,
        }
    }
}

/// Equality by variant only; two failures compare equal regardless of cause.
impl PartialEq for RequestState {
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl Eq for RequestState {}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_request_id() -> Ern {
    let n = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    // The generated root is always a valid Ern root.
    Ern::with_root(format!("request{n}")).expect("generated request id was rejected")
}

/// A trackable unit of asynchronous work on the bus.
///
/// `Request` is a cheap handle; clones observe and drive the same underlying
/// request. Completion notices are broadcast through the request's
/// [`MessageQueue`], so listeners hear about outcomes on the dispatch loop
/// rather than on whichever task completed the work.
#[derive(Clone)]
pub struct Request {
    inner: Arc<RequestCore>,
}

pub(crate) struct RequestCore {
    id: Ern,
    sender: SenderRef,
    queue: MessageQueue,
    urgent: AtomicBool,
    state: watch::Sender<RequestState>,
    listeners: Mutex<Vec<ObserverRef>>,
    recipients: Mutex<Vec<RecipientRef>>,
    pub(crate) kind: Kind,
}

pub(crate) enum Kind {
    Leaf(Mutex<Option<RequestWork>>),
    Parallel(ParallelCore),
    Serial(SerialCore),
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Kind::Leaf(_) => f.write_str("Leaf"),
            Kind::Parallel(core) => core.fmt(f),
            Kind::Serial(core) => core.fmt(f),
        }
    }
}

impl Request {
    /// Creates a request whose processing runs `work` to completion.
    pub fn new(
        queue: MessageQueue,
        sender: SenderRef,
        work: impl Future<Output = anyhow::Result<()>> + Send + 'static,
    ) -> Self {
        Self::with_kind(queue, sender, Kind::Leaf(Mutex::new(Some(Box::pin(work)))))
    }

    /// Creates a request that carries no work of its own; its outcome is
    /// settled externally via [`succeed`](Request::succeed),
    /// [`fail`](Request::fail) or [`cancel`](Request::cancel).
    pub fn pending(queue: MessageQueue, sender: SenderRef) -> Self {
        Self::with_kind(queue, sender, Kind::Leaf(Mutex::new(None)))
    }

    pub(crate) fn parallel(queue: MessageQueue, sender: SenderRef) -> Self {
        Self::with_kind(queue, sender, Kind::Parallel(ParallelCore::default()))
    }

    pub(crate) fn serial(queue: MessageQueue, sender: SenderRef) -> Self {
        Self::with_kind(queue, sender, Kind::Serial(SerialCore::default()))
    }

    fn with_kind(queue: MessageQueue, sender: SenderRef, kind: Kind) -> Self {
        let (state, _) = watch::channel(RequestState::New);
        Request {
            inner: Arc::new(RequestCore {
                id: next_request_id(),
                sender,
                queue,
                urgent: AtomicBool::new(false),
                state,
                listeners: Mutex::new(Vec::new()),
                recipients: Mutex::new(Vec::new()),
                kind,
            }),
        }
    }

    /// The request's identifier.
    pub fn id(&self) -> Ern {
        self.inner.id.clone()
    }

    /// The party that issued this request.
    pub fn sender(&self) -> SenderRef {
        self.inner.sender.clone()
    }

    /// The queue this request reports completion through.
    pub fn queue(&self) -> MessageQueue {
        self.inner.queue.clone()
    }

    /// The current lifecycle state.
    pub fn state(&self) -> RequestState {
        self.inner.state.borrow().clone()
    }

    /// Whether the request is flagged for priority handling.
    pub fn urgent(&self) -> bool {
        self.inner.urgent.load(Ordering::SeqCst)
    }

    /// Flags or unflags the request for priority handling.
    pub fn set_urgent(&self, urgent: bool) {
        self.inner.urgent.store(urgent, Ordering::SeqCst);
    }

    /// Begins processing. Calling this more than once, or on a request that
    /// has already finished, is a no-op.
    #[instrument(skip(self), fields(request = %self.inner.id))]
    pub fn process(&self) {
        let started = self.inner.state.send_if_modified(|state| {
            if matches!(state, RequestState::New) {
                *state = RequestState::Submitted;
                true
            } else {
                false
            }
        });
        if !started {
            trace!("process skipped: request already submitted or finished");
            return;
        }
        match &self.inner.kind {
            Kind::Leaf(slot) => {
                let work = slot.lock().expect("request work lock poisoned").take();
                if let Some(work) = work {
                    let request = self.clone();
                    tokio::spawn(async move {
                        match work.await {
                            Ok(()) => request.succeed(),
                            Err(error) => request.fail(error),
                        }
                    });
                }
            }
            Kind::Parallel(_) => self.process_parallel(),
            Kind::Serial(_) => self.process_serial(),
        }
    }

    /// Settles the request as successful.
    pub fn succeed(&self) {
        self.complete(RequestState::Successful);
    }

    /// Settles the request as failed with `error` as the cause.
    pub fn fail(&self, error: anyhow::Error) {
        self.complete(RequestState::Failed(Arc::new(error)));
    }

    /// Settles the request as failed with an already-shared cause.
    pub fn fail_with(&self, problem: Problem) {
        self.complete(RequestState::Failed(problem));
    }

    /// Abandons the request.
    pub fn cancel(&self) {
        self.complete(RequestState::Cancelled);
    }

    /// First terminal state wins; later settlement attempts are ignored.
    fn complete(&self, outcome: RequestState) {
        let settled = self.inner.state.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = outcome.clone();
                true
            }
        });
        if settled {
            self.broadcast_completion(outcome);
        }
    }

    fn broadcast_completion(&self, outcome: RequestState) {
        let listeners: Vec<ObserverRef> = {
            let mut listeners = self
                .inner
                .listeners
                .lock()
                .expect("request listener lock poisoned");
            listeners.drain(..).collect()
        };
        if listeners.is_empty() {
            return;
        }
        let notice = Notice::new(
            self.inner.id.clone(),
            Completion {
                request: self.clone(),
                outcome,
            },
        );
        if let Err(error) = self
            .inner
            .queue
            .notify(self.inner.sender.clone(), listeners, notice)
        {
            warn!(request = %self.inner.id, %error, "failed to broadcast request completion");
        }
    }

    /// Registers `listener` for the completion notice. A listener added
    /// after the request already finished is notified immediately (still
    /// through the queue).
    pub fn subscribe_completion(&self, listener: ObserverRef) {
        let already_done = {
            let mut listeners = self
                .inner
                .listeners
                .lock()
                .expect("request listener lock poisoned");
            let state = self.inner.state.borrow().clone();
            if state.is_terminal() {
                Some(state)
            } else {
                listeners.push(listener.clone());
                None
            }
        };
        if let Some(outcome) = already_done {
            let notice = Notice::new(
                self.inner.id.clone(),
                Completion {
                    request: self.clone(),
                    outcome,
                },
            );
            if let Err(error) =
                self.inner
                    .queue
                    .notify(self.inner.sender.clone(), vec![listener], notice)
            {
                warn!(request = %self.inner.id, %error, "failed to notify late completion listener");
            }
        }
    }

    /// Waits for the request to finish and returns its terminal state.
    pub async fn outcome(&self) -> RequestState {
        let mut rx = self.inner.state.subscribe();
        // Clone out of the watch ref before `rx` goes out of scope.
        let outcome = match rx.wait_for(|state| state.is_terminal()).await {
            Ok(state) => state.clone(),
            // The sender lives inside self, so this arm is unreachable while
            // the handle exists; report the current state regardless.
            Err(_) => self.state(),
        };
        outcome
    }

    /// Combines this request with `other` so both must succeed.
    ///
    /// Passing `None` returns this request unchanged. When this request is a
    /// still-running parallel aggregate, `other` joins it; otherwise a new
    /// aggregate over both is created and processed.
    pub fn and(&self, other: impl Into<Option<Request>>) -> Request {
        let Some(other) = other.into() else {
            return self.clone();
        };
        if let Kind::Parallel(_) = &self.inner.kind {
            if !self.state().is_terminal() {
                self.add_parallel_child(other);
                return self.clone();
            }
        }
        let aggregate = Request::parallel(self.inner.queue.clone(), self.inner.sender.clone());
        aggregate.add_parallel_child(self.clone());
        aggregate.add_parallel_child(other);
        aggregate.process();
        aggregate
    }

    /// Chains `other` to run after this request succeeds.
    ///
    /// Passing `None` returns this request unchanged. When this request is a
    /// still-running serial aggregate, `other` is appended; otherwise a new
    /// aggregate running this request and then `other` is created and
    /// processed.
    pub fn then(&self, other: impl Into<Option<Request>>) -> Request {
        let Some(other) = other.into() else {
            return self.clone();
        };
        if let Kind::Serial(_) = &self.inner.kind {
            if !self.state().is_terminal() {
                self.push_serial_child(other);
                return self.clone();
            }
        }
        let aggregate = Request::serial(self.inner.queue.clone(), self.inner.sender.clone());
        aggregate.push_serial_child(self.clone());
        aggregate.push_serial_child(other);
        aggregate.process();
        aggregate
    }

    /// Adds a delivery target for the request's carrier message.
    pub fn address_to(&self, recipient: RecipientRef) {
        self.inner
            .recipients
            .lock()
            .expect("request recipient lock poisoned")
            .push(recipient);
    }

    /// The delivery targets accumulated so far.
    pub fn recipients(&self) -> Vec<RecipientRef> {
        self.inner
            .recipients
            .lock()
            .expect("request recipient lock poisoned")
            .clone()
    }

    /// Wraps the request in a [`Message`] so it can travel the queue like
    /// any other payload.
    pub fn carrier(&self) -> Message {
        let mut message = Message::new(self.inner.sender.clone(), RequestPayload(self.clone()));
        for recipient in self.recipients() {
            message = message.to(recipient);
        }
        message
    }

    pub(crate) fn kind_ref(&self) -> &RequestCore {
        &self.inner
    }

    /// Forces the lifecycle state, used when rebuilding a request received
    /// over the wire.
    pub(crate) fn restore_state(&self, name: &str) -> anyhow::Result<()> {
        let state = RequestState::from_name(name)
            .ok_or_else(|| anyhow::anyhow!("unknown request state {name:?}"))?;
        self.inner.state.send_replace(state);
        Ok(())
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.inner.id.to_string())
            .field("state", &self.state())
            .field("kind", &self.inner.kind)
            .finish()
    }
}

/// Aggregates listen for their children's completions like any other
/// observer, so child outcomes arrive serialized on the dispatch loop.
#[async_trait]
impl Observer for Request {
    fn id(&self) -> Ern {
        self.inner.id.clone()
    }

    async fn on_notice(&self, notice: Notice) {
        if let Some(completion) = notice.payload_as::<Completion>() {
            self.on_child_outcome(completion);
        }
    }
}

/// Payload carried when a [`Request`] itself is the message content.
#[derive(Debug, Clone)]
pub struct RequestPayload(pub Request);

assert_impl_all!(Request: Send, Sync);
