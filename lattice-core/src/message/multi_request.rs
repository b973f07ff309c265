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
use std::collections::VecDeque;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex};

use tracing::{instrument, trace};

use crate::common::SenderRef;
use crate::message::request::Kind;
use crate::message::{Completion, MessageQueue, Request, RequestState};

/// Children of an AND aggregate. All must succeed; the first failure or
/// cancellation settles the aggregate the same way.
pub(crate) struct ParallelCore {
    children: Mutex<Vec<Request>>,
    pending: Mutex<usize>,
}

impl Default for ParallelCore {
    fn default() -> Self {
        ParallelCore {
            children: Mutex::new(Vec::new()),
            pending: Mutex::new(0),
        }
    }
}

impl fmt::Debug for ParallelCore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let children = self.children.lock().expect("parallel child lock poisoned");
        let pending = self.pending.lock().expect("parallel pending lock poisoned");
        f.debug_struct("Parallel")
            .field("children", &children.len())
            .field("pending", &*pending)
            .finish()
    }
}

/// Children of a THEN aggregate, run strictly in order.
pub(crate) struct SerialCore {
    children: Mutex<VecDeque<Request>>,
    active: Mutex<Option<Request>>,
}

impl Default for SerialCore {
    fn default() -> Self {
        SerialCore {
            children: Mutex::new(VecDeque::new()),
            active: Mutex::new(None),
        }
    }
}

impl fmt::Debug for SerialCore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let children = self.children.lock().expect("serial child lock poisoned");
        let active = self.active.lock().expect("serial active lock poisoned");
        f.debug_struct("Serial")
            .field("queued", &children.len())
            .field("active", &active.is_some())
            .finish()
    }
}

impl Request {
    /// Adds a child to a parallel aggregate. Children added while the
    /// aggregate is running are processed immediately; children added
    /// before [`process`](Request::process) wait for it.
    pub(crate) fn add_parallel_child(&self, child: Request) {
        let Kind::Parallel(core) = &self.kind_ref().kind else {
            return;
        };
        {
            let mut children = core.children.lock().expect("parallel child lock poisoned");
            let mut pending = core.pending.lock().expect("parallel pending lock poisoned");
            children.push(child.clone());
            *pending += 1;
        }
        child.subscribe_completion(Arc::new(self.clone()));
        if self.state() != RequestState::New {
            child.process();
        }
    }

    /// Appends a child to a serial aggregate. If the aggregate is running
    /// and currently idle, the new child starts right away.
    pub(crate) fn push_serial_child(&self, child: Request) {
        let Kind::Serial(core) = &self.kind_ref().kind else {
            return;
        };
        core.children
            .lock()
            .expect("serial child lock poisoned")
            .push_back(child);
        let idle = core
            .active
            .lock()
            .expect("serial active lock poisoned")
            .is_none();
        if idle && self.state() == RequestState::Submitted {
            self.process_serial();
        }
    }

    #[instrument(skip(self), fields(request = %self.id()))]
    pub(crate) fn process_parallel(&self) {
        let Kind::Parallel(core) = &self.kind_ref().kind else {
            return;
        };
        if self.state().is_terminal() {
            return;
        }
        let children: Vec<Request> = core
            .children
            .lock()
            .expect("parallel child lock poisoned")
            .clone();
        if children.is_empty() {
            trace!("empty parallel aggregate succeeds vacuously");
            self.succeed();
            return;
        }
        for child in children {
            child.process();
        }
    }

    /// Starts the next queued serial child, or settles the aggregate if
    /// nothing remains.
    #[instrument(skip(self), fields(request = %self.id()))]
    pub(crate) fn process_serial(&self) {
        let Kind::Serial(core) = &self.kind_ref().kind else {
            return;
        };
        if self.state().is_terminal() {
            return;
        }
        let next = {
            let mut active = core.active.lock().expect("serial active lock poisoned");
            if active.is_some() {
                return;
            }
            let next = core
                .children
                .lock()
                .expect("serial child lock poisoned")
                .pop_front();
            *active = next.clone();
            next
        };
        match next {
            Some(child) => {
                child.subscribe_completion(Arc::new(self.clone()));
                child.process();
            }
            None => {
                trace!("serial aggregate exhausted its children");
                self.succeed();
            }
        }
    }

    /// Folds one child's outcome into the aggregate. Runs on the dispatch
    /// loop, so outcomes arrive one at a time.
    pub(crate) fn on_child_outcome(&self, completion: &Completion) {
        if self.state().is_terminal() {
            return;
        }
        match &self.kind_ref().kind {
            Kind::Parallel(core) => match &completion.outcome {
                RequestState::Successful => {
                    let remaining = {
                        let mut pending =
                            core.pending.lock().expect("parallel pending lock poisoned");
                        *pending = pending.saturating_sub(1);
                        *pending
                    };
                    if remaining == 0 {
                        self.succeed();
                    }
                }
                RequestState::Failed(problem) => self.fail_with(problem.clone()),
                RequestState::Cancelled => self.cancel(),
                _ => {}
            },
            Kind::Serial(core) => match &completion.outcome {
                RequestState::Successful => {
                    core.active
                        .lock()
                        .expect("serial active lock poisoned")
                        .take();
                    self.process_serial();
                }
                RequestState::Failed(problem) => self.fail_with(problem.clone()),
                RequestState::Cancelled => self.cancel(),
                _ => {}
            },
            Kind::Leaf(_) => {}
        }
    }
}

/// AND combinator: a request that succeeds once every child request has
/// succeeded, and fails or cancels with the first child that does.
#[derive(Debug, Clone)]
pub struct ParallelMultiRequest {
    request: Request,
}

impl ParallelMultiRequest {
    /// Builds an aggregate over `children`. Call [`process`](Request::process)
    /// (or combine further) to start it.
    pub fn new(
        queue: MessageQueue,
        sender: SenderRef,
        children: impl IntoIterator<Item = Request>,
    ) -> Self {
        let request = Request::parallel(queue, sender);
        for child in children {
            request.add_parallel_child(child);
        }
        ParallelMultiRequest { request }
    }

    /// Adds another child; allowed while the aggregate is still running.
    pub fn add(&self, child: Request) {
        self.request.add_parallel_child(child);
    }

    /// The underlying request handle.
    pub fn request(&self) -> Request {
        self.request.clone()
    }
}

impl Deref for ParallelMultiRequest {
    type Target = Request;

    fn deref(&self) -> &Request {
        &self.request
    }
}

impl From<ParallelMultiRequest> for Request {
    fn from(multi: ParallelMultiRequest) -> Request {
        multi.request
    }
}

/// THEN combinator: runs its children strictly in order, starting each only
/// after the previous one succeeded.
#[derive(Debug, Clone)]
pub struct SerialMultiRequest {
    request: Request,
}

impl SerialMultiRequest {
    /// Builds an ordered chain over `children`. Call
    /// [`process`](Request::process) (or combine further) to start it.
    pub fn new(
        queue: MessageQueue,
        sender: SenderRef,
        children: impl IntoIterator<Item = Request>,
    ) -> Self {
        let request = Request::serial(queue, sender);
        for child in children {
            request.push_serial_child(child);
        }
        SerialMultiRequest { request }
    }

    /// Appends another child to the chain.
    pub fn push(&self, child: Request) {
        self.request.push_serial_child(child);
    }

    /// The underlying request handle.
    pub fn request(&self) -> Request {
        self.request.clone()
    }
}

impl Deref for SerialMultiRequest {
    type Target = Request;

    fn deref(&self) -> &Request {
        &self.request
    }
}

impl From<SerialMultiRequest> for Request {
    fn from(multi: SerialMultiRequest) -> Request {
        multi.request
    }
}
