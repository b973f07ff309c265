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
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use acton_ern::Ern;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::task::TaskTracker;
use tracing::{error, instrument, trace, warn};

use crate::common::{BusConfig, ObserverRef, RecipientRef, SenderRef};
use crate::message::{DeliveryState, Message, Notice, QueueError};
use crate::traits::{Recipient, Sender};

/// The dispatch engine: delivers enqueued messages to recipients, one message
/// fully processed before the next begins.
///
/// A queue runs at most one dispatcher task. The dispatcher pulls the next
/// message with a bounded wait; when the wait elapses and no shutdown lock is
/// held, it exits and is lazily restarted by the next [`inject`](MessageQueue::inject).
/// Observer notices travel through the same loop, so nothing observable
/// happens concurrently with a delivery on the same queue.
#[derive(Debug, Clone)]
pub struct MessageQueue {
    inner: Arc<QueueInner>,
}

#[derive(Debug)]
pub(crate) struct QueueInner {
    id: Ern,
    /// Slot for the live channel; the lock also serializes the dispatcher's
    /// exit handshake against `inject`, which is what makes the idle
    /// shutdown race-free.
    channel: Mutex<mpsc::UnboundedSender<Message>>,
    observers: DashMap<String, ObserverRef>,
    shutdown_locks: AtomicUsize,
    closing: AtomicBool,
    idle_wait: Duration,
    tracker: TaskTracker,
    courier: Arc<QueueCourier>,
}

impl MessageQueue {
    /// Starts a queue configured from `config`.
    pub fn start(config: &BusConfig) -> anyhow::Result<Self> {
        Self::new(&config.defaults.queue_name, config.dispatch_idle())
    }

    /// Starts a queue with an explicit name and idle window.
    pub fn new(name: &str, idle_wait: Duration) -> anyhow::Result<Self> {
        let id = Ern::with_root(name.to_string())
            .map_err(|e| anyhow::anyhow!("invalid queue name {name:?}: {e}"))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(QueueInner {
            courier: Arc::new(QueueCourier { id: id.clone() }),
            id,
            channel: Mutex::new(tx),
            observers: DashMap::new(),
            shutdown_locks: AtomicUsize::new(0),
            closing: AtomicBool::new(false),
            idle_wait,
            tracker: TaskTracker::new(),
        });
        Self::spawn_dispatcher(inner.clone(), rx);
        Ok(MessageQueue { inner })
    }

    /// The queue's identifier.
    pub fn id(&self) -> Ern {
        self.inner.id.clone()
    }

    /// Enqueues `message` for dispatch and returns it for chaining.
    ///
    /// Never blocks the caller: the message is only enqueued here, and both
    /// delivery and observer notification happen later on the dispatcher
    /// task. Fails with [`QueueError::MissingSender`] when the message
    /// declares no sender.
    #[instrument(skip(self, message), fields(queue = %self.inner.id))]
    pub fn inject(&self, message: Message) -> Result<Message, QueueError> {
        if message.sender().is_none() {
            return Err(QueueError::MissingSender);
        }
        message.advance_delivery(DeliveryState::Enqueued)?;
        self.send(message.clone())?;
        trace!("message enqueued");
        Ok(message)
    }

    fn send(&self, message: Message) -> Result<(), QueueError> {
        if self.inner.closing.load(Ordering::SeqCst) {
            return Err(QueueError::SendFailed("queue is shutting down".into()));
        }
        let mut channel = self
            .inner
            .channel
            .lock()
            .expect("queue channel lock poisoned");
        if channel.is_closed() {
            let (tx, rx) = mpsc::unbounded_channel();
            *channel = tx;
            Self::spawn_dispatcher(self.inner.clone(), rx);
            trace!(queue = %self.inner.id, "dispatcher restarted");
        }
        channel.send(message).map_err(QueueError::from)
    }

    /// Registers an observer for queue-routed notices.
    pub fn subscribe(&self, observer: ObserverRef) {
        self.inner
            .observers
            .insert(observer.id().to_string(), observer);
    }

    /// Deregisters an observer.
    pub fn unsubscribe(&self, id: &Ern) {
        self.inner.observers.remove(&id.to_string());
    }

    /// Fans `notice` out to every subscribed observer as a queue message.
    #[instrument(skip(self, notice), fields(queue = %self.inner.id))]
    pub fn publish(&self, notice: Notice) -> Result<(), QueueError> {
        let observers: Vec<ObserverRef> = self
            .inner
            .observers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        let courier: SenderRef = self.inner.courier.clone();
        self.notify(courier, observers, notice)
    }

    /// Routes `notice` to a specific set of observers through the queue.
    pub(crate) fn notify(
        &self,
        sender: SenderRef,
        observers: Vec<ObserverRef>,
        notice: Notice,
    ) -> Result<(), QueueError> {
        if observers.is_empty() {
            return Ok(());
        }
        let mut message = Message::new(sender, notice);
        for observer in observers {
            message = message.to(Arc::new(ObserverPort { observer }) as RecipientRef);
        }
        self.inject(message).map(|_| ())
    }

    /// Takes a lease that keeps the dispatcher alive while held.
    ///
    /// Dropping the returned [`ShutdownLock`] releases the lease, so
    /// prevent/allow pairs stay matched on every exit path.
    pub fn prevent_shutdown(&self) -> ShutdownLock {
        self.inner.shutdown_locks.fetch_add(1, Ordering::SeqCst);
        ShutdownLock {
            inner: self.inner.clone(),
        }
    }

    /// Administrative override: forces the shutdown-lock counter to zero.
    pub fn clear_shutdown_lock(&self) {
        self.inner.shutdown_locks.store(0, Ordering::SeqCst);
    }

    /// The current shutdown-lock count.
    pub fn shutdown_locks(&self) -> usize {
        self.inner.shutdown_locks.load(Ordering::SeqCst)
    }

    /// Stops accepting messages, drains the backlog, and waits for the
    /// dispatcher to finish. Outstanding shutdown locks are honored: the
    /// dispatcher keeps running until they are released (or cleared).
    #[instrument(skip(self), fields(queue = %self.inner.id))]
    pub async fn shutdown(&self) {
        self.inner.closing.store(true, Ordering::SeqCst);
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        trace!("queue shut down");
    }

    fn spawn_dispatcher(inner: Arc<QueueInner>, mut rx: mpsc::UnboundedReceiver<Message>) {
        let tracker = inner.tracker.clone();
        tracker.spawn(async move {
            trace!(queue = %inner.id, "dispatcher started");
            loop {
                match timeout(inner.idle_wait, rx.recv()).await {
                    Ok(Some(message)) => inner.deliver(message).await,
                    Ok(None) => break,
                    Err(_elapsed) => {
                        if inner.shutdown_locks.load(Ordering::SeqCst) > 0 {
                            continue;
                        }
                        // Exit handshake. The channel slot lock serializes
                        // this section against `inject`: a message observed
                        // here gets delivered and the loop continues; an
                        // empty channel is closed before the lock drops, so
                        // the next inject sees a closed sender and restarts.
                        let raced = {
                            let _slot = inner.channel.lock().expect("queue channel lock poisoned");
                            match rx.try_recv() {
                                Ok(message) => Some(message),
                                Err(_) => {
                                    rx.close();
                                    None
                                }
                            }
                        };
                        match raced {
                            Some(message) => inner.deliver(message).await,
                            None => break,
                        }
                    }
                }
            }
            // Drain anything accepted before the channel closed.
            while let Ok(message) = rx.try_recv() {
                inner.deliver(message).await;
            }
            trace!(queue = %inner.id, "dispatcher stopped");
        });
    }
}

impl QueueInner {
    async fn deliver(&self, message: Message) {
        let recipients = message.recipients();
        if recipients.is_empty() {
            match message.sender().and_then(|sender| sender.as_recipient()) {
                Some(recipient) => self.offer(&recipient, &message).await,
                None => {
                    if let Some(sender) = message.sender() {
                        trace!(queue = %self.id, sender = %sender.id(), "no deliverable recipient, bouncing");
                        sender.bounce(&message).await;
                    }
                }
            }
        } else {
            for recipient in recipients {
                self.offer(&recipient, &message).await;
            }
        }
        if let Err(error) = message.advance_delivery(DeliveryState::Delivered) {
            error!(queue = %self.id, %error, "message left dispatch in an inconsistent state");
        }
    }

    /// Offers `message` to one recipient, isolating its failures: an error
    /// or panic is logged and must not abort delivery to the remaining
    /// recipients nor crash the loop.
    async fn offer(&self, recipient: &RecipientRef, message: &Message) {
        let delivery = AssertUnwindSafe(recipient.on_message(message)).catch_unwind();
        match delivery.await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                warn!(queue = %self.id, recipient = %recipient.id(), %error, "recipient failed to handle message");
            }
            Err(_) => {
                error!(queue = %self.id, recipient = %recipient.id(), "recipient panicked during delivery");
            }
        }
    }
}

/// RAII lease preventing the dispatcher from tearing down while privileged
/// code depends on it staying alive.
#[derive(Debug)]
pub struct ShutdownLock {
    inner: Arc<QueueInner>,
}

impl Drop for ShutdownLock {
    fn drop(&mut self) {
        // fetch_update instead of fetch_sub: clear_shutdown_lock may already
        // have zeroed the counter underneath this lease.
        let _ = self
            .inner
            .shutdown_locks
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |locks| {
                locks.checked_sub(1)
            });
    }
}

/// Internal sender used for queue-originated notices.
#[derive(Debug)]
struct QueueCourier {
    id: Ern,
}

#[async_trait]
impl Sender for QueueCourier {
    fn id(&self) -> Ern {
        self.id.clone()
    }

    async fn bounce(&self, _message: &Message) {
        warn!(queue = %self.id, "notice bounced: observer set became empty mid-flight");
    }
}

/// Adapter delivering queue messages to an observer.
#[derive(Debug)]
struct ObserverPort {
    observer: ObserverRef,
}

#[async_trait]
impl Recipient for ObserverPort {
    fn id(&self) -> Ern {
        self.observer.id()
    }

    async fn on_message(&self, message: &Message) -> anyhow::Result<()> {
        if let Some(notice) = message.payload_as::<Notice>() {
            self.observer.on_notice(notice.clone()).await;
        }
        Ok(())
    }
}
