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
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lattice::prelude::*;

use super::messages::Tally;

/// Recipient that counts deliveries and watches for overlapping ones.
///
/// Each delivery parks briefly with the in-flight counter raised; a second
/// delivery arriving during that window proves the dispatcher ran two
/// handlers at once.
#[derive(Debug)]
pub struct CountingRecipient {
    id: Ern,
    pub delivered: AtomicUsize,
    pub overlaps: AtomicUsize,
    pub tallies: Mutex<Vec<u32>>,
    in_flight: AtomicUsize,
}

impl CountingRecipient {
    pub fn arc() -> Arc<Self> {
        Arc::new(CountingRecipient {
            id: Ern::with_root("counting_recipient").unwrap(),
            delivered: AtomicUsize::new(0),
            overlaps: AtomicUsize::new(0),
            tallies: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
        })
    }

    pub fn count(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn tallies(&self) -> Vec<u32> {
        self.tallies.lock().unwrap().clone()
    }
}

#[async_trait]
impl Recipient for CountingRecipient {
    fn id(&self) -> Ern {
        self.id.clone()
    }

    async fn on_message(&self, message: &Message) -> anyhow::Result<()> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
        if let Some(tally) = message.payload_as::<Tally>() {
            self.tallies.lock().unwrap().push(tally.0);
        }
        self.delivered.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Recipient whose handler always errors.
#[derive(Debug)]
pub struct FailingRecipient {
    id: Ern,
    pub attempts: AtomicUsize,
}

impl FailingRecipient {
    pub fn arc() -> Arc<Self> {
        Arc::new(FailingRecipient {
            id: Ern::with_root("failing_recipient").unwrap(),
            attempts: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Recipient for FailingRecipient {
    fn id(&self) -> Ern {
        self.id.clone()
    }

    async fn on_message(&self, _message: &Message) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("refusing delivery on purpose")
    }
}

/// Recipient whose handler panics outright.
#[derive(Debug)]
pub struct PanickingRecipient {
    id: Ern,
}

impl PanickingRecipient {
    pub fn arc() -> Arc<Self> {
        Arc::new(PanickingRecipient {
            id: Ern::with_root("panicking_recipient").unwrap(),
        })
    }
}

#[async_trait]
impl Recipient for PanickingRecipient {
    fn id(&self) -> Ern {
        self.id.clone()
    }

    async fn on_message(&self, _message: &Message) -> anyhow::Result<()> {
        panic!("handler blew up on purpose")
    }
}

/// Sender that can also receive: messages with no recipients fall back to
/// its inner counting recipient instead of bouncing.
#[derive(Debug)]
pub struct LoopbackSender {
    id: Ern,
    pub inbox: Arc<CountingRecipient>,
}

impl LoopbackSender {
    pub fn arc() -> Arc<Self> {
        Arc::new(LoopbackSender {
            id: Ern::with_root("loopback_sender").unwrap(),
            inbox: CountingRecipient::arc(),
        })
    }
}

#[async_trait]
impl Sender for LoopbackSender {
    fn id(&self) -> Ern {
        self.id.clone()
    }

    async fn bounce(&self, _message: &Message) {
        unreachable!("loopback sender offers a recipient, nothing should bounce");
    }

    fn as_recipient(&self) -> Option<RecipientRef> {
        Some(self.inbox.clone())
    }
}

/// Sender with no receiving side; undeliverable messages bounce here.
#[derive(Debug)]
pub struct DeadEndSender {
    id: Ern,
    pub bounced: AtomicUsize,
}

impl DeadEndSender {
    pub fn arc() -> Arc<Self> {
        Arc::new(DeadEndSender {
            id: Ern::with_root("dead_end_sender").unwrap(),
            bounced: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Sender for DeadEndSender {
    fn id(&self) -> Ern {
        self.id.clone()
    }

    async fn bounce(&self, _message: &Message) {
        self.bounced.fetch_add(1, Ordering::SeqCst);
    }
}

/// Observer that logs every notice it hears, by origin.
#[derive(Debug)]
pub struct NoticeLog {
    id: Ern,
    pub heard: Mutex<Vec<Ern>>,
    pub outcomes: Mutex<Vec<RequestState>>,
}

impl NoticeLog {
    pub fn arc(name: &str) -> Arc<Self> {
        Arc::new(NoticeLog {
            id: Ern::with_root(name).unwrap(),
            heard: Mutex::new(Vec::new()),
            outcomes: Mutex::new(Vec::new()),
        })
    }

    pub fn heard_count(&self) -> usize {
        self.heard.lock().unwrap().len()
    }
}

#[async_trait]
impl Observer for NoticeLog {
    fn id(&self) -> Ern {
        self.id.clone()
    }

    async fn on_notice(&self, notice: Notice) {
        self.heard.lock().unwrap().push(notice.origin.clone());
        if let Some(completion) = notice.payload_as::<Completion>() {
            self.outcomes.lock().unwrap().push(completion.outcome.clone());
        }
    }
}
