//! In-process [`MessageBus`] on bounded tokio mpsc channels.
//!
//! Delivery follows pub/sub rules: a subject with no subscribers drops the
//! message, and a subscriber whose channel is full misses it (slow consumer).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use cb_domain::error::{Error, Result};

use crate::traits::{BusMessage, MessageBus, Subscription, SubscriptionId};

struct Subscriber {
    id: SubscriptionId,
    tx: mpsc::Sender<BusMessage>,
}

struct Inner {
    subjects: Mutex<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    capacity: usize,
}

impl Inner {
    fn remove(&self, id: SubscriptionId) {
        let mut subjects = self.subjects.lock();
        subjects.retain(|_, subs| {
            subs.retain(|s| s.id != id);
            !subs.is_empty()
        });
    }
}

#[derive(Clone)]
pub struct InProcessBus {
    inner: Arc<Inner>,
}

impl InProcessBus {
    /// `capacity` bounds each subscriber's queue.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                subjects: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Stop accepting traffic. Existing subscriptions see end-of-stream.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.subjects.lock().clear();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Bus("bus unavailable".into()));
        }
        Ok(())
    }
}

impl Default for InProcessBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl MessageBus for InProcessBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<()> {
        self.ensure_open()?;

        let mut subjects = self.inner.subjects.lock();
        let Some(subs) = subjects.get_mut(subject) else {
            tracing::trace!(subject, "no subscribers, message dropped");
            return Ok(());
        };

        subs.retain(|sub| {
            let msg = BusMessage {
                subject: subject.to_owned(),
                payload: payload.clone(),
            };
            match sub.tx.try_send(msg) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(subject, id = sub.id.0, "slow subscriber, message dropped");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
        if subs.is_empty() {
            subjects.remove(subject);
        }
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscription> {
        self.ensure_open()?;

        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        self.inner
            .subjects
            .lock()
            .entry(subject.to_owned())
            .or_default()
            .push(Subscriber { id, tx });

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(id, subject, rx, move |id| {
            if let Some(inner) = weak.upgrade() {
                inner.remove(id);
            }
        }))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.remove(id);
    }

    fn subscription_count(&self, subject: &str) -> usize {
        self.inner
            .subjects
            .lock()
            .get(subject)
            .map_or(0, |subs| subs.iter().filter(|s| !s.tx.is_closed()).count())
    }

    async fn close(&self) {
        InProcessBus::close(self);
    }
}
